//! Gateway client configuration
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::time::Duration;

use discode_core::Intents;

/// Gateway client configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bot token sent in IDENTIFY and RESUME
    pub token: String,
    /// Event categories requested at IDENTIFY
    pub intents: Intents,
    /// Base URL of the request/response API (used for the gateway URL lookup)
    pub api_base: String,
    /// Host used when the gateway URL lookup fails
    pub gateway_host: String,
    pub gateway_version: u8,
    /// Request the member list of every guild as it arrives
    pub chunk_guilds_at_startup: bool,
    /// How long a heartbeat may stay unacknowledged before the connection is replaced
    pub heartbeat_tolerance: Duration,
    pub lookup_timeout: Duration,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

// Default value functions
fn default_api_base() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_gateway_host() -> String {
    "gateway.discord.gg".to_string()
}

fn default_gateway_version() -> u8 {
    9
}

fn default_heartbeat_tolerance_ms() -> u64 {
    5000
}

fn default_lookup_timeout_ms() -> u64 {
    10_000
}

impl GatewayConfig {
    /// Create a configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: Intents::default(),
            api_base: default_api_base(),
            gateway_host: default_gateway_host(),
            gateway_version: default_gateway_version(),
            chunk_guilds_at_startup: true,
            heartbeat_tolerance: Duration::from_millis(default_heartbeat_tolerance_ms()),
            lookup_timeout: Duration::from_millis(default_lookup_timeout_ms()),
            env: Environment::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DISCODE_TOKEN` is missing or `DISCODE_INTENTS` is not a number
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCODE_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DISCODE_TOKEN"))?;

        let intents = match lookup("DISCODE_INTENTS") {
            Some(raw) => Intents::parse(raw.trim())
                .map_err(|_| ConfigError::InvalidValue("DISCODE_INTENTS", raw))?,
            None => Intents::default(),
        };

        Ok(Self {
            token,
            intents,
            api_base: lookup("DISCODE_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(default_api_base),
            gateway_host: lookup("DISCODE_GATEWAY_HOST").unwrap_or_else(default_gateway_host),
            gateway_version: lookup("DISCODE_GATEWAY_VERSION")
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_gateway_version),
            chunk_guilds_at_startup: lookup("DISCODE_CHUNK_GUILDS_AT_STARTUP")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            heartbeat_tolerance: Duration::from_millis(
                lookup("DISCODE_HEARTBEAT_TOLERANCE_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_heartbeat_tolerance_ms),
            ),
            lookup_timeout: Duration::from_millis(
                lookup("DISCODE_LOOKUP_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_lookup_timeout_ms),
            ),
            env: lookup("APP_ENV")
                .and_then(|s| Environment::parse(&s))
                .unwrap_or_default(),
        })
    }

    /// Set the requested intents
    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_gateway_host(mut self, host: impl Into<String>) -> Self {
        self.gateway_host = host.into();
        self
    }

    /// Enable or disable member chunking on GUILD_CREATE
    #[must_use]
    pub fn with_chunk_guilds_at_startup(mut self, enabled: bool) -> Self {
        self.chunk_guilds_at_startup = enabled;
        self
    }

    #[must_use]
    pub fn with_heartbeat_tolerance(mut self, tolerance: Duration) -> Self {
        self.heartbeat_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Query string appended to every gateway URL
    pub fn gateway_query(&self) -> String {
        format!("v={}&encoding=json&compress=zlib-stream", self.gateway_version)
    }

    /// URL used when the lookup endpoint cannot be reached
    pub fn fallback_gateway_url(&self) -> String {
        format!("wss://{}/?{}", self.gateway_host, self.gateway_query())
    }

    /// Endpoint returning the current gateway URL
    pub fn gateway_lookup_url(&self) -> String {
        format!("{}/gateway", self.api_base)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
