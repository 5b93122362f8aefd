//! Domain errors - failures while applying server state to the cache

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Guild not found: {0}")]
    GuildNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Role not found: {0}")]
    RoleNotFound(Snowflake),

    #[error("Member {user_id} not found in guild {guild_id}")]
    MemberNotFound { guild_id: Snowflake, user_id: Snowflake },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    #[error("Invalid snowflake: {0}")]
    InvalidSnowflake(String),

    #[error("Invalid {event} payload: {reason}")]
    InvalidPayload { event: &'static str, reason: String },
}

impl DomainError {
    /// Get a stable error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::GuildNotFound(_) => "UNKNOWN_GUILD",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::RoleNotFound(_) => "UNKNOWN_ROLE",
            Self::MemberNotFound { .. } => "UNKNOWN_MEMBER",
            Self::InvalidSnowflake(_) => "INVALID_SNOWFLAKE",
            Self::InvalidPayload { .. } => "INVALID_PAYLOAD",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GuildNotFound(_)
                | Self::ChannelNotFound(_)
                | Self::RoleNotFound(_)
                | Self::MemberNotFound { .. }
        )
    }

    /// Build an `InvalidPayload` error for `event`
    pub fn invalid_payload(event: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            event,
            reason: reason.into(),
        }
    }
}

impl From<crate::value_objects::SnowflakeParseError> for DomainError {
    fn from(err: crate::value_objects::SnowflakeParseError) -> Self {
        Self::InvalidSnowflake(err.to_string())
    }
}
