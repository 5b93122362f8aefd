//! User entity - an account seen through the gateway

use serde::{Deserialize, Serialize};

use super::CDN_BASE;
use crate::value_objects::Snowflake;

/// User as delivered in member, READY, and message payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl User {
    /// Create a new User with required fields
    pub fn new(id: Snowflake, username: String, discriminator: String) -> Self {
        Self {
            id,
            username,
            discriminator,
            avatar: None,
            bot: false,
            system: false,
        }
    }

    /// Get the full tag: username#discriminator
    ///
    /// Accounts migrated to unique usernames carry discriminator "0" and have no tag suffix.
    pub fn tag(&self) -> String {
        if self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }

    /// Get avatar URL or default avatar URL
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("{CDN_BASE}/avatars/{}/{}.png", self.id, hash),
            None => format!("{CDN_BASE}/embed/avatars/{}.png", self.default_avatar_index()),
        }
    }

    /// Get default avatar index (0-4) based on discriminator
    fn default_avatar_index(&self) -> u8 {
        (self.discriminator.parse::<u16>().unwrap_or(0) % 5) as u8
    }

    /// Check if user is a bot account
    #[inline]
    pub fn is_bot(&self) -> bool {
        self.bot
    }

    /// Check if user is a system account
    #[inline]
    pub fn is_system(&self) -> bool {
        self.system
    }
}
