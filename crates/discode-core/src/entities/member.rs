//! Member entity - a user's membership in one guild

use chrono::{DateTime, Utc};

use super::User;
use crate::value_objects::Snowflake;

/// Guild member entity
///
/// Owned by exactly one guild; `guild_id` is threaded in by the constructor rather
/// than read from the wire payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub guild_id: Snowflake,
    pub user: User,
    pub nickname: Option<String>,
    pub role_ids: Vec<Snowflake>,
    pub joined_at: Option<DateTime<Utc>>,
    pub deaf: bool,
    pub mute: bool,
}

impl Member {
    /// Create a new Member of `guild_id`
    pub fn new(guild_id: Snowflake, user: User) -> Self {
        Self {
            guild_id,
            user,
            nickname: None,
            role_ids: Vec::new(),
            joined_at: None,
            deaf: false,
            mute: false,
        }
    }

    /// Member id (the id of the underlying user)
    #[inline]
    pub fn id(&self) -> Snowflake {
        self.user.id
    }

    /// Get display name (nickname if set, otherwise username)
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.username)
    }

    /// Mention string for this member
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user.id)
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Get number of roles
    #[inline]
    pub fn role_count(&self) -> usize {
        self.role_ids.len()
    }
}
