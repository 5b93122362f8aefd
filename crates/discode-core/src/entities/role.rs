//! Role entity - a guild role

use crate::value_objects::Snowflake;

/// Role entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
    pub color: u32,
    pub hoist: bool,
    pub position: i32,
    /// Raw permission bits as sent by the server
    pub permissions: u64,
    pub managed: bool,
    pub mentionable: bool,
}

impl Role {
    /// Create a new Role
    pub fn new(id: Snowflake, guild_id: Snowflake, name: String) -> Self {
        Self {
            id,
            guild_id,
            name,
            color: 0,
            hoist: false,
            position: 0,
            permissions: 0,
            managed: false,
            mentionable: false,
        }
    }

    /// The @everyone role shares its id with the guild
    #[inline]
    pub fn is_everyone(&self) -> bool {
        self.id == self.guild_id
    }

    /// Compare role positions for hierarchy (higher position = more authority)
    #[inline]
    pub fn is_higher_than(&self, other: &Role) -> bool {
        self.position > other.position
    }

    /// Check whether every bit of `permission` is granted
    #[inline]
    pub fn has_permission_bits(&self, permission: u64) -> bool {
        self.permissions & permission == permission
    }

    /// Get the color as a hex string (without #)
    pub fn color_hex(&self) -> String {
        format!("{:06x}", self.color)
    }

    /// Mention string for this role
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}
