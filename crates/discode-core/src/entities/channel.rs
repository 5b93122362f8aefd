//! Channel entity - a guild text/voice channel, category, or DM

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Channel type enum (wire values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelType {
    /// Guild text channel
    #[default]
    GuildText,
    /// Direct message between users
    Dm,
    /// Guild voice channel
    GuildVoice,
    /// Group direct message
    GroupDm,
    /// Guild category for organizing channels
    GuildCategory,
    /// Guild announcement channel
    GuildNews,
    /// Any type this client does not model
    Unknown(u8),
}

impl ChannelType {
    /// Get the numeric wire value
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::GuildText => 0,
            Self::Dm => 1,
            Self::GuildVoice => 2,
            Self::GroupDm => 3,
            Self::GuildCategory => 4,
            Self::GuildNews => 5,
            Self::Unknown(value) => value,
        }
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildNews,
            other => Self::Unknown(other),
        }
    }
}

impl Serialize for ChannelType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ChannelType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u8::deserialize(deserializer).map(Self::from)
    }
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub channel_type: ChannelType,
    pub topic: Option<String>,
    pub position: i32,
    pub parent_id: Option<Snowflake>,
}

impl Channel {
    /// Create a new channel of the given type
    #[must_use]
    pub fn new(id: Snowflake, guild_id: Option<Snowflake>, channel_type: ChannelType) -> Self {
        Self {
            id,
            guild_id,
            name: None,
            channel_type,
            topic: None,
            position: 0,
            parent_id: None,
        }
    }

    /// Check if this is a guild text channel
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.channel_type, ChannelType::GuildText | ChannelType::GuildNews)
    }

    /// Check if this is a voice channel
    #[inline]
    #[must_use]
    pub fn is_voice(&self) -> bool {
        matches!(self.channel_type, ChannelType::GuildVoice)
    }

    /// Check if this is a category
    #[inline]
    #[must_use]
    pub fn is_category(&self) -> bool {
        matches!(self.channel_type, ChannelType::GuildCategory)
    }

    /// Get display name (channel name or fallback for DMs)
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Direct Message")
    }

    /// Mention string for this channel
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}
