//! Gateway intents bitflags
//!
//! Intents select which categories of events the server pushes over the gateway.
//! Sent in the Identify payload as a plain integer.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Gateway intent flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild create/update/delete, role and channel events
        const GUILDS                    = 1 << 0;
        /// Member add/update/remove (privileged)
        const GUILD_MEMBERS             = 1 << 1;
        /// Ban add/remove
        const GUILD_BANS                = 1 << 2;
        /// Emoji and sticker updates
        const GUILD_EMOJIS              = 1 << 3;
        /// Integration updates
        const GUILD_INTEGRATIONS        = 1 << 4;
        /// Webhook updates
        const GUILD_WEBHOOKS            = 1 << 5;
        /// Invite create/delete
        const GUILD_INVITES             = 1 << 6;
        /// Voice state updates
        const GUILD_VOICE_STATES        = 1 << 7;
        /// Presence updates (privileged)
        const GUILD_PRESENCES           = 1 << 8;
        /// Guild message events
        const GUILD_MESSAGES            = 1 << 9;
        /// Guild message reaction events
        const GUILD_MESSAGE_REACTIONS   = 1 << 10;
        /// Guild typing events
        const GUILD_MESSAGE_TYPING      = 1 << 11;
        /// Direct message events
        const DIRECT_MESSAGES           = 1 << 12;
        /// Direct message reaction events
        const DIRECT_MESSAGE_REACTIONS  = 1 << 13;
        /// Direct message typing events
        const DIRECT_MESSAGE_TYPING     = 1 << 14;
    }
}

impl Intents {
    /// Intents that require explicit approval for the application.
    ///
    /// Requesting them without approval closes the gateway with code 4014.
    #[must_use]
    pub const fn privileged() -> Self {
        Self::GUILD_MEMBERS.union(Self::GUILD_PRESENCES)
    }

    /// Check whether any privileged intent is requested
    #[inline]
    pub fn has_privileged(&self) -> bool {
        self.intersects(Self::privileged())
    }

    /// Parse from string representation (decimal number)
    pub fn parse(s: &str) -> Result<Self, std::num::ParseIntError> {
        s.trim().parse::<u64>().map(Intents::from_bits_truncate)
    }
}

impl Default for Intents {
    /// Every intent that does not need approval
    fn default() -> Self {
        Self::all().difference(Self::privileged())
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

// Identify expects a plain integer
impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Intents::from_bits_truncate)
    }
}
