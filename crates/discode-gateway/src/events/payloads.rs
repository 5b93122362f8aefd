//! Event payload definitions
//!
//! Inbound shapes only. Unknown fields are ignored; entities are built from these
//! through explicit conversions that thread in the owning guild id.

use chrono::{DateTime, Utc};
use discode_core::{Channel, ChannelType, Member, Role, Snowflake, User};
use serde::{Deserialize, Deserializer};

// === Connection Events ===

/// READY event payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    #[serde(default)]
    pub v: u8,
    /// Current user
    pub user: User,
    /// Session ID for resuming
    pub session_id: String,
    /// Guilds the user is in (initially unavailable)
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}

/// Unavailable guild in READY event
#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

// === Guild Events ===

/// GUILD_CREATE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildCreateEvent {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub channels: Vec<ChannelPayload>,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
}

/// GUILD_UPDATE event payload (guild fields only, no member or channel lists)
#[derive(Debug, Clone, Deserialize)]
pub struct GuildUpdateEvent {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
}

/// GUILD_DELETE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildDeleteEvent {
    pub id: Snowflake,
    /// If true, this is a temporary outage; if false, the user left/was kicked/guild was deleted
    #[serde(default)]
    pub unavailable: bool,
}

/// GUILD_MEMBERS_CHUNK event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMembersChunkEvent {
    pub guild_id: Snowflake,
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub chunk_count: u32,
    #[serde(default)]
    pub nonce: Option<String>,
}

// === Member Events ===

/// Member data included in events
#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
}

impl MemberPayload {
    /// Build the member entity for `guild_id`
    pub fn into_member(self, guild_id: Snowflake) -> Member {
        let mut member = Member::new(guild_id, self.user);
        member.nickname = self.nick;
        member.role_ids = self.roles;
        member.joined_at = self.joined_at;
        member.deaf = self.deaf;
        member.mute = self.mute;
        member
    }
}

/// GUILD_MEMBER_ADD / GUILD_MEMBER_UPDATE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: MemberPayload,
}

/// GUILD_MEMBER_REMOVE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: User,
}

// === Channel Events ===

/// Channel data included in GUILD_CREATE and channel events
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
}

impl ChannelPayload {
    /// Build the channel entity; `guild_id` fills in for payloads nested in a guild
    pub fn into_channel(self, guild_id: Option<Snowflake>) -> Channel {
        let mut channel = Channel::new(self.id, self.guild_id.or(guild_id), self.channel_type);
        channel.name = self.name;
        channel.position = self.position;
        channel.topic = self.topic;
        channel.parent_id = self.parent_id;
        channel
    }
}

// === Role Events ===

/// Role data included in events
#[derive(Debug, Clone, Deserialize)]
pub struct RolePayload {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    /// Permission bitfield, sent as a decimal string
    #[serde(default, deserialize_with = "permission_bits")]
    pub permissions: u64,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

impl RolePayload {
    /// Build the role entity for `guild_id`
    pub fn into_role(self, guild_id: Snowflake) -> Role {
        let mut role = Role::new(self.id, guild_id, self.name);
        role.color = self.color;
        role.hoist = self.hoist;
        role.position = self.position;
        role.permissions = self.permissions;
        role.managed = self.managed;
        role.mentionable = self.mentionable;
        role
    }
}

/// GUILD_ROLE_CREATE / GUILD_ROLE_UPDATE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildRoleEvent {
    pub guild_id: Snowflake,
    pub role: RolePayload,
}

/// GUILD_ROLE_DELETE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildRoleDeleteEvent {
    pub guild_id: Snowflake,
    pub role_id: Snowflake,
}

fn permission_bits<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Bits {
        Text(String),
        Number(u64),
    }

    match Bits::deserialize(deserializer)? {
        Bits::Text(text) => text.parse().map_err(serde::de::Error::custom),
        Bits::Number(number) => Ok(number),
    }
}
