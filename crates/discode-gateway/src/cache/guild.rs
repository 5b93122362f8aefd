//! Cached guild with its members, channels and roles

use std::collections::HashMap;

use discode_core::entities::CDN_BASE;
use discode_core::{Channel, Member, Role, Snowflake};

use crate::events::{GuildCreateEvent, GuildUpdateEvent};

/// A guild as mirrored by the cache
#[derive(Debug, Clone)]
pub struct CachedGuild {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    /// Member count reported by the server (may exceed the cached members)
    pub member_count: Option<u64>,
    members: HashMap<Snowflake, Member>,
    channels: HashMap<Snowflake, Channel>,
    roles: HashMap<Snowflake, Role>,
}

impl CachedGuild {
    /// Create an empty guild
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            icon: None,
            owner_id: None,
            member_count: None,
            members: HashMap::new(),
            channels: HashMap::new(),
            roles: HashMap::new(),
        }
    }

    /// Build from a GUILD_CREATE payload
    pub fn from_event(event: GuildCreateEvent) -> Self {
        let mut guild = Self::new(event.id, event.name);
        guild.icon = event.icon;
        guild.owner_id = event.owner_id;
        guild.member_count = event.member_count;

        let id = guild.id;
        for member in event.members {
            guild.add_member(member.into_member(id));
        }
        for channel in event.channels {
            guild.add_channel(channel.into_channel(Some(id)));
        }
        for role in event.roles {
            guild.add_role(role.into_role(id));
        }
        guild
    }

    // === Reads ===

    pub fn members(&self) -> Vec<Member> {
        self.members.values().cloned().collect()
    }

    pub fn member(&self, user_id: Snowflake) -> Option<Member> {
        self.members.get(&user_id).cloned()
    }

    /// The current user's membership, given the id captured from READY
    pub fn me(&self, current_user_id: Snowflake) -> Option<Member> {
        self.member(current_user_id)
    }

    pub fn member_len(&self) -> usize {
        self.members.len()
    }

    /// All channels ordered by position
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.channels.values().cloned().collect();
        channels.sort_by_key(|c| (c.position, c.id));
        channels
    }

    pub fn text_channels(&self) -> Vec<Channel> {
        self.channels().into_iter().filter(Channel::is_text).collect()
    }

    pub fn channel(&self, channel_id: Snowflake) -> Option<Channel> {
        self.channels.get(&channel_id).cloned()
    }

    /// Roles ordered from lowest to highest
    pub fn roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.values().cloned().collect();
        roles.sort_by_key(|r| (r.position, r.id));
        roles
    }

    pub fn role(&self, role_id: Snowflake) -> Option<Role> {
        self.roles.get(&role_id).cloned()
    }

    /// CDN URL of the guild icon
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("{CDN_BASE}/icons/{}/{hash}.png", self.id))
    }

    // === Mutations (dispatcher only) ===

    pub(crate) fn apply_update(&mut self, event: GuildUpdateEvent) {
        self.name = event.name;
        self.icon = event.icon;
        if event.owner_id.is_some() {
            self.owner_id = event.owner_id;
        }
    }

    /// Insert or replace a member keyed by user id
    pub(crate) fn add_member(&mut self, member: Member) -> Option<Member> {
        self.members.insert(member.id(), member)
    }

    pub(crate) fn remove_member(&mut self, user_id: Snowflake) -> Option<Member> {
        self.members.remove(&user_id)
    }

    pub(crate) fn add_channel(&mut self, channel: Channel) -> Option<Channel> {
        self.channels.insert(channel.id, channel)
    }

    pub(crate) fn remove_channel(&mut self, channel_id: Snowflake) -> Option<Channel> {
        self.channels.remove(&channel_id)
    }

    pub(crate) fn add_role(&mut self, role: Role) -> Option<Role> {
        self.roles.insert(role.id, role)
    }

    pub(crate) fn remove_role(&mut self, role_id: Snowflake) -> Option<Role> {
        self.roles.remove(&role_id)
    }

    pub(crate) fn channel_ids(&self) -> impl Iterator<Item = Snowflake> + '_ {
        self.channels.keys().copied()
    }
}
