//! Guild store backed by `DashMap`

use dashmap::DashMap;
use discode_core::{Channel, DomainError, Member, Role, Snowflake};

use super::CachedGuild;

/// Client-side entity cache
///
/// Eventually consistent with the server: snapshots may lag by one round trip.
#[derive(Debug, Default)]
pub struct EntityCache {
    guilds: DashMap<Snowflake, CachedGuild>,
    /// channel id -> owning guild id
    channel_guilds: DashMap<Snowflake, Snowflake>,
    /// Channels outside any guild (DMs)
    private_channels: DashMap<Snowflake, Channel>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    // === Reads ===

    /// Snapshot of one guild
    pub fn guild(&self, guild_id: Snowflake) -> Option<CachedGuild> {
        self.guilds.get(&guild_id).map(|g| g.clone())
    }

    /// Snapshot of every cached guild
    pub fn guilds(&self) -> Vec<CachedGuild> {
        self.guilds.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.guilds.get(&guild_id).and_then(|g| g.member(user_id))
    }

    /// Look a channel up by id alone
    pub fn channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some(channel) = self.private_channels.get(&channel_id) {
            return Some(channel.clone());
        }
        let guild_id = *self.channel_guilds.get(&channel_id)?;
        self.guilds.get(&guild_id).and_then(|g| g.channel(channel_id))
    }

    pub fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.guilds.get(&guild_id).and_then(|g| g.role(role_id))
    }

    // === Mutations (dispatcher only) ===

    /// Insert a guild, replacing any previous copy
    pub(crate) fn insert_guild(&self, guild: CachedGuild) -> Option<CachedGuild> {
        for channel_id in guild.channel_ids() {
            self.channel_guilds.insert(channel_id, guild.id);
        }
        let previous = self.guilds.insert(guild.id, guild);
        if let Some(old) = &previous {
            self.forget_stale_channels(old);
        }
        previous
    }

    pub(crate) fn remove_guild(&self, guild_id: Snowflake) -> Option<CachedGuild> {
        let (_, guild) = self.guilds.remove(&guild_id)?;
        for channel_id in guild.channel_ids() {
            self.channel_guilds.remove(&channel_id);
        }
        Some(guild)
    }

    /// Run `f` against a cached guild
    pub(crate) fn with_guild<R>(
        &self,
        guild_id: Snowflake,
        f: impl FnOnce(&mut CachedGuild) -> R,
    ) -> Result<R, DomainError> {
        let mut guild = self
            .guilds
            .get_mut(&guild_id)
            .ok_or(DomainError::GuildNotFound(guild_id))?;
        Ok(f(guild.value_mut()))
    }

    /// Add members to a guild; returns how many ids were new
    pub(crate) fn add_members(
        &self,
        guild_id: Snowflake,
        members: impl IntoIterator<Item = Member>,
    ) -> Result<usize, DomainError> {
        self.with_guild(guild_id, |guild| {
            let mut added = 0;
            for member in members {
                if guild.add_member(member).is_none() {
                    added += 1;
                }
            }
            added
        })
    }

    pub(crate) fn upsert_channel(&self, channel: Channel) -> Result<(), DomainError> {
        match channel.guild_id {
            Some(guild_id) => {
                let channel_id = channel.id;
                self.with_guild(guild_id, |guild| guild.add_channel(channel))?;
                self.channel_guilds.insert(channel_id, guild_id);
            }
            None => {
                self.private_channels.insert(channel.id, channel);
            }
        }
        Ok(())
    }

    pub(crate) fn remove_channel(&self, channel_id: Snowflake) -> Option<Channel> {
        if let Some((_, channel)) = self.private_channels.remove(&channel_id) {
            return Some(channel);
        }
        let (_, guild_id) = self.channel_guilds.remove(&channel_id)?;
        self.guilds
            .get_mut(&guild_id)
            .and_then(|mut g| g.remove_channel(channel_id))
    }

    pub(crate) fn clear(&self) {
        self.guilds.clear();
        self.channel_guilds.clear();
        self.private_channels.clear();
    }

    fn forget_stale_channels(&self, old: &CachedGuild) {
        let Some(current) = self.guilds.get(&old.id) else {
            return;
        };
        let stale: Vec<Snowflake> = old
            .channel_ids()
            .filter(|id| current.channel(*id).is_none())
            .collect();
        drop(current);

        for channel_id in stale {
            self.channel_guilds.remove(&channel_id);
        }
    }
}
