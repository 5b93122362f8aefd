//! Gateway events
//!
//! Dispatch event names and the payload shapes the cache consumes.

mod event_types;
mod payloads;

pub use event_types::GatewayEventType;
pub use payloads::{
    ChannelPayload, GuildCreateEvent, GuildDeleteEvent, GuildMemberEvent, GuildMemberRemoveEvent,
    GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent, GuildUpdateEvent, MemberPayload,
    ReadyEvent, RolePayload, UnavailableGuild,
};
