//! Cache side effects of dispatch events
//!
//! These are the only callers of the cache's mutators. A handler that cannot
//! apply its event logs a warning and leaves the cache untouched.

use discode_core::DomainError;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::CachedGuild;
use crate::events::{
    ChannelPayload, GatewayEventType, GuildCreateEvent, GuildDeleteEvent, GuildMemberEvent,
    GuildMemberRemoveEvent, GuildMembersChunkEvent, GuildRoleDeleteEvent, GuildRoleEvent,
    GuildUpdateEvent, ReadyEvent,
};
use crate::protocol::{GatewayMessage, RequestGuildMembersPayload};
use crate::session::SessionContext;

type HandlerResult = Result<(), DomainError>;

pub(super) fn apply(ctx: &SessionContext, name: &str, data: &Value) {
    let Some(kind) = GatewayEventType::from_str(name) else {
        return;
    };

    let result = match kind {
        GatewayEventType::Ready => on_ready(ctx, data),
        GatewayEventType::Resumed => {
            tracing::info!(session_id = ?ctx.session_id(), seq = ?ctx.sequence(), "Session resumed");
            Ok(())
        }
        GatewayEventType::GuildCreate => on_guild_create(ctx, data),
        GatewayEventType::GuildUpdate => on_guild_update(ctx, data),
        GatewayEventType::GuildDelete => on_guild_delete(ctx, data),
        GatewayEventType::GuildMembersChunk => on_members_chunk(ctx, data),
        GatewayEventType::GuildMemberAdd | GatewayEventType::GuildMemberUpdate => {
            on_member_upsert(ctx, kind, data)
        }
        GatewayEventType::GuildMemberRemove => on_member_remove(ctx, data),
        GatewayEventType::ChannelCreate | GatewayEventType::ChannelUpdate => {
            on_channel_upsert(ctx, kind, data)
        }
        GatewayEventType::ChannelDelete => on_channel_delete(ctx, data),
        GatewayEventType::GuildRoleCreate | GatewayEventType::GuildRoleUpdate => {
            on_role_upsert(ctx, kind, data)
        }
        GatewayEventType::GuildRoleDelete => on_role_delete(ctx, data),
    };

    if let Err(e) = result {
        tracing::warn!(event = name, code = e.code(), error = %e, "Cache update skipped");
    }
}

fn parse<'a, T: Deserialize<'a>>(kind: GatewayEventType, data: &'a Value) -> Result<T, DomainError> {
    T::deserialize(data).map_err(|e| DomainError::invalid_payload(kind.as_str(), e.to_string()))
}

// === Connection ===

fn on_ready(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let ready: ReadyEvent = parse(GatewayEventType::Ready, data)?;

    ctx.update_info(|info| {
        info.session_id = Some(ready.session_id.clone());
        info.user_id = Some(ready.user.id);
    });
    ctx.mark_ready();

    tracing::info!(
        session_id = %ready.session_id,
        user = %ready.user.tag(),
        guilds = ready.guilds.len(),
        "Session ready"
    );
    Ok(())
}

// === Guilds ===

fn on_guild_create(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let event: GuildCreateEvent = parse(GatewayEventType::GuildCreate, data)?;
    if event.unavailable {
        tracing::debug!(guild_id = %event.id, "Guild unavailable, not cached");
        return Ok(());
    }

    if ctx.config.chunk_guilds_at_startup {
        request_members(ctx, &RequestGuildMembersPayload::all(event.id));
    }

    let guild = CachedGuild::from_event(event);
    tracing::debug!(guild_id = %guild.id, name = %guild.name, "Guild cached");
    ctx.cache.insert_guild(guild);
    Ok(())
}

fn on_guild_update(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let event: GuildUpdateEvent = parse(GatewayEventType::GuildUpdate, data)?;
    ctx.cache.with_guild(event.id, |guild| guild.apply_update(event))
}

fn on_guild_delete(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let event: GuildDeleteEvent = parse(GatewayEventType::GuildDelete, data)?;
    if event.unavailable {
        tracing::info!(guild_id = %event.id, "Guild outage, keeping cached copy");
        return Ok(());
    }

    ctx.cache
        .remove_guild(event.id)
        .map(|_| ())
        .ok_or(DomainError::GuildNotFound(event.id))
}

// === Members ===

fn on_members_chunk(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let chunk: GuildMembersChunkEvent = parse(GatewayEventType::GuildMembersChunk, data)?;
    let guild_id = chunk.guild_id;
    let members = chunk.members.into_iter().map(|m| m.into_member(guild_id));

    let added = ctx.cache.add_members(guild_id, members)?;
    tracing::debug!(
        guild_id = %guild_id,
        added,
        chunk = chunk.chunk_index + 1,
        of = chunk.chunk_count,
        nonce = ?chunk.nonce,
        "Member chunk applied"
    );
    Ok(())
}

fn on_member_upsert(ctx: &SessionContext, kind: GatewayEventType, data: &Value) -> HandlerResult {
    let event: GuildMemberEvent = parse(kind, data)?;
    let member = event.member.into_member(event.guild_id);
    let joined = kind == GatewayEventType::GuildMemberAdd;

    ctx.cache.with_guild(event.guild_id, |guild| {
        if guild.add_member(member).is_none() && joined {
            guild.member_count = guild.member_count.map(|n| n + 1);
        }
    })
}

fn on_member_remove(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let event: GuildMemberRemoveEvent = parse(GatewayEventType::GuildMemberRemove, data)?;

    ctx.cache.with_guild(event.guild_id, |guild| {
        guild.remove_member(event.user.id);
        guild.member_count = guild.member_count.map(|n| n.saturating_sub(1));
    })
}

// === Channels ===

fn on_channel_upsert(ctx: &SessionContext, kind: GatewayEventType, data: &Value) -> HandlerResult {
    let payload: ChannelPayload = parse(kind, data)?;
    ctx.cache.upsert_channel(payload.into_channel(None))
}

fn on_channel_delete(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let payload: ChannelPayload = parse(GatewayEventType::ChannelDelete, data)?;
    ctx.cache
        .remove_channel(payload.id)
        .map(|_| ())
        .ok_or(DomainError::ChannelNotFound(payload.id))
}

// === Roles ===

fn on_role_upsert(ctx: &SessionContext, kind: GatewayEventType, data: &Value) -> HandlerResult {
    let event: GuildRoleEvent = parse(kind, data)?;
    let role = event.role.into_role(event.guild_id);
    ctx.cache.with_guild(event.guild_id, |guild| {
        guild.add_role(role);
    })
}

fn on_role_delete(ctx: &SessionContext, data: &Value) -> HandlerResult {
    let event: GuildRoleDeleteEvent = parse(GatewayEventType::GuildRoleDelete, data)?;
    ctx.cache
        .with_guild(event.guild_id, |guild| guild.remove_role(event.role_id))?
        .map(|_| ())
        .ok_or(DomainError::RoleNotFound(event.role_id))
}

/// Enqueue a REQUEST_GUILD_MEMBERS; failure only costs the member list
fn request_members(ctx: &SessionContext, payload: &RequestGuildMembersPayload) {
    let sent = GatewayMessage::request_guild_members(payload)
        .map_err(crate::error::GatewayError::from)
        .and_then(|message| ctx.send(&message));

    if let Err(e) = sent {
        tracing::warn!(guild_id = %payload.guild_id, error = %e, "Member request not sent");
    }
}
