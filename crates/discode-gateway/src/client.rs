//! Public handle onto a running gateway session
//!
//! `GatewayClient` is cheap to clone. It registers listeners, reads the cache
//! and sends the client-initiated opcodes while `GatewaySession::run` drives
//! the connection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use discode_core::Snowflake;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use crate::cache::EntityCache;
use crate::dispatcher::GatewayEvent;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{GatewayMessage, PresenceUpdatePayload, RequestGuildMembersPayload, Status};
use crate::session::{Control, SessionContext, SessionState};

#[derive(Clone)]
pub struct GatewayClient {
    ctx: Arc<SessionContext>,
}

impl GatewayClient {
    pub(crate) fn new(ctx: Arc<SessionContext>) -> Self {
        Self { ctx }
    }

    // === Events ===

    /// Register an async listener for an event name (case-insensitive)
    ///
    /// Each invocation runs on its own task; an `Err` is logged and otherwise ignored.
    pub fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.ctx.dispatcher.on(event, listener);
    }

    /// Payload of the next `event`
    pub fn wait_for(&self, event: &str) -> oneshot::Receiver<Value> {
        self.ctx.dispatcher.wait_for(event)
    }

    /// Stream of every dispatched event
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.ctx.dispatcher.subscribe()
    }

    /// Resolves once READY has been processed
    ///
    /// Returns immediately if the session is already ready.
    pub async fn wait_until_ready(&self) {
        let mut ready = self.ctx.ready_receiver();
        // The sender lives in the context this handle keeps alive
        let _ = ready.wait_for(|ready| *ready).await;
    }

    // === State ===

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.ctx.cache
    }

    pub fn is_ready(&self) -> bool {
        self.ctx.is_ready()
    }

    pub fn is_closed(&self) -> bool {
        self.ctx.state() == SessionState::Closed
    }

    pub fn state(&self) -> SessionState {
        self.ctx.state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.ctx.session_id()
    }

    /// Last dispatch sequence seen
    pub fn sequence(&self) -> Option<u64> {
        self.ctx.sequence()
    }

    /// The connected user, once READY arrived
    pub fn user_id(&self) -> Option<Snowflake> {
        self.ctx.user_id()
    }

    /// Round trip of the last acknowledged heartbeat
    pub fn latency(&self) -> Option<Duration> {
        self.ctx.latency()
    }

    // === Commands ===

    /// Ask for a guild's members; they arrive as GUILD_MEMBERS_CHUNK events
    ///
    /// A nonce is generated when none is given. The nonce is returned so the
    /// caller can match the answering chunks.
    ///
    /// # Errors
    /// `QueueClosed` when no connection is open.
    pub fn request_guild_members(
        &self,
        guild_id: Snowflake,
        query: &str,
        limit: u32,
        presences: bool,
        nonce: Option<String>,
    ) -> GatewayResult<String> {
        let nonce = nonce.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        let mut payload = RequestGuildMembersPayload::all(guild_id)
            .with_query(query, limit)
            .with_nonce(nonce.clone());
        if presences {
            payload = payload.with_presences(true);
        }

        self.ctx.send(&GatewayMessage::request_guild_members(&payload)?)?;
        tracing::debug!(guild_id = %guild_id, nonce = %nonce, "Member request sent");
        Ok(nonce)
    }

    /// Change the online status of the connected user
    ///
    /// # Errors
    /// `QueueClosed` when no connection is open.
    pub fn update_presence(&self, status: Status) -> GatewayResult<()> {
        let message = GatewayMessage::presence_update(&PresenceUpdatePayload::new(status))?;
        self.ctx.send(&message).map_err(|e| {
            tracing::debug!(error = %e, "Presence update not sent");
            e
        })
    }

    /// Stop the session loop; `run()` then returns `Ok(())`
    pub fn shutdown(&self) {
        if !self.is_closed() {
            self.ctx.request(Control::Shutdown);
        }
    }

    /// Fail fast with `QueueClosed` if there is no open connection
    pub fn ensure_connected(&self) -> GatewayResult<()> {
        if self.ctx.outbox.is_open() {
            Ok(())
        } else {
            Err(GatewayError::QueueClosed)
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
