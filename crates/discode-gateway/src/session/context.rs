//! Shared session context
//!
//! Everything the read loop, the heartbeat task, dispatch handlers and the
//! public client handle need to reach lives here behind one `Arc`.

use std::sync::Arc;
use std::time::Duration;

use discode_common::GatewayConfig;
use discode_core::Snowflake;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use super::{Control, SessionInfo, SessionState};
use crate::cache::EntityCache;
use crate::dispatcher::EventDispatcher;
use crate::error::GatewayResult;
use crate::heartbeat::HeartbeatState;
use crate::protocol::GatewayMessage;
use crate::transport::Outbox;

pub(crate) struct SessionContext {
    pub(crate) config: GatewayConfig,
    pub(crate) cache: Arc<EntityCache>,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) outbox: Outbox,
    pub(crate) heartbeat: Mutex<HeartbeatState>,
    info: RwLock<SessionInfo>,
    state: RwLock<SessionState>,
    ready: watch::Sender<bool>,
    control: mpsc::UnboundedSender<Control>,
}

impl SessionContext {
    pub(crate) fn new(config: GatewayConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<Control>) {
        let (control, control_rx) = mpsc::unbounded_channel();
        let (ready, _) = watch::channel(false);

        let ctx = Arc::new(Self {
            config,
            cache: Arc::new(EntityCache::new()),
            dispatcher: EventDispatcher::new(),
            outbox: Outbox::new(),
            heartbeat: Mutex::new(HeartbeatState::new()),
            info: RwLock::new(SessionInfo::default()),
            state: RwLock::new(SessionState::default()),
            ready,
            control,
        });
        (ctx, control_rx)
    }

    // === Session info ===

    pub(crate) fn info(&self) -> SessionInfo {
        self.info.read().clone()
    }

    pub(crate) fn update_info<R>(&self, f: impl FnOnce(&mut SessionInfo) -> R) -> R {
        f(&mut self.info.write())
    }

    pub(crate) fn sequence(&self) -> Option<u64> {
        self.info.read().sequence
    }

    pub(crate) fn observe_sequence(&self, seq: u64) {
        self.info.write().observe_sequence(seq);
    }

    pub(crate) fn session_id(&self) -> Option<String> {
        self.info.read().session_id.clone()
    }

    pub(crate) fn user_id(&self) -> Option<Snowflake> {
        self.info.read().user_id
    }

    // === Lifecycle ===

    pub(crate) fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, next: SessionState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Session state changed");
        }
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub(crate) fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub(crate) fn ready_receiver(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Hand a request to the session loop; dropped if the loop has ended
    pub(crate) fn request(&self, control: Control) {
        if self.control.send(control).is_err() {
            tracing::trace!("Session loop gone, control request dropped");
        }
    }

    // === Outbound ===

    pub(crate) fn send(&self, message: &GatewayMessage) -> GatewayResult<()> {
        self.outbox.send(message)
    }

    /// Heartbeat requested by the server, sent out of band
    pub(crate) fn send_heartbeat(&self) -> GatewayResult<()> {
        self.outbox.send(&GatewayMessage::heartbeat(self.sequence()))?;
        self.heartbeat.lock().record_send(Instant::now());
        Ok(())
    }

    pub(crate) fn record_ack(&self) {
        self.heartbeat.lock().record_ack(Instant::now());
    }

    pub(crate) fn latency(&self) -> Option<Duration> {
        self.heartbeat.lock().latency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_gate() {
        let (ctx, _rx) = SessionContext::new(GatewayConfig::new("token"));
        let mut ready = ctx.ready_receiver();
        assert!(!ctx.is_ready());

        ctx.mark_ready();
        assert!(ctx.is_ready());
        assert!(*ready.wait_for(|r| *r).await.unwrap());
    }

    #[test]
    fn test_sequence_tracking() {
        let (ctx, _rx) = SessionContext::new(GatewayConfig::new("token"));
        assert_eq!(ctx.sequence(), None);

        ctx.observe_sequence(4);
        ctx.observe_sequence(2);
        assert_eq!(ctx.sequence(), Some(4));
        assert_eq!(ctx.info().sequence, Some(4));
    }

    #[test]
    fn test_control_request_without_loop() {
        let (ctx, rx) = SessionContext::new(GatewayConfig::new("token"));
        drop(rx);
        ctx.request(Control::Shutdown);
    }

    #[test]
    fn test_state_transitions() {
        let (ctx, _rx) = SessionContext::new(GatewayConfig::new("token"));
        assert_eq!(ctx.state(), SessionState::Connecting);
        ctx.set_state(SessionState::AwaitingHello);
        assert_eq!(ctx.state(), SessionState::AwaitingHello);
    }
}
