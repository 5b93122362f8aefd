//! Heartbeat monitor
//!
//! After HELLO the client sends `{"op":1,"d":<seq>}` every `heartbeat_interval`
//! and expects an op 11 ACK for each. A heartbeat left unacknowledged for longer
//! than the configured tolerance means the connection is a zombie; the monitor
//! then asks the session loop to reconnect and stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::protocol::GatewayMessage;
use crate::session::{Control, SessionContext};

/// Send/ack timestamps for the current connection
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatState {
    last_send: Option<Instant>,
    last_ack: Option<Instant>,
}

impl HeartbeatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&mut self, at: Instant) {
        self.last_send = Some(at);
    }

    pub fn record_ack(&mut self, at: Instant) {
        self.last_ack = Some(at);
    }

    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    pub fn last_ack(&self) -> Option<Instant> {
        self.last_ack
    }

    /// A heartbeat went out, nothing was acknowledged since, and it is older than `tolerance`
    pub fn is_stalled(&self, now: Instant, tolerance: Duration) -> bool {
        let Some(sent) = self.last_send else {
            return false;
        };
        let acked_since = self.last_ack.is_some_and(|ack| ack >= sent);
        !acked_since && now.saturating_duration_since(sent) > tolerance
    }

    /// Round trip of the last acknowledged heartbeat
    pub fn latency(&self) -> Option<Duration> {
        match (self.last_send, self.last_ack) {
            (Some(sent), Some(acked)) if acked >= sent => Some(acked - sent),
            _ => None,
        }
    }
}

/// Spawns the per-connection heartbeat task
pub struct HeartbeatMonitor;

impl HeartbeatMonitor {
    /// Start heartbeating for connection `generation`
    ///
    /// The first heartbeat goes out immediately. The caller owns the handle and
    /// aborts it before starting a monitor for another connection.
    pub(crate) fn spawn(
        ctx: Arc<SessionContext>,
        period: Duration,
        generation: u64,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if period.is_zero() {
                tracing::warn!(generation, "Zero heartbeat interval, heartbeat not started");
                return;
            }

            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let tolerance = ctx.config.heartbeat_tolerance;

            tracing::debug!(generation, interval = ?period, "Heartbeat started");

            loop {
                ticker.tick().await;

                if ctx.heartbeat.lock().is_stalled(Instant::now(), tolerance) {
                    tracing::warn!(
                        generation,
                        tolerance = ?tolerance,
                        "Heartbeat not acknowledged, requesting reconnect"
                    );
                    ctx.request(Control::Reconnect { generation });
                    return;
                }

                let heartbeat = GatewayMessage::heartbeat(ctx.sequence());
                if let Err(e) = ctx.outbox.send_as(generation, &heartbeat) {
                    tracing::debug!(generation, error = %e, "Connection replaced, heartbeat stopped");
                    return;
                }
                ctx.heartbeat.lock().record_send(Instant::now());
            }
        })
    }
}
