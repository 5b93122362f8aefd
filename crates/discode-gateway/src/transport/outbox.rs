//! Outbound send queue
//!
//! Each connection gets one unbounded queue drained by a single writer task, so
//! frames leave in the order they were enqueued. The `Outbox` points at the queue
//! of the current connection and numbers connections with a generation counter.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::TransportSink;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::GatewayMessage;

/// Item on a connection's send queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    /// Send a close frame and stop the writer
    Close(u16),
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    sender: Option<mpsc::UnboundedSender<Outgoing>>,
}

/// Handle to the current connection's send queue
#[derive(Debug, Default)]
pub struct Outbox {
    slot: Mutex<Slot>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the outbox at a new connection's queue; returns the new generation
    pub fn install(&self, sender: mpsc::UnboundedSender<Outgoing>) -> u64 {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        slot.sender = Some(sender);
        slot.generation
    }

    /// Generation of the current (or last) connection
    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().sender.as_ref().is_some_and(|s| !s.is_closed())
    }

    /// Enqueue on the current connection
    pub fn send(&self, message: &GatewayMessage) -> GatewayResult<()> {
        let text = message.to_json()?;
        let slot = self.slot.lock();
        Self::push(&slot, text, message)
    }

    /// Enqueue only if `generation` is still the current connection
    ///
    /// Returns `QueueClosed` for a replaced connection.
    pub fn send_as(&self, generation: u64, message: &GatewayMessage) -> GatewayResult<()> {
        let text = message.to_json()?;
        let slot = self.slot.lock();
        if slot.generation != generation {
            return Err(GatewayError::QueueClosed);
        }
        Self::push(&slot, text, message)
    }

    /// Ask the writer to close the connection with `code` and detach its queue
    pub fn close(&self, code: u16) {
        let sender = self.slot.lock().sender.take();
        if let Some(sender) = sender {
            let _ = sender.send(Outgoing::Close(code));
        }
    }

    fn push(slot: &Slot, text: String, message: &GatewayMessage) -> GatewayResult<()> {
        let sender = slot.sender.as_ref().ok_or(GatewayError::QueueClosed)?;
        sender
            .send(Outgoing::Text(text))
            .map_err(|_| GatewayError::QueueClosed)?;

        tracing::trace!(generation = slot.generation, op = %message.op, "Frame enqueued");
        Ok(())
    }
}

/// Spawn the task that drains one connection's queue into its sink
pub fn spawn_writer(
    mut sink: Box<dyn TransportSink>,
    mut queue: mpsc::UnboundedReceiver<Outgoing>,
    generation: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = queue.recv().await {
            match item {
                Outgoing::Text(text) => {
                    if let Err(e) = sink.send_text(text).await {
                        tracing::warn!(generation, error = %e, "Failed to write frame");
                        break;
                    }
                }
                Outgoing::Close(code) => {
                    if let Err(e) = sink.close(code).await {
                        tracing::debug!(generation, code, error = %e, "Close failed, ignoring");
                    }
                    return;
                }
            }
        }

        // Queue dropped without an explicit close
        let _ = sink.close(1000).await;
        tracing::debug!(generation, "Writer task ended");
    })
}
