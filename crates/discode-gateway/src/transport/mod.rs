//! Transport seam
//!
//! The session talks to the network only through these traits, so tests can
//! drive it with an in-memory transport.

mod outbox;
mod websocket;

pub use outbox::{spawn_writer, Outbox, Outgoing};
pub use websocket::WebSocketConnector;

use async_trait::async_trait;

use crate::error::GatewayResult;

/// A message received from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    /// Uncompressed JSON frame
    Text(String),
    /// Chunk of a zlib-stream frame
    Binary(Vec<u8>),
    /// Close frame with its code
    Close(u16),
}

/// Write half of a connection
#[async_trait]
pub trait TransportSink: Send {
    async fn send_text(&mut self, text: String) -> GatewayResult<()>;

    /// Send a close frame with `code` and shut the write half
    async fn close(&mut self, code: u16) -> GatewayResult<()>;
}

/// Read half of a connection
#[async_trait]
pub trait TransportStream: Send {
    /// Next message, or `None` once the connection ended without a close code
    ///
    /// Must be cancel safe; the session polls it inside `select!`.
    async fn recv(&mut self) -> GatewayResult<Option<TransportMessage>>;
}

/// Opens connections to a gateway URL
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
    ) -> GatewayResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)>;
}
