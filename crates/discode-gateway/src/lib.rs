//! # discode-gateway
//!
//! Client side of the real-time gateway: decodes the (optionally zlib-stream
//! compressed) frame stream, drives the session lifecycle with heartbeats and
//! resumes, dispatches events to listeners, and mirrors guild state in a local
//! cache.

pub mod cache;
pub mod client;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod transport;

pub use cache::{CachedGuild, EntityCache};
pub use client::GatewayClient;
pub use dispatcher::{EventDispatcher, GatewayEvent, Listener};
pub use error::{DecodeError, GatewayError, GatewayResult};
pub use heartbeat::HeartbeatState;
pub use protocol::{CloseCode, GatewayMessage, OpCode, Status};
pub use resolver::{GatewayResolver, HttpGatewayResolver, StaticResolver};
pub use session::{Gateway, GatewaySession, SessionInfo, SessionState};
pub use transport::{Connector, TransportMessage, TransportSink, TransportStream, WebSocketConnector};
