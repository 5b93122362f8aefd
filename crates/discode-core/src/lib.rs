//! # discode-core
//!
//! Domain layer containing snowflakes, gateway intents, and the entities mirrored
//! by the client-side cache. This crate has zero dependencies on I/O (transport,
//! HTTP, runtime).

pub mod entities;
pub mod error;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Channel, ChannelType, Member, Role, User};
pub use error::DomainError;
pub use value_objects::{Intents, Snowflake, SnowflakeParseError};
