//! Entity cache
//!
//! In-memory mirror of server-pushed guild state. Reads hand out owned
//! snapshots; only the event dispatcher mutates.

mod guild;
mod store;

pub use guild::CachedGuild;
pub use store::EntityCache;
