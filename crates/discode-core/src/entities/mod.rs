//! Domain entities - objects mirrored from server-pushed state

mod channel;
mod member;
mod role;
mod user;

pub use channel::{Channel, ChannelType};
pub use member::Member;
pub use role::Role;
pub use user::User;

/// Base URL of the asset CDN
pub const CDN_BASE: &str = "https://cdn.discordapp.com";
