//! Gateway protocol definitions
//!
//! Op codes, close codes, the frame envelope and the payloads the client sends.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::{OpCode, UnknownOpCode};
pub use payloads::{
    HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload,
    RequestGuildMembersPayload, ResumePayload, Status,
};
