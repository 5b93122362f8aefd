//! Gateway error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Failure to turn received bytes into a frame
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("zlib inflate failed: {0}")]
    Decompress(#[from] flate2::DecompressError),

    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A received frame could not be decoded
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] DecodeError),

    /// The application requested intents it is not approved for (close code 4014)
    #[error("Privileged intents are not enabled for this application")]
    PrivilegedIntentsRequired,

    /// The server closed the connection
    #[error("Disconnected with code {code} from the gateway")]
    Disconnected { code: u16 },

    /// The server rejected the session; a fresh identify is required
    #[error("Session invalidated by the gateway")]
    InvalidSession,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    /// No connection is open to send on
    #[error("Send queue closed")]
    QueueClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Map a close code received from the server
    #[must_use]
    pub fn from_close_code(code: u16) -> Self {
        if code == CloseCode::DisallowedIntents.as_u16() {
            Self::PrivilegedIntentsRequired
        } else {
            Self::Disconnected { code }
        }
    }

    /// Known close code carried by this error, if any
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::PrivilegedIntentsRequired => Some(CloseCode::DisallowedIntents),
            Self::Disconnected { code } => CloseCode::from_u16(*code),
            _ => None,
        }
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
