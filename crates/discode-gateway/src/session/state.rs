//! Session lifecycle state and resumable session data

use std::fmt;
use std::time::Duration;

use discode_core::Snowflake;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Resolving the gateway URL and opening the transport
    #[default]
    Connecting,
    /// Transport open, waiting for HELLO before identifying
    AwaitingHello,
    /// IDENTIFY sent, waiting for READY
    Identifying,
    /// READY or RESUMED received; events are flowing
    SteadyState,
    /// Replacing the transport after RECONNECT or a heartbeat stall
    Reconnecting,
    /// RESUME sent on the new transport, waiting for RESUMED
    Resuming,
    /// Session loop has ended
    Closed,
}

impl SessionState {
    /// Whether IDENTIFY should follow the next HELLO
    #[must_use]
    pub const fn identifies_on_hello(self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingHello)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting_hello",
            Self::Identifying => "identifying",
            Self::SteadyState => "steady",
            Self::Reconnecting => "reconnecting",
            Self::Resuming => "resuming",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data needed to resume a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Assigned by READY
    pub session_id: Option<String>,
    /// Highest dispatch sequence seen; `None` until the first dispatch
    pub sequence: Option<u64>,
    /// Current user, captured from READY
    pub user_id: Option<Snowflake>,
    pub heartbeat_interval: Option<Duration>,
}

impl SessionInfo {
    /// Record a sequence number, keeping the maximum seen
    pub fn observe_sequence(&mut self, seq: u64) {
        self.sequence = Some(self.sequence.map_or(seq, |current| current.max(seq)));
    }

    /// Session id and sequence for a RESUME, if a session was ever assigned
    pub fn resume_point(&self) -> Option<(String, u64)> {
        self.session_id
            .clone()
            .map(|id| (id, self.sequence.unwrap_or(0)))
    }

    /// Forget the session after a non-resumable disconnect
    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.sequence = None;
    }
}
