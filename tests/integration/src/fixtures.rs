//! Test fixtures and frame builders
//!
//! Server-to-client frames in the wire shape the gateway sends.

use flate2::{Compress, Compression, FlushCompress};
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "test-token";

pub const BOT_USER_ID: &str = "42";

pub fn hello(heartbeat_interval_ms: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval_ms}, "s": null, "t": null})
}

pub fn heartbeat_ack() -> Value {
    json!({"op": 11})
}

/// Server-requested heartbeat
pub fn heartbeat_request() -> Value {
    json!({"op": 1, "d": null})
}

pub fn reconnect() -> Value {
    json!({"op": 7, "d": null})
}

pub fn invalid_session() -> Value {
    json!({"op": 9, "d": false})
}

pub fn dispatch(name: &str, seq: u64, data: Value) -> Value {
    json!({"op": 0, "s": seq, "t": name, "d": data})
}

pub fn ready(session_id: &str, seq: u64) -> Value {
    dispatch(
        "READY",
        seq,
        json!({
            "v": 9,
            "user": {"id": BOT_USER_ID, "username": "discode", "discriminator": "0", "bot": true},
            "session_id": session_id,
            "guilds": [{"id": "1", "unavailable": true}]
        }),
    )
}

pub fn resumed(seq: u64) -> Value {
    dispatch("RESUMED", seq, json!({}))
}

pub fn guild_create(guild_id: &str, seq: u64) -> Value {
    dispatch(
        "GUILD_CREATE",
        seq,
        json!({
            "id": guild_id,
            "name": "Test Guild",
            "icon": "a1b2c3",
            "owner_id": BOT_USER_ID,
            "member_count": 3,
            "channels": [
                {"id": "100", "type": 0, "name": "general", "position": 0},
                {"id": "101", "type": 2, "name": "voice", "position": 1},
                {"id": "102", "type": 4, "name": "category", "position": 2}
            ],
            "roles": [{"id": guild_id, "name": "@everyone", "permissions": "104324673"}],
            "members": [{"user": {"id": BOT_USER_ID, "username": "discode"}, "roles": []}]
        }),
    )
}

pub fn members_chunk(guild_id: &str, seq: u64, user_ids: &[&str]) -> Value {
    let members: Vec<Value> = user_ids
        .iter()
        .map(|id| json!({"user": {"id": id, "username": format!("member{id}")}, "roles": []}))
        .collect();

    dispatch(
        "GUILD_MEMBERS_CHUNK",
        seq,
        json!({"guild_id": guild_id, "members": members, "chunk_index": 0, "chunk_count": 1}),
    )
}

/// Server side of a zlib-stream: one compression context shared by every frame
pub struct ZlibStream(Compress);

impl ZlibStream {
    pub fn new() -> Self {
        Self(Compress::new(Compression::default(), true))
    }

    /// Compress one frame, ending in the sync-flush marker
    pub fn frame(&mut self, frame: &Value) -> Vec<u8> {
        let text = frame.to_string();
        let mut out = Vec::with_capacity(text.len() + 1024);
        self.0
            .compress_vec(text.as_bytes(), &mut out, FlushCompress::Sync)
            .expect("compression failed");
        out
    }
}

impl Default for ZlibStream {
    fn default() -> Self {
        Self::new()
    }
}
