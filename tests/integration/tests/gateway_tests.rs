//! Gateway session integration tests
//!
//! Each test drives a real `GatewaySession` over scripted in-memory connections.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use discode_core::Snowflake;
use discode_gateway::{GatewayError, SessionState};
use integration_tests::{eventually, fixtures::*, test_config, TestSession, TEST_GATEWAY_URL};

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_hello_triggers_identify() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(45_000));
    assert!(eventually(|| !server.sent_with_op(2).is_empty()).await);

    let identify = &server.sent_with_op(2)[0];
    assert_eq!(identify["d"]["token"], TEST_TOKEN);
    assert!(identify["d"]["intents"].is_u64());
    assert_eq!(identify["d"]["properties"]["$browser"], "discode");
    assert_eq!(identify["d"]["properties"]["$device"], "discode");
    assert_eq!(session.client.state(), SessionState::Identifying);
    assert_eq!(session.connector.urls(), vec![TEST_GATEWAY_URL.to_string()]);

    // First heartbeat goes out right away and carries no sequence yet
    assert!(eventually(|| !server.sent_with_op(1).is_empty()).await);
    assert!(server.sent_with_op(1)[0]["d"].is_null());

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_wait_until_ready_gates_on_ready() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];
    let client = session.client.clone();

    server.send_json(&hello(45_000));
    let early = tokio::time::timeout(Duration::from_millis(100), client.wait_until_ready()).await;
    assert!(early.is_err());
    assert!(!client.is_ready());

    server.send_json(&ready("session-1", 1));
    tokio::time::timeout(Duration::from_secs(1), client.wait_until_ready())
        .await
        .expect("ready gate did not open");

    assert!(client.is_ready());
    assert_eq!(client.session_id().as_deref(), Some("session-1"));
    assert_eq!(client.user_id(), Some(Snowflake::new(42)));
    assert_eq!(client.state(), SessionState::SteadyState);

    client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_sequence_tracks_maximum() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];
    let last = session.client.wait_for("typing_start");

    server.send_json(&hello(45_000));
    server.send_json(&ready("session-1", 1));
    server.send_json(&dispatch("MESSAGE_CREATE", 5, serde_json::json!({})));
    server.send_json(&dispatch("MESSAGE_CREATE", 3, serde_json::json!({})));
    server.send_json(&dispatch("TYPING_START", 4, serde_json::json!({})));

    tokio::time::timeout(Duration::from_secs(1), last).await.unwrap().unwrap();
    assert_eq!(session.client.sequence(), Some(5));

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_garbage_frames_are_ignored() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(45_000));
    server.send_raw("not json at all");
    server.send_json(&serde_json::json!({"op": 99, "d": null}));
    server.send_json(&ready("session-1", 1));

    tokio::time::timeout(Duration::from_secs(1), session.client.wait_until_ready())
        .await
        .unwrap();

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_compressed_frames_in_chunks() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];
    let mut zlib = ZlibStream::new();

    let hello_bytes = zlib.frame(&hello(45_000));
    let (head, tail) = hello_bytes.split_at(hello_bytes.len() / 2);
    server.send_binary(head.to_vec());
    server.send_binary(Vec::new());
    server.send_binary(tail.to_vec());

    // Second frame shares the compression context with the first
    server.send_binary(zlib.frame(&ready("session-z", 2)));

    tokio::time::timeout(Duration::from_secs(1), session.client.wait_until_ready())
        .await
        .unwrap();
    assert_eq!(server.sent_with_op(2).len(), 1);
    assert_eq!(session.client.session_id().as_deref(), Some("session-z"));

    session.client.shutdown();
    session.finish().await.unwrap();
}

// ============================================================================
// Heartbeat Tests
// ============================================================================

#[tokio::test]
async fn test_heartbeat_ack_records_latency() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(45_000));
    assert!(eventually(|| !server.sent_with_op(1).is_empty()).await);
    assert!(session.client.latency().is_none());

    server.send_json(&heartbeat_ack());
    assert!(eventually(|| session.client.latency().is_some()).await);

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_server_requested_heartbeat() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(45_000));
    server.send_json(&ready("session-1", 8));
    assert!(eventually(|| session.client.is_ready()).await);

    server.send_json(&heartbeat_request());
    assert!(eventually(|| server.sent_with_op(1).iter().any(|hb| hb["d"] == 8)).await);

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_stall_reconnects_once() {
    let (session, servers) = TestSession::start(test_config(), 2);
    let (first, second) = (&servers[0], &servers[1]);

    first.send_json(&hello(1_000));
    first.send_json(&ready("session-1", 7));
    assert!(eventually(|| !first.sent_with_op(1).is_empty()).await);
    let first_heartbeat = tokio::time::Instant::now();

    // No ACK ever arrives: the tick after the first heartbeat finds it stale
    assert!(eventually(|| !second.sent_with_op(6).is_empty()).await);
    assert!(first_heartbeat.elapsed() <= Duration::from_millis(1_000 + 100));
    assert_eq!(first.sent_with_op(1).len(), 1);

    let resume = &second.sent_with_op(6)[0];
    assert_eq!(resume["d"]["token"], TEST_TOKEN);
    assert_eq!(resume["d"]["session_id"], "session-1");
    assert_eq!(resume["d"]["seq"], 7);
    assert_eq!(first.closed_with(), Some(4000));
    assert_eq!(session.client.state(), SessionState::Resuming);

    // The replaced connection's monitor is gone; nothing else reconnects
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.connector.connect_count(), 2);
    assert_eq!(second.sent_with_op(6).len(), 1);

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_zero_heartbeat_interval_ignored() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(0));
    server.send_json(&dispatch("TYPING_START", 1, serde_json::json!({})));
    assert!(eventually(|| session.client.sequence() == Some(1)).await);
    assert!(server.sent().is_empty());
    assert_eq!(session.client.state(), SessionState::AwaitingHello);

    // The session is still alive and takes a usable HELLO
    server.send_json(&hello(45_000));
    assert!(eventually(|| !server.sent_with_op(2).is_empty()).await);
    assert!(eventually(|| !server.sent_with_op(1).is_empty()).await);

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_repeated_hello_does_not_reidentify() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(45_000));
    assert!(eventually(|| !server.sent_with_op(2).is_empty()).await);
    server.send_json(&ready("session-1", 1));
    assert!(eventually(|| session.client.state() == SessionState::SteadyState).await);

    server.send_json(&hello(45_000));
    assert!(eventually(|| server.sent_with_op(1).len() >= 2).await);
    assert_eq!(server.sent_with_op(2).len(), 1);
    assert_eq!(session.client.state(), SessionState::SteadyState);

    session.client.shutdown();
    session.finish().await.unwrap();
}

// ============================================================================
// Reconnect Tests
// ============================================================================

#[tokio::test]
async fn test_reconnect_opcode_resumes() {
    let (session, servers) = TestSession::start(test_config(), 2);
    let (first, second) = (&servers[0], &servers[1]);

    first.send_json(&hello(45_000));
    first.send_json(&ready("session-1", 3));
    first.send_json(&reconnect());

    assert!(eventually(|| !second.sent_with_op(6).is_empty()).await);
    assert_eq!(second.sent_with_op(6)[0]["d"]["seq"], 3);
    assert_eq!(first.closed_with(), Some(4000));

    // HELLO on the resumed connection only restarts heartbeating
    second.send_json(&hello(45_000));
    second.send_json(&resumed(4));
    assert!(eventually(|| session.client.state() == SessionState::SteadyState).await);
    assert!(eventually(|| !second.sent_with_op(1).is_empty()).await);
    assert!(second.sent_with_op(2).is_empty());
    assert_eq!(session.client.sequence(), Some(4));

    session.client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_reconnect_without_session_identifies() {
    let (session, servers) = TestSession::start(test_config(), 2);
    let (first, second) = (&servers[0], &servers[1]);

    first.send_json(&hello(45_000));
    first.send_json(&reconnect());

    assert!(eventually(|| session.connector.connect_count() == 2).await);
    assert!(eventually(|| session.client.state() == SessionState::AwaitingHello).await);
    assert!(second.sent_with_op(6).is_empty());

    second.send_json(&hello(45_000));
    assert!(eventually(|| !second.sent_with_op(2).is_empty()).await);

    session.client.shutdown();
    session.finish().await.unwrap();
}

// ============================================================================
// Termination Tests
// ============================================================================

#[tokio::test]
async fn test_invalid_session_is_fatal() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];

    server.send_json(&hello(45_000));
    server.send_json(&ready("session-1", 1));
    server.send_json(&invalid_session());

    let client = session.client.clone();
    let result = session.finish().await;
    assert!(matches!(result, Err(GatewayError::InvalidSession)));
    assert!(client.session_id().is_none());
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_close_4014_requires_privileged_intents() {
    let (session, servers) = TestSession::start(test_config(), 1);
    servers[0].close(4014);

    let result = session.finish().await;
    assert!(matches!(result, Err(GatewayError::PrivilegedIntentsRequired)));
}

#[tokio::test]
async fn test_close_4000_is_a_disconnect() {
    let (session, servers) = TestSession::start(test_config(), 1);
    servers[0].send_json(&hello(45_000));
    servers[0].close(4000);

    let result = session.finish().await;
    assert!(matches!(result, Err(GatewayError::Disconnected { code: 4000 })));
}

#[tokio::test]
async fn test_clean_end_of_stream() {
    let (session, servers) = TestSession::start(test_config(), 1);
    servers[0].send_json(&hello(45_000));
    servers[0].hang_up();

    let client = session.client.clone();
    session.finish().await.unwrap();
    assert!(client.is_closed());
    assert_eq!(servers[0].closed_with(), Some(1000));
}

#[tokio::test]
async fn test_connect_failure_surfaces() {
    let (session, _servers) = TestSession::start(test_config(), 0);
    let result = session.finish().await;
    assert!(matches!(result, Err(GatewayError::Connect(_))));
}

// ============================================================================
// Cache Tests
// ============================================================================

#[tokio::test]
async fn test_guild_create_requests_members_and_chunks_dedupe() {
    let config = test_config().with_chunk_guilds_at_startup(true);
    let (session, servers) = TestSession::start(config, 1);
    let server = &servers[0];
    let client = session.client.clone();

    let guild_ready = client.wait_for("guild_create");
    server.send_json(&hello(45_000));
    server.send_json(&ready("session-1", 1));
    server.send_json(&guild_create("1", 2));
    tokio::time::timeout(Duration::from_secs(1), guild_ready).await.unwrap().unwrap();

    assert!(eventually(|| !server.sent_with_op(8).is_empty()).await);
    let request = &server.sent_with_op(8)[0];
    assert_eq!(request["d"]["guild_id"], "1");
    assert_eq!(request["d"]["limit"], 0);

    for seq in [3, 4] {
        let applied = client.wait_for("guild_members_chunk");
        server.send_json(&members_chunk("1", seq, &["500", "501", "502"]));
        tokio::time::timeout(Duration::from_secs(1), applied).await.unwrap().unwrap();
    }

    let guild = client.cache().guild(Snowflake::new(1)).unwrap();
    assert_eq!(guild.member_len(), 4);
    assert!(guild.me(Snowflake::new(42)).is_some());
    assert_eq!(guild.member(Snowflake::new(501)).unwrap().guild_id, Snowflake::new(1));
    assert_eq!(guild.text_channels().len(), 1);
    assert_eq!(
        guild.icon_url().as_deref(),
        Some("https://cdn.discordapp.com/icons/1/a1b2c3.png")
    );

    client.shutdown();
    session.finish().await.unwrap();
}

#[tokio::test]
async fn test_events_reach_subscribers_and_listeners() {
    let (session, servers) = TestSession::start(test_config(), 1);
    let server = &servers[0];
    let mut events = session.client.subscribe();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    session.client.on("MESSAGE_CREATE", move |data| {
        let tx = tx.clone();
        async move {
            tx.send(data)?;
            Ok::<(), anyhow::Error>(())
        }
    });

    server.send_json(&hello(45_000));
    server.send_json(&dispatch("MESSAGE_CREATE", 1, serde_json::json!({"content": "hi"})));

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.name, "MESSAGE_CREATE");
    assert_eq!(event.sequence, Some(1));

    let data = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(data["content"], "hi");

    session.client.shutdown();
    session.finish().await.unwrap();
}
