//! Test helpers for integration tests
//!
//! `MockConnector` hands out pre-scripted connections in order. The matching
//! `MockServer` handles play the server side: push frames to the client and
//! inspect what it sent back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use discode_common::GatewayConfig;
use discode_gateway::{
    Connector, Gateway, GatewayClient, GatewayError, GatewayResult, StaticResolver,
    TransportMessage, TransportSink, TransportStream,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// URL every test session resolves to
pub const TEST_GATEWAY_URL: &str = "wss://gateway.test/?v=9&encoding=json&compress=zlib-stream";

/// Server side of one scripted connection
#[derive(Clone)]
pub struct MockServer {
    incoming: Arc<Mutex<Option<mpsc::UnboundedSender<TransportMessage>>>>,
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<u16>>>,
}

impl MockServer {
    /// Push a JSON frame as an uncompressed text message
    pub fn send_json(&self, frame: &Value) {
        self.push(TransportMessage::Text(frame.to_string()));
    }

    pub fn send_raw(&self, text: &str) {
        self.push(TransportMessage::Text(text.to_string()));
    }

    pub fn send_binary(&self, bytes: Vec<u8>) {
        self.push(TransportMessage::Binary(bytes));
    }

    /// Send a close frame with `code`
    pub fn close(&self, code: u16) {
        self.push(TransportMessage::Close(code));
    }

    /// End the stream without a close code
    pub fn hang_up(&self) {
        self.incoming.lock().take();
    }

    /// Every frame the client sent on this connection, parsed
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    /// Frames the client sent with opcode `op`
    pub fn sent_with_op(&self, op: u64) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|frame| frame["op"].as_u64() == Some(op))
            .collect()
    }

    /// Close code the client used on this connection, if it closed it
    pub fn closed_with(&self) -> Option<u16> {
        *self.closed_with.lock()
    }

    fn push(&self, message: TransportMessage) {
        if let Some(tx) = self.incoming.lock().as_ref() {
            let _ = tx.send(message);
        }
    }
}

struct MockConnection {
    sink: MockSink,
    stream: MockStream,
}

struct MockSink {
    sent: Arc<Mutex<Vec<String>>>,
    closed_with: Arc<Mutex<Option<u16>>>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send_text(&mut self, text: String) -> GatewayResult<()> {
        if self.closed_with.lock().is_some() {
            return Err(GatewayError::Transport("sink closed".to_string()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        self.closed_with.lock().get_or_insert(code);
        Ok(())
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<TransportMessage>,
}

#[async_trait]
impl TransportStream for MockStream {
    async fn recv(&mut self) -> GatewayResult<Option<TransportMessage>> {
        Ok(self.rx.recv().await)
    }
}

/// Connector handing out scripted connections in order
#[derive(Clone, Default)]
pub struct MockConnector {
    pending: Arc<Mutex<VecDeque<MockConnection>>>,
    urls: Arc<Mutex<Vec<String>>>,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Script `count` connections; returns their server handles in connect order
    pub fn with_connections(count: usize) -> (Self, Vec<MockServer>) {
        let connector = Self::default();
        let servers = (0..count).map(|_| connector.prepare()).collect();
        (connector, servers)
    }

    /// Script one more connection
    pub fn prepare(&self) -> MockServer {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = MockServer {
            incoming: Arc::new(Mutex::new(Some(tx))),
            sent: Arc::default(),
            closed_with: Arc::default(),
        };

        self.pending.lock().push_back(MockConnection {
            sink: MockSink {
                sent: Arc::clone(&server.sent),
                closed_with: Arc::clone(&server.closed_with),
            },
            stream: MockStream { rx },
        });
        server
    }

    /// How many connections the session opened
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> GatewayResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());

        let connection = self
            .pending
            .lock()
            .pop_front()
            .ok_or_else(|| GatewayError::Connect("no scripted connection left".to_string()))?;
        Ok((Box::new(connection.sink), Box::new(connection.stream)))
    }
}

/// A session running on a background task
pub struct TestSession {
    pub client: GatewayClient,
    pub connector: MockConnector,
    pub handle: JoinHandle<GatewayResult<()>>,
}

impl TestSession {
    /// Start a session over `connections` scripted connections
    pub fn start(config: GatewayConfig, connections: usize) -> (Self, Vec<MockServer>) {
        let (connector, servers) = MockConnector::with_connections(connections);
        let (session, client) = Gateway::new(config)
            .with_connector(connector.clone())
            .with_resolver(StaticResolver(TEST_GATEWAY_URL.to_string()))
            .build();

        let handle = tokio::spawn(session.run());
        (
            Self {
                client,
                connector,
                handle,
            },
            servers,
        )
    }

    /// Wait for the session loop to return
    pub async fn finish(self) -> GatewayResult<()> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("session did not finish in time")
            .expect("session task panicked")
    }
}

/// Poll `condition` until it holds or five seconds pass
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

/// Configuration used by the tests: no startup chunking, tight heartbeat tolerance
pub fn test_config() -> GatewayConfig {
    GatewayConfig::new(crate::fixtures::TEST_TOKEN)
        .with_chunk_guilds_at_startup(false)
        .with_heartbeat_tolerance(Duration::from_millis(100))
}
