//! Gateway session state machine
//!
//! `GatewaySession::run` owns the read loop of one logical session. It opens a
//! transport, answers HELLO with IDENTIFY (or RESUME after a reconnect), routes
//! every decoded frame by opcode and replaces the transport when the server
//! asks for it or the heartbeat stalls. The loop is the only place that opens
//! or closes transports.

mod context;
mod state;

pub(crate) use context::SessionContext;
pub use state::{SessionInfo, SessionState};

use std::sync::Arc;
use std::time::Duration;

use discode_common::GatewayConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::GatewayClient;
use crate::codec::FrameDecoder;
use crate::error::{GatewayError, GatewayResult};
use crate::events::GatewayEventType;
use crate::heartbeat::{HeartbeatMonitor, HeartbeatState};
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload, OpCode, ResumePayload};
use crate::resolver::{GatewayResolver, HttpGatewayResolver};
use crate::transport::{spawn_writer, Connector, TransportMessage, TransportStream, WebSocketConnector};

/// How long a closing writer may take to flush before it is detached
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Close code for a clean shutdown
const NORMAL_CLOSURE: u16 = 1000;

/// Requests from other tasks to the read loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Replace the transport of connection `generation`
    Reconnect { generation: u64 },
    Shutdown,
}

/// What the read loop does after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Reconnect,
}

/// Builder for a session and its client handle
pub struct Gateway {
    config: GatewayConfig,
    connector: Arc<dyn Connector>,
    resolver: Arc<dyn GatewayResolver>,
}

impl Gateway {
    /// Real WebSocket transport and REST URL lookup
    pub fn new(config: GatewayConfig) -> Self {
        let resolver = HttpGatewayResolver::new(&config);
        Self {
            config,
            connector: Arc::new(WebSocketConnector),
            resolver: Arc::new(resolver),
        }
    }

    #[must_use]
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: impl GatewayResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Create the session (to be run) and a handle onto it
    pub fn build(self) -> (GatewaySession, GatewayClient) {
        let (ctx, control_rx) = SessionContext::new(self.config);
        let client = GatewayClient::new(Arc::clone(&ctx));

        let session = GatewaySession {
            ctx,
            connector: self.connector,
            resolver: self.resolver,
            control_rx,
            decoder: FrameDecoder::new(),
            stream: None,
            writer: None,
            heartbeat: None,
        };
        (session, client)
    }
}

/// One gateway session; consumed by [`GatewaySession::run`]
pub struct GatewaySession {
    ctx: Arc<SessionContext>,
    connector: Arc<dyn Connector>,
    resolver: Arc<dyn GatewayResolver>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    decoder: FrameDecoder,
    stream: Option<Box<dyn TransportStream>>,
    writer: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl GatewaySession {
    /// Run the session until the transport closes cleanly, `shutdown()` is
    /// called or a fatal error occurs
    ///
    /// # Errors
    /// `InvalidSession`, `PrivilegedIntentsRequired`, `Disconnected` for any
    /// other close code, decode failures and transport failures.
    pub async fn run(mut self) -> GatewayResult<()> {
        let result = self.run_inner().await;

        match &result {
            Ok(()) => tracing::info!("Gateway session ended"),
            Err(e) => match e.close_code() {
                Some(code) => tracing::warn!(
                    error = %e,
                    close_code = %code,
                    resumable = code.is_resumable(),
                    "Gateway closed the connection"
                ),
                None => tracing::warn!(error = %e, "Gateway session failed"),
            },
        }

        self.teardown().await;
        result
    }

    async fn run_inner(&mut self) -> GatewayResult<()> {
        self.ctx.set_state(SessionState::Connecting);
        self.open_transport().await?;
        self.ctx.set_state(SessionState::AwaitingHello);

        loop {
            tokio::select! {
                biased;

                control = self.control_rx.recv() => match control {
                    Some(Control::Reconnect { generation }) => {
                        if generation == self.ctx.outbox.generation() {
                            self.reconnect().await?;
                        } else {
                            tracing::debug!(generation, "Ignoring reconnect for a replaced connection");
                        }
                    }
                    Some(Control::Shutdown) | None => return Ok(()),
                },

                message = next_message(&mut self.stream) => {
                    let Some(message) = message? else {
                        tracing::info!("Transport closed");
                        return Ok(());
                    };
                    let Some(frame) = self.decoder.decode(message)? else {
                        continue;
                    };
                    if self.handle_frame(&frame)? == Flow::Reconnect {
                        self.reconnect().await?;
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) -> GatewayResult<Flow> {
        let message = match GatewayMessage::from_json(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring undecodable frame");
                return Ok(Flow::Continue);
            }
        };

        tracing::trace!(op = %message.op, seq = ?message.s, "Frame received");

        match message.op {
            OpCode::Dispatch => self.handle_dispatch(message),
            OpCode::Hello => self.handle_hello(&message)?,
            OpCode::HeartbeatAck => self.ctx.record_ack(),
            OpCode::Heartbeat => {
                if let Err(e) = self.ctx.send_heartbeat() {
                    tracing::debug!(error = %e, "Requested heartbeat not sent");
                }
            }
            OpCode::Reconnect => {
                tracing::info!("Gateway requested reconnect");
                return Ok(Flow::Reconnect);
            }
            OpCode::InvalidSession => {
                tracing::warn!(session_id = ?self.ctx.session_id(), "Session invalidated");
                self.ctx.update_info(|info| info.invalidate());
                self.ctx.cache.clear();
                return Err(GatewayError::InvalidSession);
            }
            other => tracing::debug!(op = %other, "Ignoring opcode"),
        }

        Ok(Flow::Continue)
    }

    fn handle_dispatch(&self, message: GatewayMessage) {
        if let Some(seq) = message.s {
            self.ctx.observe_sequence(seq);
        }

        let Some(name) = message.t else {
            tracing::warn!(seq = ?message.s, "Dispatch without an event name");
            return;
        };

        if GatewayEventType::from_str(&name).is_some_and(GatewayEventType::completes_handshake) {
            self.ctx.set_state(SessionState::SteadyState);
        }

        self.ctx.dispatcher.dispatch(&self.ctx, &name, message.s, message.d);
    }

    fn handle_hello(&mut self, message: &GatewayMessage) -> GatewayResult<()> {
        let Some(hello) = message.as_hello().filter(|hello| hello.heartbeat_interval > 0) else {
            tracing::warn!("HELLO without a usable heartbeat interval, ignoring");
            return Ok(());
        };

        let interval = Duration::from_millis(hello.heartbeat_interval);
        self.ctx.update_info(|info| info.heartbeat_interval = Some(interval));
        self.start_heartbeat(interval);

        if self.ctx.state().identifies_on_hello() {
            self.identify()?;
            self.ctx.set_state(SessionState::Identifying);
        }
        Ok(())
    }

    fn identify(&self) -> GatewayResult<()> {
        let config = &self.ctx.config;
        let payload = IdentifyPayload::new(config.token.clone(), config.intents);
        self.ctx.send(&GatewayMessage::identify(&payload)?)?;

        tracing::info!(intents = config.intents.bits(), "IDENTIFY sent");
        Ok(())
    }

    fn start_heartbeat(&mut self, interval: Duration) {
        self.stop_heartbeat();
        *self.ctx.heartbeat.lock() = HeartbeatState::new();

        let generation = self.ctx.outbox.generation();
        self.heartbeat = Some(HeartbeatMonitor::spawn(Arc::clone(&self.ctx), interval, generation));
    }

    fn stop_heartbeat(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
    }

    /// Replace the transport and resume the session on the new one
    async fn reconnect(&mut self) -> GatewayResult<()> {
        self.ctx.set_state(SessionState::Reconnecting);
        self.stop_heartbeat();
        self.close_transport(CloseCode::UnknownError.as_u16()).await;
        self.decoder.reset();

        self.open_transport().await?;

        match self.ctx.info().resume_point() {
            Some((session_id, seq)) => {
                let payload = ResumePayload {
                    token: self.ctx.config.token.clone(),
                    session_id,
                    seq,
                };
                self.ctx.send(&GatewayMessage::resume(&payload)?)?;
                self.ctx.set_state(SessionState::Resuming);

                tracing::info!(session_id = %payload.session_id, seq, "RESUME sent");
            }
            None => {
                tracing::info!("No session to resume, identifying after HELLO");
                self.ctx.set_state(SessionState::AwaitingHello);
            }
        }
        Ok(())
    }

    async fn open_transport(&mut self) -> GatewayResult<()> {
        let url = self.resolver.resolve().await;
        tracing::info!(url = %url, "Connecting to gateway");

        let (sink, stream) = self.connector.connect(&url).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.ctx.outbox.install(tx);

        self.writer = Some(spawn_writer(sink, rx, generation));
        self.stream = Some(stream);

        tracing::debug!(generation, "Transport open");
        Ok(())
    }

    /// Close the current transport; failures are logged and ignored
    async fn close_transport(&mut self, code: u16) {
        self.ctx.outbox.close(code);
        self.stream = None;

        if let Some(writer) = self.writer.take() {
            if tokio::time::timeout(WRITER_GRACE, writer).await.is_err() {
                tracing::debug!(code, "Writer did not finish closing in time");
            }
        }
    }

    async fn teardown(&mut self) {
        self.stop_heartbeat();
        self.close_transport(NORMAL_CLOSURE).await;
        self.ctx.set_state(SessionState::Closed);
    }
}

/// Next message of the current transport; pends forever while there is none
async fn next_message(
    stream: &mut Option<Box<dyn TransportStream>>,
) -> GatewayResult<Option<TransportMessage>> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}
