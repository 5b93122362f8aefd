//! WebSocket transport over tokio-tungstenite

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Connector, TransportMessage, TransportSink, TransportStream};
use crate::error::{GatewayError, GatewayResult};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects with `tokio_tungstenite::connect_async` (TLS via rustls)
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> GatewayResult<(Box<dyn TransportSink>, Box<dyn TransportStream>)> {
        let (socket, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        tracing::debug!(url = %url, status = %response.status(), "WebSocket connected");

        let (sink, stream) = socket.split();
        Ok((Box::new(WebSocketSink { sink }), Box::new(WebSocketSource { stream })))
    }
}

struct WebSocketSink {
    sink: SplitSink<Socket, Message>,
}

#[async_trait]
impl TransportSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> GatewayResult<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        let frame = CloseFrame {
            code: WsCloseCode::from(code),
            reason: "".into(),
        };
        let sent = self.sink.send(Message::Close(Some(frame))).await;
        let _ = self.sink.close().await;
        sent.map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

struct WebSocketSource {
    stream: SplitStream<Socket>,
}

#[async_trait]
impl TransportStream for WebSocketSource {
    async fn recv(&mut self) -> GatewayResult<Option<TransportMessage>> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Ok(None)
                }
                Some(Err(e)) => return Err(GatewayError::Transport(e.to_string())),
            };

            match message {
                Message::Text(text) => return Ok(Some(TransportMessage::Text(text))),
                Message::Binary(bytes) => return Ok(Some(TransportMessage::Binary(bytes))),
                Message::Close(Some(frame)) => {
                    return Ok(Some(TransportMessage::Close(u16::from(frame.code))))
                }
                Message::Close(None) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                    tracing::trace!("Control frame received");
                }
            }
        }
    }
}
