//! Duplex connection to the streaming endpoint

use super::SessionEvent;
use crate::error::{Result, VibeflowError};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Outbound half of an open connection.
///
/// Inbound traffic is delivered as [`SessionEvent`]s on the channel
/// handed to [`Connector::connect`].
#[async_trait]
pub trait MatchTransport: Send {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<()>;

    async fn send_text(&mut self, text: String) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        events: UnboundedSender<SessionEvent>,
    ) -> Result<Box<dyn MatchTransport>>;
}

/// WebSocket connector with optional bearer authentication
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    token: Option<String>,
}

impl WsConnector {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

fn connection_error(err: impl std::fmt::Display) -> VibeflowError {
    VibeflowError::Connection(err.to_string())
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
        events: UnboundedSender<SessionEvent>,
    ) -> Result<Box<dyn MatchTransport>> {
        let mut request = url.into_client_request().map_err(connection_error)?;
        if let Some(token) = &self.token {
            let value =
                HeaderValue::from_str(&format!("Bearer {}", token)).map_err(connection_error)?;
            request.headers_mut().insert("Authorization", value);
        }

        let (ws, _response) = connect_async(request).await.map_err(connection_error)?;
        log::info!("Connected to {}", url);

        let (sink, mut stream) = ws.split();

        let reader = tokio::spawn(async move {
            let mut reason = None;
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if events.send(SessionEvent::Message(text)).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        break;
                    }
                    Ok(Message::Binary(data)) => {
                        log::debug!("Ignoring {} byte binary message", data.len());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        reason = Some(e.to_string());
                        break;
                    }
                }
            }
            let _ = events.send(SessionEvent::TransportClosed(reason));
        });

        Ok(Box::new(WsTransport {
            sink,
            reader,
            closed: false,
        }))
    }
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub struct WsTransport {
    sink: WsSink,
    reader: JoinHandle<()>,
    closed: bool,
}

#[async_trait]
impl MatchTransport for WsTransport {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Binary(data))
            .await
            .map_err(connection_error)
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(connection_error)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.sink.close().await.map_err(connection_error);
        self.reader.abort();
        log::debug!("Connection closed");
        result
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
