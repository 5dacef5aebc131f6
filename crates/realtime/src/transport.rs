//! WebSocket transport to the realtime endpoint.
//!
//! One outbound connection per transport. The receive task decodes inbound
//! frames and dispatches them to the event bus; writes are serialized
//! through a single sink lock so there is one outstanding write at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use vox_domain::config::RealtimeModel;
use vox_events::EventBus;

use crate::client_events::ClientEvent;
use crate::server_events::ServerEvent;

const REALTIME_BASE_URL: &str = "wss://api.openai.com/v1/realtime";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Errors that can occur on the realtime connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Send(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("OPENAI_API_KEY environment variable is not set")]
    MissingApiKey,
}

impl From<TransportError> for vox_domain::error::Error {
    fn from(error: TransportError) -> Self {
        vox_domain::error::Error::Transport(error.to_string())
    }
}

/// The seam the watchdogs talk through. Production uses
/// [`RealtimeTransport`]; tests substitute a recording fake.
#[async_trait]
pub trait RealtimeConnection: Send + Sync {
    /// Open the connection, replacing any prior one.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Serialize and send a single text frame.
    async fn send(&self, event: ClientEvent) -> Result<(), TransportError>;

    /// Tear the connection down. Idempotent.
    async fn close(&self);

    fn is_connected(&self) -> bool;
}

/// Production WebSocket transport (tokio-tungstenite).
pub struct RealtimeTransport {
    url: String,
    api_key: String,
    bus: Arc<EventBus>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    receive_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    connected: Arc<AtomicBool>,
}

impl RealtimeTransport {
    /// Build a transport for the given model. The bearer token comes from
    /// `api_key` or, when `None`, from `OPENAI_API_KEY`.
    pub fn new(
        model: RealtimeModel,
        bus: Arc<EventBus>,
        api_key: Option<String>,
    ) -> Result<Self, TransportError> {
        let url = format!("{REALTIME_BASE_URL}?model={model}");
        Self::with_url(url, bus, api_key)
    }

    /// Build a transport against an explicit URL (tests, proxies).
    pub fn with_url(
        url: String,
        bus: Arc<EventBus>,
        api_key: Option<String>,
    ) -> Result<Self, TransportError> {
        let api_key = match api_key {
            Some(key) => key,
            None => std::env::var("OPENAI_API_KEY").map_err(|_| TransportError::MissingApiKey)?,
        };
        Ok(Self {
            url,
            api_key,
            bus,
            sink: tokio::sync::Mutex::new(None),
            receive_task: parking_lot::Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn receive_loop(mut stream: WsStream, bus: Arc<EventBus>, connected: Arc<AtomicBool>) {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(event) = ServerEvent::decode(&text) {
                        event.dispatch(&bus).await;
                    }
                }
                Ok(Message::Close(close)) => {
                    tracing::info!(?close, "server closed connection");
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::info!(%error, "connection closed");
                    break;
                }
            }
        }
        connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RealtimeConnection for RealtimeTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        // A transport holds at most one connection.
        self.close().await;

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", self.api_key)
                .parse()
                .map_err(|e| TransportError::Connect(format!("invalid auth header: {e}")))?,
        );

        tracing::info!(url = %self.url, "connecting to realtime endpoint");
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, stream) = ws.split();

        *self.sink.lock().await = Some(sink);
        self.connected.store(true, Ordering::SeqCst);

        let task = tokio::spawn(Self::receive_loop(
            stream,
            self.bus.clone(),
            self.connected.clone(),
        ));
        *self.receive_task.lock() = Some(task);

        tracing::info!("connected");
        Ok(())
    }

    async fn send(&self, event: ClientEvent) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let json = serde_json::to_string(&event)?;
        tracing::debug!(frame = event.name(), "sending frame");

        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(Message::Text(json)).await.map_err(|e| {
            self.connected.store(false, Ordering::SeqCst);
            TransportError::Send(e.to_string())
        })
    }

    async fn close(&self) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);

        if let Some(task) = self.receive_task.lock().take() {
            task.abort();
        }

        let mut sink = self.sink.lock().await;
        if let Some(mut sink) = sink.take() {
            let _ = sink.close().await;
        }

        if was_connected {
            tracing::info!("connection closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
