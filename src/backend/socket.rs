//! Socket.IO client for the backend: connect, keep alive, reconnect, emit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

use super::{BackendError, EventSink};
use super::protocol::{ClientEvent, EnginePacket, ServerEvent, SocketPacket};
use crate::config::BackendConfig;

/// Socket.IO endpoint path with the Engine.IO v4 websocket transport.
const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Connection settings for the backend socket.
struct SocketConfig {
    /// WebSocket URL of the Socket.IO endpoint.
    url: String,
    /// Delay before attempting reconnection.
    reconnect_delay: Duration,
}

impl SocketConfig {
    fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            url: socket_url(&config.url)?,
            reconnect_delay: config.reconnect_delay,
        })
    }
}

/// Converts the backend base URL to its Socket.IO websocket URL.
/// A URL that already points at `/socket.io` is only rescheme'd.
pub fn socket_url(base: &str) -> Result<String, BackendError> {
    let base = base.trim();
    let (scheme, rest) = base
        .split_once("://")
        .ok_or_else(|| BackendError::InvalidUrl(base.to_string()))?;

    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(BackendError::InvalidUrl(base.to_string())),
    };

    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(BackendError::InvalidUrl(base.to_string()));
    }

    if rest.contains("/socket.io") {
        Ok(format!("{}://{}", ws_scheme, rest))
    } else {
        Ok(format!("{}://{}{}", ws_scheme, rest, SOCKET_PATH))
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

type WsError = tokio_tungstenite::tungstenite::Error;

/// How a read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    /// Transport lost; try again after the reconnect delay.
    Reconnect,
    /// Closed locally or nobody listens for events any more.
    Stop,
}

/// Socket.IO client for the trading backend.
///
/// Server events are delivered on the channel returned by [`BackendSocket::new`].
/// `Connected` and `Disconnected` are published on every state change.
pub struct BackendSocket {
    config: SocketConfig,
    sink: Arc<Mutex<Option<WsSink>>>,
    events_tx: mpsc::UnboundedSender<ServerEvent>,
    connected: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl BackendSocket {
    pub fn new(
        backend: &BackendConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), BackendError> {
        let config = SocketConfig::from_config(backend)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let socket = Self {
            config,
            sink: Arc::new(Mutex::new(None)),
            events_tx,
            connected: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        };

        Ok((socket, events_rx))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// True once the server acknowledged the namespace connect.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Records a connection state change and publishes it.
    /// Returns false when the event receiver is gone.
    fn set_connected(&self, connected: bool) -> bool {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        if was == connected {
            return true;
        }
        let event = if connected {
            ServerEvent::Connected
        } else {
            ServerEvent::Disconnected
        };
        self.events_tx.send(event).is_ok()
    }

    async fn connect(&self) -> Result<WsSource, WsError> {
        debug!(url = %self.config.url, "connecting to backend");

        let (ws_stream, _response) = connect_async(&self.config.url).await?;

        let (sink, stream) = ws_stream.split();
        *self.sink.lock().await = Some(sink);

        info!(url = %self.config.url, "backend websocket open");

        Ok(stream)
    }

    async fn send_frame(&self, frame: String) -> Result<(), BackendError> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(BackendError::NotConnected)?;
        sink.send(WsMessage::Text(frame.into())).await?;
        Ok(())
    }

    /// Sends an event to the backend. Fails fast while disconnected.
    pub async fn emit(&self, event: &ClientEvent) -> Result<(), BackendError> {
        if !self.is_connected() {
            return Err(BackendError::NotConnected);
        }
        self.send_frame(event.to_frame()).await?;
        debug!(event = event.name(), "emitted");
        Ok(())
    }

    /// Keeps a connection open until [`BackendSocket::close`] is called,
    /// reconnecting after the configured delay whenever it drops.
    pub async fn run(&self) {
        loop {
            if self.is_closed() {
                break;
            }

            match self.connect().await {
                Ok(stream) => {
                    let exit = self.read_loop(stream).await;
                    self.drop_connection().await;
                    if exit == LoopExit::Stop {
                        break;
                    }
                }
                Err(e) if should_reconnect(&e) => {
                    debug!(error = %e, "backend not reachable");
                }
                Err(e) => {
                    error!(error = %e, url = %self.config.url, "backend connection failed (non-recoverable)");
                    break;
                }
            }

            if self.is_closed() {
                break;
            }
            debug!(delay = ?self.config.reconnect_delay, "reconnecting");
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    async fn read_loop(&self, mut stream: WsSource) -> LoopExit {
        loop {
            if self.is_closed() {
                return LoopExit::Stop;
            }

            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(exit) = self.handle_frame(text.as_str()).await {
                        return exit;
                    }
                }
                Some(Ok(WsMessage::Close(_))) => {
                    info!("backend closed the connection");
                    return LoopExit::Reconnect;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    if should_reconnect(&e) {
                        warn!(error = %e, "backend websocket error, reconnecting");
                        return LoopExit::Reconnect;
                    }
                    error!(error = %e, "backend websocket error (non-recoverable)");
                    return LoopExit::Stop;
                }
                None => {
                    info!("backend stream ended");
                    return LoopExit::Reconnect;
                }
            }
        }
    }

    /// Handles one Engine.IO frame; `Some` ends the read loop.
    async fn handle_frame(&self, text: &str) -> Option<LoopExit> {
        let packet = match EnginePacket::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, frame = %text, "ignoring undecodable frame");
                return None;
            }
        };

        match packet {
            EnginePacket::Open(handshake) => {
                debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "engine open");
                if let Err(e) = self.send_frame(SocketPacket::Connect(None).to_frame()).await {
                    warn!(error = %e, "namespace connect failed");
                    return Some(LoopExit::Reconnect);
                }
                None
            }
            EnginePacket::Ping(data) => {
                if let Err(e) = self.send_frame(EnginePacket::Pong(data).encode()).await {
                    warn!(error = %e, "pong failed");
                    return Some(LoopExit::Reconnect);
                }
                None
            }
            EnginePacket::Close => Some(LoopExit::Reconnect),
            EnginePacket::Message(payload) => self.handle_message(&payload),
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => None,
        }
    }

    fn handle_message(&self, payload: &str) -> Option<LoopExit> {
        let packet = match SocketPacket::decode(payload) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, "ignoring undecodable packet");
                return None;
            }
        };

        match packet {
            SocketPacket::Connect(_) => {
                info!("connected to backend");
                if !self.set_connected(true) {
                    return Some(LoopExit::Stop);
                }
                None
            }
            SocketPacket::Disconnect => {
                info!("backend disconnected the namespace");
                Some(LoopExit::Reconnect)
            }
            SocketPacket::ConnectError(reason) => {
                warn!(reason = %reason, "backend refused namespace connect");
                Some(LoopExit::Reconnect)
            }
            SocketPacket::Event { name, args } => match ServerEvent::from_event(&name, args) {
                Ok(Some(event)) => {
                    if self.events_tx.send(event).is_err() {
                        warn!("server event channel closed");
                        return Some(LoopExit::Stop);
                    }
                    None
                }
                Ok(None) => {
                    debug!(event = %name, "unhandled server event");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "malformed server event");
                    None
                }
            },
            SocketPacket::Ack => None,
        }
    }

    async fn drop_connection(&self) {
        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let _ = sink.close().await;
        }
        drop(guard);
        self.set_connected(false);
    }

    /// Closes the connection and stops reconnecting.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            let _ = sink
                .send(WsMessage::Text(EnginePacket::Close.encode().into()))
                .await;
            if let Err(e) = sink.close().await {
                error!(error = %e, "failed to close backend websocket");
            }
        }
        drop(guard);
        self.set_connected(false);

        info!("backend socket closed");
    }
}

/// Returns true if the error warrants a reconnection attempt.
fn should_reconnect(error: &WsError) -> bool {
    use tokio_tungstenite::tungstenite::Error;
    matches!(
        error,
        Error::ConnectionClosed
            | Error::AlreadyClosed
            | Error::Io(_)
            | Error::Tls(_)
            | Error::Http(_)
            | Error::Protocol(_)
    )
}

#[async_trait]
impl EventSink for BackendSocket {
    fn is_connected(&self) -> bool {
        BackendSocket::is_connected(self)
    }

    async fn emit(&self, event: &ClientEvent) -> Result<(), BackendError> {
        BackendSocket::emit(self, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url_from_http_base() {
        assert_eq!(
            socket_url("http://127.0.0.1:8000").unwrap(),
            "ws://127.0.0.1:8000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("https://bot.example.com/").unwrap(),
            "wss://bot.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_keeps_explicit_path() {
        assert_eq!(
            socket_url("ws://localhost:8000/socket.io/?EIO=4&transport=websocket").unwrap(),
            "ws://localhost:8000/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_socket_url_rejects_garbage() {
        assert!(matches!(
            socket_url("localhost:8000"),
            Err(BackendError::InvalidUrl(_))
        ));
        assert!(socket_url("ftp://host").is_err());
        assert!(socket_url("http://").is_err());
    }

    #[tokio::test]
    async fn test_emit_while_disconnected_fails_fast() {
        let (socket, _rx) = BackendSocket::new(&BackendConfig::default()).unwrap();

        let err = socket.emit(&ClientEvent::StartBot).await.unwrap_err();

        assert!(matches!(err, BackendError::NotConnected));
        assert!(!socket.is_connected());
    }

    #[tokio::test]
    async fn test_message_handling_publishes_events() {
        let (socket, mut rx) = BackendSocket::new(&BackendConfig::default()).unwrap();

        assert_eq!(socket.handle_message(r#"0{"sid":"abc"}"#), None);
        assert!(socket.is_connected());
        assert_eq!(rx.recv().await, Some(ServerEvent::Connected));

        assert_eq!(
            socket.handle_message(r#"2["trade_executed",{"profit":2.0}]"#),
            None
        );
        assert!(matches!(
            rx.recv().await,
            Some(ServerEvent::TradeExecuted(_))
        ));

        assert_eq!(socket.handle_message("1"), Some(LoopExit::Reconnect));
    }

    #[tokio::test]
    async fn test_drop_connection_publishes_disconnect_once() {
        let (socket, mut rx) = BackendSocket::new(&BackendConfig::default()).unwrap();
        socket.handle_message("0");
        assert_eq!(rx.recv().await, Some(ServerEvent::Connected));

        socket.drop_connection().await;
        socket.drop_connection().await;

        assert_eq!(rx.recv().await, Some(ServerEvent::Disconnected));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_stops_run() {
        let mut config = BackendConfig::default();
        config.url = "http://127.0.0.1:9".to_string();
        let (socket, _rx) = BackendSocket::new(&config).unwrap();

        socket.close().await;
        socket.run().await;

        assert!(!socket.is_connected());
    }
}
