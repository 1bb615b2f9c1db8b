//! Everything that talks to the trading backend: the Socket.IO connection,
//! the host process commands and the monitoring stats file.

pub mod host;
pub mod protocol;
pub mod socket;
pub mod stats;

use async_trait::async_trait;
use thiserror::Error;

pub use host::{Host, HostError, LocalHost};
pub use protocol::{ClientEvent, ServerEvent, SettingsUpdated, TradeExecuted};
pub use socket::BackendSocket;
pub use stats::{MonitoringStats, StatsLocator};

/// Errors from the socket connection.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),

    #[error("not connected to backend")]
    NotConnected,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

/// Outbound half of the backend connection.
#[async_trait]
pub trait EventSink: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn emit(&self, event: &ClientEvent) -> Result<(), BackendError>;
}
