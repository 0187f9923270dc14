use crate::connections::{NotificationHub, DEFAULT_SUBSCRIBER_BUFFER};
use crate::websocket_server::WebSocketServer;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// WebSocket notification provider: the hub plus the transport feeding it
pub struct WebSocketNotificationProvider {
    hub: Arc<NotificationHub>,
    config: ProviderConfig,
}

/// Provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_websocket_port")]
    pub websocket_port: u16,

    /// Frames buffered per subscriber before it counts as stalled
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

impl ProviderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            websocket_port: default_websocket_port(),
            subscriber_buffer: default_subscriber_buffer(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            connection_timeout_secs: default_connection_timeout(),
        }
    }
}

fn default_websocket_port() -> u16 {
    8080
}

fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_connection_timeout() -> u64 {
    300
}

impl WebSocketNotificationProvider {
    pub fn new(config: ProviderConfig) -> Self {
        info!("Initializing WebSocket Notification Provider");
        info!(
            "Config: websocket_port={}, subscriber_buffer={}, heartbeat_interval_secs={}, connection_timeout_secs={}",
            config.websocket_port,
            config.subscriber_buffer,
            config.heartbeat_interval_secs,
            config.connection_timeout_secs
        );

        Self {
            hub: Arc::new(NotificationHub::new(config.subscriber_buffer)),
            config,
        }
    }

    /// Shared hub that schedulers and request handlers broadcast through
    pub fn hub(&self) -> Arc<NotificationHub> {
        self.hub.clone()
    }

    /// Run the WebSocket server until `shutdown` flips
    pub async fn start(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let server = WebSocketServer::new(self.config.clone(), self.hub.clone());
        server.start(shutdown).await
    }
}
