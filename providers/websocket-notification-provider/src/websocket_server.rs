use crate::connections::NotificationHub;
use crate::provider::ProviderConfig;
use crate::types::{ClientMessage, ServerMessage};
use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// WebSocket server that registers every accepted socket with the notification hub
pub struct WebSocketServer {
    config: ProviderConfig,
    hub: Arc<NotificationHub>,
}

impl WebSocketServer {
    pub fn new(config: ProviderConfig, hub: Arc<NotificationHub>) -> Self {
        Self { config, hub }
    }

    /// Bind the configured listen address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.websocket_port)
            .parse()
            .context("Failed to parse WebSocket listen address")?;
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind WebSocket server on {}", addr))?;
        info!("WebSocket server listening on {}", addr);
        Ok(listener)
    }

    /// Bind and accept connections until `shutdown` flips
    pub async fn start(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections on an already bound listener until `shutdown` flips
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => self.handle_connection(stream, peer_addr),
                        Err(e) => {
                            error!("WebSocket accept error: {}", e);
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("WebSocket server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Upgrade a new TCP connection and hand it to its own task
    fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        let hub = self.hub.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!(
                        "Failed to accept WebSocket connection from {}: {}",
                        peer_addr, e
                    );
                    return;
                }
            };

            info!("New WebSocket connection from {}", peer_addr);

            if let Err(e) = handle_client(ws_stream, peer_addr, hub, config).await {
                error!("Error handling client connection {}: {}", peer_addr, e);
            }
        });
    }
}

/// Pump hub frames out to one client until either side goes away
async fn handle_client(
    ws_stream: WebSocketStream<TcpStream>,
    peer_addr: SocketAddr,
    hub: Arc<NotificationHub>,
    config: ProviderConfig,
) -> Result<()> {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (connection_id, mut frames) = hub.connect().await;
    info!(
        "Registered subscriber {} for {}",
        connection_id, peer_addr
    );

    let mut heartbeat_interval =
        interval(Duration::from_secs(config.heartbeat_interval_secs.max(1)));
    let mut last_seen = Instant::now();

    let result: Result<()> = loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        let reply =
                            reply_to_client(&text, &connection_id, &hub).await;
                        if let Err(e) = send_json(&mut ws_sender, &reply).await {
                            break Err(e);
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        last_seen = Instant::now();
                        if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                            break Err(e.into());
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_seen = Instant::now();
                        debug!("Received pong from connection {}", connection_id);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Connection {} closed by client", connection_id);
                        break Ok(());
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for connection {}: {}", connection_id, e);
                        break Err(e.into());
                    }
                    Some(Ok(_)) => {}
                }
            }

            frame = frames.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = ws_sender.send(Message::Text(frame.to_string())).await {
                            error!("Failed to send frame to connection {}: {}", connection_id, e);
                            break Err(e.into());
                        }
                    }
                    None => {
                        // Hub dropped this subscriber after a failed delivery.
                        info!("Connection {} dropped by hub", connection_id);
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break Ok(());
                    }
                }
            }

            _ = heartbeat_interval.tick() => {
                if last_seen.elapsed() > Duration::from_secs(config.connection_timeout_secs) {
                    warn!("Connection {} timed out (no pong received)", connection_id);
                    break Ok(());
                }

                if let Err(e) = ws_sender.send(Message::Ping(vec![])).await {
                    error!("Failed to send ping to connection {}: {}", connection_id, e);
                    break Err(e.into());
                }
            }
        }
    };

    hub.unsubscribe(&connection_id).await;
    info!("Cleaned up connection {}", connection_id);

    result
}

async fn reply_to_client(text: &str, connection_id: &str, hub: &NotificationHub) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => ServerMessage::Pong {
            timestamp: Utc::now(),
        },
        Ok(ClientMessage::GetStatus) => {
            let subscribers = hub.subscribers().await;
            match subscribers.iter().find(|s| s.id == connection_id) {
                Some(entry) => ServerMessage::Status {
                    connection_id: connection_id.to_string(),
                    connected_at: entry.connected_at,
                    subscribers: subscribers.len(),
                },
                None => ServerMessage::Error {
                    message: format!("Connection {} is no longer registered", connection_id),
                },
            }
        }
        Err(e) => ServerMessage::Error {
            message: format!("Unsupported message: {}", e),
        },
    }
}

async fn send_json(ws_sender: &mut WsSink, message: &ServerMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    ws_sender
        .send(Message::Text(json))
        .await
        .context("Failed to send control message")
}
