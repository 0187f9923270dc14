//! Notification hub and WebSocket fan-out for customer retention alerts.
//!
//! The hub owns the set of live subscribers; the WebSocket server is one transport that
//! registers sockets with it. Anything that holds the hub can broadcast.

pub mod connections;
pub mod provider;
pub mod types;
pub mod websocket_server;

pub use connections::{ChannelSubscriber, Frame, NotificationHub};
pub use provider::{ProviderConfig, WebSocketNotificationProvider};
pub use types::*;
pub use websocket_server::WebSocketServer;
