use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// WebSocket message types from client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
    GetStatus,
}

/// Control replies sent to a single client. Alert broadcasts are sent as the raw JSON
/// payload handed to the hub, not wrapped in this enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong {
        timestamp: DateTime<Utc>,
    },
    Status {
        connection_id: String,
        connected_at: DateTime<Utc>,
        subscribers: usize,
    },
    Error {
        message: String,
    },
}

/// Why a single delivery attempt failed. Either way the subscriber is dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber {0} is not keeping up (buffer full)")]
    Backpressure(String),

    #[error("subscriber {0} is disconnected")]
    Disconnected(String),
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: usize,
}

/// Point-in-time view of a registered subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberInfo {
    pub id: String,
    pub connected_at: DateTime<Utc>,
}
