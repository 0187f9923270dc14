use crate::types::{BroadcastReport, DeliveryError, SubscriberInfo};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Serialized payload shared by every subscriber of one broadcast.
pub type Frame = Arc<str>;

/// Sending half of a live subscriber connection.
#[derive(Debug)]
pub struct ChannelSubscriber {
    id: String,
    connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Frame>,
}

impl ChannelSubscriber {
    pub fn new(id: impl Into<String>, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            id: id.into(),
            connected_at: Utc::now(),
            tx,
        }
    }

    /// Create a subscriber backed by a bounded channel, returning the receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(Uuid::new_v4().to_string(), tx), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hand `frame` to the connection without waiting. A full buffer counts as failure.
    pub fn try_deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(DeliveryError::Backpressure(self.id.clone()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(DeliveryError::Disconnected(self.id.clone()))
            }
        }
    }

    fn info(&self) -> SubscriberInfo {
        SubscriberInfo {
            id: self.id.clone(),
            connected_at: self.connected_at,
        }
    }
}

/// Registry of live subscribers and broadcast fan-out.
///
/// All access to the subscriber map goes through one `RwLock`. Broadcast delivers under
/// the read lock with non-blocking sends and removes failed subscribers under the write
/// lock once iteration is done.
pub struct NotificationHub {
    subscribers: Arc<RwLock<HashMap<String, ChannelSubscriber>>>,
    buffer_capacity: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl NotificationHub {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            buffer_capacity: buffer_capacity.max(1),
        }
    }

    /// Register a subscriber. Returns its id.
    pub async fn subscribe(&self, subscriber: ChannelSubscriber) -> String {
        let id = subscriber.id().to_string();
        let replaced = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id.clone(), subscriber)
        };

        if replaced.is_some() {
            warn!("Subscriber {} was registered twice, keeping the newest", id);
        }
        info!("Added subscriber: {}", id);
        id
    }

    /// Create a channel-backed subscriber, register it and return the receiving half.
    pub async fn connect(&self) -> (String, mpsc::Receiver<Frame>) {
        let (subscriber, rx) = ChannelSubscriber::channel(self.buffer_capacity);
        let id = self.subscribe(subscriber).await;
        (id, rx)
    }

    /// Remove a subscriber and close its channel. Unknown ids are ignored.
    pub async fn unsubscribe(&self, subscriber_id: &str) -> bool {
        let removed = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.remove(subscriber_id)
        };

        match removed {
            Some(_) => {
                info!("Removed subscriber: {}", subscriber_id);
                true
            }
            None => {
                debug!("Subscriber {} already gone", subscriber_id);
                false
            }
        }
    }

    /// Serialize `payload` once and deliver it to every live subscriber.
    ///
    /// Never fails: serialization and delivery problems are logged, and subscribers that
    /// could not take the frame are dropped.
    pub async fn broadcast<T>(&self, payload: &T) -> BroadcastReport
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(payload) {
            Ok(json) => self.broadcast_frame(Frame::from(json)).await,
            Err(e) => {
                error!("Failed to serialize broadcast payload: {}", e);
                BroadcastReport::default()
            }
        }
    }

    /// Deliver an already serialized frame to every live subscriber.
    pub async fn broadcast_frame(&self, frame: Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let failed: Vec<DeliveryError> = {
            let subscribers = self.subscribers.read().await;
            if subscribers.is_empty() {
                debug!("Broadcast skipped: no subscribers");
                return report;
            }

            subscribers
                .values()
                .filter_map(|subscriber| match subscriber.try_deliver(&frame) {
                    Ok(()) => {
                        report.delivered += 1;
                        None
                    }
                    Err(e) => Some(e),
                })
                .collect()
        };

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for failure in failed {
                warn!("Dropping subscriber after failed delivery: {}", failure);
                let id = match &failure {
                    DeliveryError::Backpressure(id) | DeliveryError::Disconnected(id) => id,
                };
                if subscribers.remove(id).is_some() {
                    report.removed += 1;
                }
            }
        }

        debug!(
            "Broadcast delivered to {} subscribers, removed {}",
            report.delivered, report.removed
        );
        report
    }

    pub async fn subscriber_count(&self) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.len()
    }

    pub async fn contains(&self, subscriber_id: &str) -> bool {
        let subscribers = self.subscribers.read().await;
        subscribers.contains_key(subscriber_id)
    }

    pub async fn subscribers(&self) -> Vec<SubscriberInfo> {
        let subscribers = self.subscribers.read().await;
        subscribers.values().map(ChannelSubscriber::info).collect()
    }
}
