//! Outlets for evaluated alerts: live subscribers and the daily log report.

use async_trait::async_trait;
use retention_common::Alert;
use tracing::{debug, info, warn};
use websocket_notification_provider::NotificationHub;

#[cfg(test)]
use mockall::automock;

/// Pushes an alert batch to live subscribers. Returns how many subscribers received it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertPublisher: Send + Sync {
    async fn publish_alerts(&self, alerts: &[Alert]) -> usize;
}

#[async_trait]
impl AlertPublisher for NotificationHub {
    async fn publish_alerts(&self, alerts: &[Alert]) -> usize {
        let report = self.broadcast(alerts).await;
        if report.removed > 0 {
            debug!(
                "Dropped {} unreachable subscribers during alert broadcast",
                report.removed
            );
        }
        report.delivered
    }
}

/// Receives the once-a-day alert report.
pub trait AlertReporter: Send + Sync {
    fn report(&self, alerts: &[Alert]);
}

/// Writes each daily alert as a structured warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertReporter;

impl AlertReporter for LogAlertReporter {
    fn report(&self, alerts: &[Alert]) {
        if alerts.is_empty() {
            info!("Daily alert report: no customers need attention");
            return;
        }

        info!("Daily alert report: {} alerts", alerts.len());
        for alert in alerts {
            warn!(
                customer_id = %alert.customer_id,
                customer_name = %alert.customer_name,
                kind = %alert.kind,
                missing_items = ?alert.missing_items,
                "{}",
                alert.reason
            );
        }
    }
}
