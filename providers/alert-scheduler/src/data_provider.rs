//! Read-only boundary to the customer/purchase store.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use retention_common::Customer;

/// Lookups the evaluator needs from the purchase store. Every call is read-only;
/// failures surface as [`crate::AlertSchedulerError::DataAccess`].
#[async_trait]
pub trait PurchaseDataProvider: Send + Sync {
    /// All customers with their expected weekdays and tracked items, in a stable order.
    async fn customers_with_schedule_and_items(&self) -> Result<Vec<Customer>>;

    /// Whether the customer bought anything during `date` as observed in `tz`.
    async fn has_purchase_on_date(&self, customer_id: &str, date: NaiveDate, tz: Tz)
        -> Result<bool>;

    async fn max_purchase_timestamp(&self, customer_id: &str) -> Result<Option<DateTime<Utc>>>;

    async fn max_purchase_timestamp_for_item(
        &self,
        customer_id: &str,
        item_id: &str,
    ) -> Result<Option<DateTime<Utc>>>;
}
