//! Shared fixtures for unit tests.

use crate::data_provider::PurchaseDataProvider;
use crate::{AlertSchedulerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use retention_common::{Customer, Purchase, PurchaseLineItem};

/// Monday 2026-03-02, 12:00 in Sao Paulo.
pub fn monday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
}

pub fn purchase(id: &str, customer_id: &str, at: DateTime<Utc>, items: &[&str]) -> Purchase {
    Purchase {
        id: id.to_string(),
        customer_id: customer_id.to_string(),
        purchased_at: at,
        items: items
            .iter()
            .map(|item_id| PurchaseLineItem {
                item_id: item_id.to_string(),
                price: 10.0,
            })
            .collect(),
    }
}

/// Provider that fails either on the customer listing or on per-item lookups.
pub struct FailingProvider {
    customers: Option<Vec<Customer>>,
}

impl FailingProvider {
    pub fn on_customers() -> Self {
        Self { customers: None }
    }

    pub fn on_item_lookup(customers: Vec<Customer>) -> Self {
        Self {
            customers: Some(customers),
        }
    }

    fn unavailable() -> AlertSchedulerError {
        AlertSchedulerError::DataAccess("purchase store unavailable".to_string())
    }
}

#[async_trait]
impl PurchaseDataProvider for FailingProvider {
    async fn customers_with_schedule_and_items(&self) -> Result<Vec<Customer>> {
        self.customers.clone().ok_or_else(Self::unavailable)
    }

    async fn has_purchase_on_date(
        &self,
        _customer_id: &str,
        _date: NaiveDate,
        _tz: Tz,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn max_purchase_timestamp(&self, _customer_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }

    async fn max_purchase_timestamp_for_item(
        &self,
        _customer_id: &str,
        _item_id: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        Err(Self::unavailable())
    }
}
