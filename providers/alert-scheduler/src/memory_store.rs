use crate::data_provider::PurchaseDataProvider;
use crate::{AlertSchedulerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use retention_common::{local_day_bounds, Customer, Purchase};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Serialized form of the store, used for seed files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
}

/// Purchase data held in process memory. Customers keep insertion order so the evaluator
/// iterates them deterministically.
#[derive(Default)]
pub struct InMemoryPurchaseStore {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryPurchaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Load a store from a JSON seed file (`{"customers": [...], "purchases": [...]}`).
    pub async fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&raw)?;
        info!(
            "Loaded seed {}: {} customers, {} purchases",
            path.display(),
            snapshot.customers.len(),
            snapshot.purchases.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Insert or replace a customer, keeping its original position when replacing.
    pub async fn upsert_customer(&self, customer: Customer) {
        let mut state = self.state.write().await;
        match state.customers.iter_mut().find(|c| c.id == customer.id) {
            Some(existing) => *existing = customer,
            None => state.customers.push(customer),
        }
    }

    pub async fn record_purchase(&self, purchase: Purchase) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.customers.iter().any(|c| c.id == purchase.customer_id) {
            return Err(AlertSchedulerError::DataAccess(format!(
                "purchase {} references unknown customer {}",
                purchase.id, purchase.customer_id
            )));
        }
        debug!(
            "Recorded purchase {} for customer {}",
            purchase.id, purchase.customer_id
        );
        state.purchases.push(purchase);
        Ok(())
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl PurchaseDataProvider for InMemoryPurchaseStore {
    async fn customers_with_schedule_and_items(&self) -> Result<Vec<Customer>> {
        Ok(self.state.read().await.customers.clone())
    }

    async fn has_purchase_on_date(
        &self,
        customer_id: &str,
        date: NaiveDate,
        tz: Tz,
    ) -> Result<bool> {
        let (start, end) = local_day_bounds(date, &tz);
        let state = self.state.read().await;
        Ok(state.purchases.iter().any(|p| {
            p.customer_id == customer_id && p.purchased_at >= start && p.purchased_at < end
        }))
    }

    async fn max_purchase_timestamp(&self, customer_id: &str) -> Result<Option<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state
            .purchases
            .iter()
            .filter(|p| p.customer_id == customer_id)
            .map(|p| p.purchased_at)
            .max())
    }

    async fn max_purchase_timestamp_for_item(
        &self,
        customer_id: &str,
        item_id: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state
            .purchases
            .iter()
            .filter(|p| p.customer_id == customer_id && p.contains_item(item_id))
            .map(|p| p.purchased_at)
            .max())
    }
}
