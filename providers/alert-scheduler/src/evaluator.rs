//! Alert rules over a customer/purchase snapshot.
//!
//! Evaluation only reads through [`PurchaseDataProvider`]; the same snapshot and the same
//! `now` always yield the same alerts. Results are ordered rule by rule (scheduled day,
//! inactivity, missing items), each rule following the provider's customer order.

use crate::data_provider::PurchaseDataProvider;
use crate::{AlertSchedulerError, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use retention_common::{local_date, local_weekday_index, Alert, Customer, MissingItemDetail};
use tracing::debug;

/// Age limits for the inactivity and missing-item rules. Both are strict: a purchase
/// exactly on the limit still counts as recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    pub inactivity_days: i64,
    pub missing_item_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            inactivity_days: 7,
            missing_item_days: 14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    timezone: Tz,
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(timezone: Tz, thresholds: AlertThresholds) -> Self {
        Self {
            timezone,
            thresholds,
        }
    }

    /// Run every rule against the provider's current data as of `now`.
    pub async fn evaluate(
        &self,
        provider: &dyn PurchaseDataProvider,
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let customers = provider.customers_with_schedule_and_items().await?;

        let mut alerts = self.scheduled_day_missed(provider, &customers, now).await?;
        alerts.extend(self.inactive(provider, &customers, now).await?);
        alerts.extend(self.missing_recurring_items(provider, &customers, now).await?);

        debug!(
            "Evaluated {} customers into {} alerts",
            customers.len(),
            alerts.len()
        );
        Ok(alerts)
    }

    async fn scheduled_day_missed(
        &self,
        provider: &dyn PurchaseDataProvider,
        customers: &[Customer],
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let today = local_date(now, &self.timezone);
        let weekday = local_weekday_index(now, &self.timezone);

        let mut alerts = Vec::new();
        for customer in customers {
            if !customer.expected_weekdays.contains(&weekday) {
                continue;
            }
            if !provider
                .has_purchase_on_date(&customer.id, today, self.timezone)
                .await?
            {
                alerts.push(Alert::scheduled_day_missed(&customer.id, &customer.name));
            }
        }
        Ok(alerts)
    }

    async fn inactive(
        &self,
        provider: &dyn PurchaseDataProvider,
        customers: &[Customer],
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let cutoff = threshold_cutoff(now, self.thresholds.inactivity_days)?;

        let mut alerts = Vec::new();
        for customer in customers {
            let last = provider.max_purchase_timestamp(&customer.id).await?;
            if is_stale(last, cutoff) {
                alerts.push(Alert::inactive(
                    &customer.id,
                    &customer.name,
                    self.thresholds.inactivity_days,
                ));
            }
        }
        Ok(alerts)
    }

    async fn missing_recurring_items(
        &self,
        provider: &dyn PurchaseDataProvider,
        customers: &[Customer],
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let cutoff = threshold_cutoff(now, self.thresholds.missing_item_days)?;

        let mut alerts = Vec::new();
        for customer in customers {
            let mut missing = Vec::new();
            for item in &customer.tracked_items {
                let last = provider
                    .max_purchase_timestamp_for_item(&customer.id, &item.id)
                    .await?;
                if is_stale(last, cutoff) {
                    missing.push(MissingItemDetail {
                        name: item.name.clone(),
                        last_purchase: last,
                    });
                }
            }

            if !missing.is_empty() {
                alerts.push(Alert::missing_recurring_items(
                    &customer.id,
                    &customer.name,
                    missing,
                ));
            }
        }
        Ok(alerts)
    }
}

fn threshold_cutoff(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| {
            AlertSchedulerError::Configuration(format!(
                "threshold of {} days is out of range",
                days
            ))
        })
}

/// Never purchased, or last purchased strictly before `cutoff`.
fn is_stale(last: Option<DateTime<Utc>>, cutoff: DateTime<Utc>) -> bool {
    match last {
        Some(at) => at < cutoff,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryPurchaseStore;
    use crate::test_support::{monday_noon, purchase, FailingProvider};
    use chrono_tz::America::Sao_Paulo;
    use retention_common::AlertKind;

    const MONDAY: u8 = 1;
    const WEDNESDAY: u8 = 3;

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::new(Sao_Paulo, AlertThresholds::default())
    }

    fn kinds(alerts: &[Alert]) -> Vec<(String, AlertKind)> {
        alerts
            .iter()
            .map(|a| (a.customer_id.clone(), a.kind))
            .collect()
    }

    #[tokio::test]
    async fn expected_day_without_purchase_fires_once() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(Customer::new("c1", "Padaria Sol").with_expected_weekdays([MONDAY]))
            .await;
        // Bought yesterday, so only the scheduled-day rule applies.
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(1), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::ScheduledDayMissed);
        assert_eq!(alerts[0].customer_name, "Padaria Sol");
        assert_eq!(alerts[0].missing_items, None);
    }

    #[tokio::test]
    async fn purchase_earlier_today_satisfies_expected_day() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(Customer::new("c1", "Padaria Sol").with_expected_weekdays([MONDAY]))
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::hours(2), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn today_is_judged_in_the_reference_timezone() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(Customer::new("c1", "Padaria Sol").with_expected_weekdays([MONDAY]))
            .await;
        // Monday 02:00 UTC is still Sunday 23:00 in Sao Paulo.
        let sunday_night_local = now - Duration::hours(13);
        store
            .record_purchase(purchase("p1", "c1", sunday_night_local, &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert_eq!(
            kinds(&alerts),
            vec![("c1".to_string(), AlertKind::ScheduledDayMissed)]
        );

        let utc_evaluator = AlertEvaluator::new(Tz::UTC, AlertThresholds::default());
        let alerts = utc_evaluator.evaluate(&store, now).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn customer_without_expected_days_never_misses_a_day() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store.upsert_customer(Customer::new("c1", "Padaria Sol")).await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(2), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn expected_day_on_other_weekday_does_not_fire() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(
                Customer::new("c1", "Padaria Sol").with_expected_weekdays([WEDNESDAY]),
            )
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(1), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn last_purchase_ten_days_ago_is_inactive() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(
                Customer::new("c1", "Padaria Sol").with_expected_weekdays([WEDNESDAY]),
            )
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(10), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Inactive);
        assert_eq!(
            alerts[0].reason,
            "customer has not purchased in over 7 days."
        );
    }

    #[tokio::test]
    async fn customer_who_never_purchased_is_inactive() {
        let store = InMemoryPurchaseStore::new();
        store.upsert_customer(Customer::new("c1", "Padaria Sol")).await;

        let alerts = evaluator().evaluate(&store, monday_noon()).await.unwrap();
        assert_eq!(kinds(&alerts), vec![("c1".to_string(), AlertKind::Inactive)]);
    }

    #[tokio::test]
    async fn inactivity_threshold_is_strict() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store.upsert_customer(Customer::new("edge", "On The Limit")).await;
        store.upsert_customer(Customer::new("past", "Just Past")).await;
        store
            .record_purchase(purchase("p1", "edge", now - Duration::days(7), &[]))
            .await
            .unwrap();
        store
            .record_purchase(purchase(
                "p2",
                "past",
                now - Duration::days(7) - Duration::seconds(1),
                &[],
            ))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert_eq!(kinds(&alerts), vec![("past".to_string(), AlertKind::Inactive)]);
    }

    #[tokio::test]
    async fn stale_tracked_item_fires_single_alert() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(
                Customer::new("c1", "Padaria Sol")
                    .with_tracked_item("a", "A")
                    .with_tracked_item("b", "B"),
            )
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(20), &["a"]))
            .await
            .unwrap();
        store
            .record_purchase(purchase("p2", "c1", now - Duration::days(3), &["b"]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::MissingRecurringItems);
        assert_eq!(alerts[0].missing_items, Some(vec!["A".to_string()]));
        assert_eq!(
            alerts[0].missing_item_details,
            Some(vec![MissingItemDetail {
                name: "A".to_string(),
                last_purchase: Some(now - Duration::days(20)),
            }])
        );
    }

    #[tokio::test]
    async fn every_missing_item_lands_in_one_alert() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(
                Customer::new("c1", "Padaria Sol")
                    .with_tracked_item("flour", "Flour")
                    .with_tracked_item("yeast", "Yeast")
                    .with_tracked_item("salt", "Salt"),
            )
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(15), &["flour"]))
            .await
            .unwrap();
        store
            .record_purchase(purchase("p2", "c1", now - Duration::days(1), &["salt"]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();

        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0].missing_items,
            Some(vec!["Flour".to_string(), "Yeast".to_string()])
        );
        let details = alerts[0].missing_item_details.as_ref().unwrap();
        assert_eq!(details[1].name, "Yeast");
        assert_eq!(details[1].last_purchase, None);
    }

    #[tokio::test]
    async fn missing_item_threshold_is_strict() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(Customer::new("c1", "Padaria Sol").with_tracked_item("a", "A"))
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(14), &["a"]))
            .await
            .unwrap();
        store
            .record_purchase(purchase("p2", "c1", now - Duration::days(1), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn customer_without_tracked_items_never_misses_items() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store.upsert_customer(Customer::new("c1", "Padaria Sol")).await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(30), &[]))
            .await
            .unwrap();

        let alerts = evaluator().evaluate(&store, now).await.unwrap();
        assert_eq!(kinds(&alerts), vec![("c1".to_string(), AlertKind::Inactive)]);
    }

    #[tokio::test]
    async fn alerts_are_grouped_by_rule() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(
                Customer::new("c1", "Padaria Sol")
                    .with_expected_weekdays([MONDAY])
                    .with_tracked_item("a", "A"),
            )
            .await;
        store
            .upsert_customer(
                Customer::new("c2", "Mercado Lua")
                    .with_expected_weekdays([MONDAY])
                    .with_tracked_item("b", "B"),
            )
            .await;

        let alerts = evaluator().evaluate(&store, now).await.unwrap();

        assert_eq!(
            kinds(&alerts),
            vec![
                ("c1".to_string(), AlertKind::ScheduledDayMissed),
                ("c2".to_string(), AlertKind::ScheduledDayMissed),
                ("c1".to_string(), AlertKind::Inactive),
                ("c2".to_string(), AlertKind::Inactive),
                ("c1".to_string(), AlertKind::MissingRecurringItems),
                ("c2".to_string(), AlertKind::MissingRecurringItems),
            ]
        );
    }

    #[tokio::test]
    async fn evaluation_is_repeatable() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(
                Customer::new("c1", "Padaria Sol")
                    .with_expected_weekdays([MONDAY, WEDNESDAY])
                    .with_tracked_item("a", "A"),
            )
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(9), &["a"]))
            .await
            .unwrap();

        let first = evaluator().evaluate(&store, now).await.unwrap();
        let second = evaluator().evaluate(&store, now).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn custom_thresholds_change_cutoffs_and_reason() {
        let now = monday_noon();
        let store = InMemoryPurchaseStore::new();
        store
            .upsert_customer(Customer::new("c1", "Padaria Sol").with_tracked_item("a", "A"))
            .await;
        store
            .record_purchase(purchase("p1", "c1", now - Duration::days(4), &["a"]))
            .await
            .unwrap();

        let strict = AlertEvaluator::new(
            Sao_Paulo,
            AlertThresholds {
                inactivity_days: 3,
                missing_item_days: 3,
            },
        );
        let alerts = strict.evaluate(&store, now).await.unwrap();

        assert_eq!(
            kinds(&alerts),
            vec![
                ("c1".to_string(), AlertKind::Inactive),
                ("c1".to_string(), AlertKind::MissingRecurringItems),
            ]
        );
        assert_eq!(alerts[0].reason, "customer has not purchased in over 3 days.");
    }

    #[tokio::test]
    async fn unrepresentable_threshold_is_an_error() {
        let store = InMemoryPurchaseStore::new();
        store.upsert_customer(Customer::new("c1", "Padaria Sol")).await;

        let huge = AlertEvaluator::new(
            Sao_Paulo,
            AlertThresholds {
                inactivity_days: i64::MAX / 2,
                missing_item_days: 14,
            },
        );
        let err = huge.evaluate(&store, monday_noon()).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn data_access_failure_propagates() {
        let provider = FailingProvider::on_customers();
        let err = evaluator()
            .evaluate(&provider, monday_noon())
            .await
            .unwrap_err();
        assert!(err.is_data_access());
    }

    #[tokio::test]
    async fn failure_in_a_later_rule_discards_partial_results() {
        let provider = FailingProvider::on_item_lookup(vec![Customer::new("c1", "Padaria Sol")
            .with_expected_weekdays([MONDAY])
            .with_tracked_item("a", "A")]);

        let result = evaluator().evaluate(&provider, monday_noon()).await;
        assert!(matches!(result, Err(AlertSchedulerError::DataAccess(_))));
    }
}
