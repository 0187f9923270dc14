use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REASON_SCHEDULED_DAY_MISSED: &str =
    "today is an expected purchase day and the customer has not purchased yet.";
pub const REASON_MISSING_RECURRING_ITEMS: &str = "customer stopped buying recurring items.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ScheduledDayMissed,
    Inactive,
    MissingRecurringItems,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ScheduledDayMissed => "scheduled_day_missed",
            AlertKind::Inactive => "inactive",
            AlertKind::MissingRecurringItems => "missing_recurring_items",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last purchase of a tracked item that went missing. `last_purchase` is absent when the
/// item was never bought.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingItemDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_purchase: Option<DateTime<Utc>>,
}

/// Derived alert pushed to subscribers. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub customer_id: String,
    pub customer_name: String,
    pub kind: AlertKind,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_item_details: Option<Vec<MissingItemDetail>>,
}

impl Alert {
    pub fn scheduled_day_missed(customer_id: &str, customer_name: &str) -> Self {
        Self::plain(
            customer_id,
            customer_name,
            AlertKind::ScheduledDayMissed,
            REASON_SCHEDULED_DAY_MISSED,
        )
    }

    pub fn inactive(customer_id: &str, customer_name: &str, inactivity_days: i64) -> Self {
        Self::plain(
            customer_id,
            customer_name,
            AlertKind::Inactive,
            &inactive_reason(inactivity_days),
        )
    }

    pub fn missing_recurring_items(
        customer_id: &str,
        customer_name: &str,
        details: Vec<MissingItemDetail>,
    ) -> Self {
        let names = details.iter().map(|d| d.name.clone()).collect();
        Self {
            customer_id: customer_id.to_string(),
            customer_name: customer_name.to_string(),
            kind: AlertKind::MissingRecurringItems,
            reason: REASON_MISSING_RECURRING_ITEMS.to_string(),
            missing_items: Some(names),
            missing_item_details: Some(details),
        }
    }

    fn plain(customer_id: &str, customer_name: &str, kind: AlertKind, reason: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            customer_name: customer_name.to_string(),
            kind,
            reason: reason.to_string(),
            missing_items: None,
            missing_item_details: None,
        }
    }
}

pub fn inactive_reason(inactivity_days: i64) -> String {
    format!(
        "customer has not purchased in over {} days.",
        inactivity_days
    )
}
