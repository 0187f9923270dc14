use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A recurring product a customer can be expected to keep buying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub name: String,
}

/// Customer as seen by the alert engine: identity, expected purchase days and the
/// items tracked for repurchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Days of week numbered from Sunday (0) to Saturday (6).
    #[serde(default)]
    pub expected_weekdays: BTreeSet<u8>,
    #[serde(default)]
    pub tracked_items: Vec<Item>,
}

impl Customer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            expected_weekdays: BTreeSet::new(),
            tracked_items: Vec::new(),
        }
    }

    pub fn with_expected_weekdays(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.expected_weekdays.extend(days);
        self
    }

    pub fn with_tracked_item(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.tracked_items.push(Item {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Whether `weekday` is one of the customer's expected purchase days.
    pub fn expects_purchase_on(&self, weekday: Weekday) -> bool {
        self.expected_weekdays.contains(&weekday_index(weekday))
    }
}

/// Sunday-based index (0..=6) used for expected weekdays.
pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseLineItem {
    pub item_id: String,
    pub price: f64,
}

/// A historical purchase. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: String,
    pub customer_id: String,
    pub purchased_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<PurchaseLineItem>,
}

impl Purchase {
    pub fn contains_item(&self, item_id: &str) -> bool {
        self.items.iter().any(|line| line.item_id == item_id)
    }
}
