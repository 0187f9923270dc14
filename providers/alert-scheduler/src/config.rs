//! Configuration for Alert Scheduler Provider

use crate::evaluator::AlertThresholds;
use crate::{AlertSchedulerError, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use retention_common::DEFAULT_REFERENCE_TIMEZONE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for either alert threshold, in days.
pub const MAX_THRESHOLD_DAYS: i64 = 36_500;

/// Configuration for Alert Scheduler Provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertSchedulerConfig {
    /// IANA zone that defines "today" for scheduled-day checks and the daily trigger
    #[serde(default = "default_reference_timezone")]
    pub reference_timezone: String,

    /// Seconds between poll evaluations that broadcast to subscribers
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Local wall-clock time (HH:MM) of the daily report
    #[serde(default = "default_daily_trigger_time")]
    pub daily_trigger_time: String,

    /// Days without any purchase before a customer counts as inactive
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: i64,

    /// Days without buying a tracked item before it counts as missing
    #[serde(default = "default_missing_item_days")]
    pub missing_item_days: i64,

    /// Optional JSON seed for the in-memory purchase store
    #[serde(default)]
    pub seed_path: Option<String>,
}

/// Validated, typed view of [`AlertSchedulerConfig`].
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub timezone: Tz,
    pub poll_interval: Duration,
    pub daily_trigger_time: NaiveTime,
    pub thresholds: AlertThresholds,
}

impl AlertSchedulerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> std::result::Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.reference_timezone
            .parse::<Tz>()
            .map_err(|e| AlertSchedulerError::InvalidTimezone {
                name: self.reference_timezone.clone(),
                reason: e.to_string(),
            })
    }

    pub fn daily_time(&self) -> Result<NaiveTime> {
        let raw = self.daily_trigger_time.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| AlertSchedulerError::InvalidDailyTime(self.daily_trigger_time.clone()))
    }

    /// Validate everything the scheduler needs. Failures are fatal at startup.
    pub fn settings(&self) -> Result<ScheduleSettings> {
        if self.poll_interval_secs == 0 {
            return Err(AlertSchedulerError::Configuration(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        for (name, days) in [
            ("inactivity_days", self.inactivity_days),
            ("missing_item_days", self.missing_item_days),
        ] {
            if !(1..=MAX_THRESHOLD_DAYS).contains(&days) {
                return Err(AlertSchedulerError::Configuration(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_THRESHOLD_DAYS, days
                )));
            }
        }

        Ok(ScheduleSettings {
            timezone: self.timezone()?,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            daily_trigger_time: self.daily_time()?,
            thresholds: AlertThresholds {
                inactivity_days: self.inactivity_days,
                missing_item_days: self.missing_item_days,
            },
        })
    }
}

impl Default for AlertSchedulerConfig {
    fn default() -> Self {
        Self {
            reference_timezone: default_reference_timezone(),
            poll_interval_secs: default_poll_interval(),
            daily_trigger_time: default_daily_trigger_time(),
            inactivity_days: default_inactivity_days(),
            missing_item_days: default_missing_item_days(),
            seed_path: None,
        }
    }
}

fn default_reference_timezone() -> String {
    DEFAULT_REFERENCE_TIMEZONE.to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_daily_trigger_time() -> String {
    "08:00".to_string()
}

fn default_inactivity_days() -> i64 {
    7
}

fn default_missing_item_days() -> i64 {
    14
}
