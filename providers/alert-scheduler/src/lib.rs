//! Alert Scheduler Provider
//!
//! Evaluates customer retention rules over purchase data and drives two timers:
//! a short poll that broadcasts alerts to live subscribers, and a daily report
//! written to the log at a fixed local time.

pub mod config;
pub mod data_provider;
pub mod error;
pub mod evaluator;
pub mod memory_store;
pub mod publisher;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AlertSchedulerConfig, ScheduleSettings};
pub use data_provider::PurchaseDataProvider;
pub use error::AlertSchedulerError;
pub use evaluator::{AlertEvaluator, AlertThresholds};
pub use memory_store::{InMemoryPurchaseStore, StoreSnapshot};
pub use publisher::{AlertPublisher, AlertReporter, LogAlertReporter};
pub use scheduler::{AlertScheduler, Clock, SchedulerHandle, SystemClock};

// Re-export Result type for convenience
pub type Result<T> = std::result::Result<T, AlertSchedulerError>;
