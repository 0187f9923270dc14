//! Error types for Alert Scheduler Provider

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertSchedulerError {
    #[error("Data access error: {0}")]
    DataAccess(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid reference timezone '{name}': {reason}")]
    InvalidTimezone { name: String, reason: String },

    #[error("Invalid daily trigger time '{0}', expected HH:MM")]
    InvalidDailyTime(String),

    #[error("Seed file error: {0}")]
    SeedFile(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AlertSchedulerError {
    /// Errors raised while reading customer/purchase data. These abort a single
    /// evaluation; the next tick tries again.
    pub fn is_data_access(&self) -> bool {
        matches!(self, AlertSchedulerError::DataAccess(_))
    }

    /// Errors that must stop the service at startup.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AlertSchedulerError::Configuration(_)
                | AlertSchedulerError::InvalidTimezone { .. }
                | AlertSchedulerError::InvalidDailyTime(_)
        )
    }
}
