//! Shared smart-retention contracts.
//!
//! This crate is the Rust source of truth for the customer/purchase snapshot the alert
//! engine reads and the alert payload it pushes to subscribers.

pub mod alert;
pub mod calendar;
pub mod model;

pub use alert::*;
pub use calendar::*;
pub use model::*;
