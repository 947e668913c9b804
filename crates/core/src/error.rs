//! Configuration errors.
//!
//! Corruption and I/O failures are defined where they occur (the
//! durability layer); this crate only owns the errors that can be raised
//! before any table exists.

use thiserror::Error;

/// Errors raised while validating a tracker configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configured byte budget cannot hold even a single slot.
    #[error("map budget of {budget} bytes is too small, minimum is {min} bytes")]
    BudgetTooSmall {
        /// Configured budget in bytes.
        budget: u64,
        /// Smallest enabled budget.
        min: u64,
    },

    /// Tracking was requested by policy but the configured budget is zero.
    #[error("tracking is required but the configured map budget is zero")]
    TrackingRequired,
}
