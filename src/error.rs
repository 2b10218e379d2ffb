//! Error types for the Oracle Reporter

use thiserror::Error;

/// Main error type for the reporter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    /// Estimation failed and the dry-run call reverted as well
    #[error("Transaction would revert: {estimate} (dry run: {call})")]
    Validation {
        #[source]
        estimate: Box<ReporterError>,
        call: String,
    },

    #[error("Transaction send error: {0}")]
    Send(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReporterError {
    /// Check if a fresh attempt at a higher gas price could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReporterError::ChainConnection { .. }
                | ReporterError::GasEstimation(_)
                | ReporterError::Send(_)
        )
    }

    /// Check if error should trigger an alert
    pub fn should_alert(&self) -> bool {
        matches!(
            self,
            ReporterError::Validation { .. } | ReporterError::Wallet(_) | ReporterError::Config(_)
        )
    }
}

/// Result type for reporter operations
pub type ReporterResult<T> = Result<T, ReporterError>;
