//! Bounded resubmission with escalating gas price
//!
//! One call to [`send_with_retries`] drives a small state machine: it keeps
//! attempting until an attempt yields a receipt or the retry budget is spent.
//! Attempts run strictly one after another. Nonces and concurrent callers on
//! the same account are the caller's concern.

use super::gas::{mul_floor, GasEstimator};
use super::request::TransactionRequest;
use super::sender::TransactionSender;
use crate::config::TransactionManagerConfig;
use crate::error::{ReporterError, ReporterResult};
use crate::metrics::Instrument;

use ethers::types::U256;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// Mutable state of one `send_with_retries` call
#[derive(Debug)]
pub struct RetryState {
    /// Failed attempts so far
    pub attempt_index: u64,
    /// Gas price offered by the next attempt
    pub gas_price: U256,
    /// Most recent failure, taken when the budget runs out
    pub last_error: Option<ReporterError>,
}

impl RetryState {
    /// Fresh state: no failures yet, first attempt at `initial_gas_price`
    pub fn new(initial_gas_price: U256) -> Self {
        Self {
            attempt_index: 0,
            gas_price: initial_gas_price,
            last_error: None,
        }
    }

    /// Record a failed attempt.
    ///
    /// Returns the error to surface once more than `retry_limit` retries would
    /// be needed; otherwise escalates the gas price for the next attempt and
    /// returns `None`.
    pub fn record_failure(
        &mut self,
        error: ReporterError,
        retry_limit: u32,
        multiplier: Decimal,
    ) -> Option<ReporterError> {
        self.last_error = Some(error);
        self.attempt_index += 1;

        if self.attempt_index > u64::from(retry_limit) {
            return self.last_error.take();
        }

        self.gas_price = next_gas_price(self.gas_price, multiplier);
        None
    }
}

/// `current + floor(current * multiplier)`
pub fn next_gas_price(current: U256, multiplier: Decimal) -> U256 {
    current.saturating_add(mul_floor(current, multiplier))
}

/// Send `tx`, retrying with a higher gas price after each failure.
///
/// Makes at most `transaction_retry_limit + 1` attempts. Resolves with the
/// first receipt, or with the error of the final attempt once every attempt
/// has failed.
pub async fn send_with_retries<T, I>(
    tx: &T,
    initial_gas_price: U256,
    config: &TransactionManagerConfig,
    instrument: I,
) -> ReporterResult<T::Receipt>
where
    T: TransactionRequest + ?Sized,
    I: Instrument,
{
    let sender = TransactionSender::new(
        GasEstimator::new(config.gas_price_multiplier, config.fallback_gas_limit),
        config.oracle_account,
        instrument,
    );
    let max_attempts = u64::from(config.transaction_retry_limit) + 1;
    let mut state = RetryState::new(initial_gas_price);

    loop {
        let attempt = state.attempt_index + 1;
        info!(
            attempt,
            max_attempts,
            gas_price = %state.gas_price,
            "Sending transaction"
        );

        match sender.send(tx, state.gas_price).await {
            Ok(receipt) => {
                info!(attempt, gas_price = %state.gas_price, "Transaction confirmed");
                return Ok(receipt);
            }
            Err(e) => {
                warn!(
                    attempt,
                    retryable = e.is_retryable(),
                    "Transaction attempt failed: {}",
                    e
                );

                if let Some(last_error) = state.record_failure(
                    e,
                    config.transaction_retry_limit,
                    config.transaction_retry_gas_price_multiplier,
                ) {
                    error!(attempts = max_attempts, "Transaction retries exhausted");
                    return Err(last_error);
                }
            }
        }
    }
}
