//! Single-attempt transaction submission

use super::gas::GasEstimator;
use super::request::{TransactionRequest, TxParams};
use crate::error::ReporterResult;
use crate::metrics::{self, Instrument};

use ethers::types::{Address, U256};
use tracing::debug;

/// Label under which each estimate+submit sequence is instrumented
pub const SEND_TRANSACTION_LABEL: &str = "sendTransaction";

/// Submits one attempt of a transaction at a fixed gas price.
///
/// The sender never retries; a failure from estimation or submission is
/// returned as-is.
pub struct TransactionSender<I> {
    /// Gas estimator
    gas_estimator: GasEstimator,
    /// Account every attempt is sent from
    from: Address,
    /// Observes each attempt
    instrument: I,
}

impl<I: Instrument> TransactionSender<I> {
    /// Create a new transaction sender
    pub fn new(gas_estimator: GasEstimator, from: Address, instrument: I) -> Self {
        Self {
            gas_estimator,
            from,
            instrument,
        }
    }

    /// Estimate a gas limit, then send `tx` at `gas_price` and wait for its receipt
    pub async fn send<T>(&self, tx: &T, gas_price: U256) -> ReporterResult<T::Receipt>
    where
        T: TransactionRequest + ?Sized,
    {
        let gas_estimator = &self.gas_estimator;
        let from = self.from;

        self.instrument
            .wrap(SEND_TRANSACTION_LABEL, move || async move {
                let gas = gas_estimator.estimate(tx).await?;

                debug!(from = ?from, gas = %gas, gas_price = %gas_price, "Submitting transaction");
                metrics::record_send_attempt(gas_price);

                tx.send(TxParams {
                    from,
                    gas,
                    gas_price,
                })
                .await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReporterError;
    use crate::metrics::NoopInstrument;
    use crate::tx::request::MockTransactionRequest;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::future::Future;
    use std::sync::Mutex;

    /// Records every label it is asked to wrap
    #[derive(Default)]
    struct RecordingInstrument {
        labels: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Instrument for RecordingInstrument {
        async fn wrap<T, F, Fut>(&self, label: &'static str, operation: F) -> ReporterResult<T>
        where
            T: Send,
            F: FnOnce() -> Fut + Send,
            Fut: Future<Output = ReporterResult<T>> + Send,
        {
            self.labels.lock().unwrap().push(label);
            operation().await
        }
    }

    fn account() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn estimator() -> GasEstimator {
        GasEstimator::new(Decimal::new(12, 1), U256::from(400_000u64))
    }

    #[tokio::test]
    async fn test_send_uses_inflated_estimate() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .returning(|| Ok(U256::from(50_000u64)));
        tx.expect_send()
            .withf(|params| {
                *params
                    == TxParams {
                        from: Address::repeat_byte(0xaa),
                        gas: U256::from(60_000u64),
                        gas_price: U256::from(7u64),
                    }
            })
            .times(1)
            .returning(|_| Ok("receipt".to_string()));

        let instrument = RecordingInstrument::default();
        let sender = TransactionSender::new(estimator(), account(), instrument);
        let receipt = sender.send(&tx, U256::from(7u64)).await.unwrap();

        assert_eq!(receipt, "receipt");
        assert_eq!(
            *sender.instrument.labels.lock().unwrap(),
            vec![SEND_TRANSACTION_LABEL]
        );
    }

    #[tokio::test]
    async fn test_send_with_fallback_gas() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .returning(|| Err(ReporterError::GasEstimation("rpc quirk".to_string())));
        tx.expect_call().times(1).returning(|| Ok(()));
        tx.expect_send()
            .withf(|params| params.gas == U256::from(400_000u64))
            .times(1)
            .returning(|_| Ok("receipt".to_string()));

        let sender = TransactionSender::new(estimator(), account(), NoopInstrument);
        assert!(sender.send(&tx, U256::from(7u64)).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_transaction_is_not_sent() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .returning(|| Err(ReporterError::GasEstimation("execution reverted".to_string())));
        tx.expect_call()
            .returning(|| Err(ReporterError::Contract("execution reverted".to_string())));
        tx.expect_send().never();

        let sender = TransactionSender::new(estimator(), account(), NoopInstrument);
        let err = sender.send(&tx, U256::from(7u64)).await.unwrap_err();
        assert!(matches!(err, ReporterError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_send_failure_is_propagated_unchanged() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .returning(|| Ok(U256::from(50_000u64)));
        tx.expect_send()
            .times(1)
            .returning(|_| Err(ReporterError::Send("transaction underpriced".to_string())));

        let sender = TransactionSender::new(estimator(), account(), NoopInstrument);
        let err = sender.send(&tx, U256::from(7u64)).await.unwrap_err();
        assert_eq!(err, ReporterError::Send("transaction underpriced".to_string()));
    }
}
