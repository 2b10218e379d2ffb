//! Gas limit estimation with a dry-run guarded fallback

use super::request::TransactionRequest;
use crate::error::{ReporterError, ReporterResult};

use ethers::types::U256;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Gas estimator for transactions
#[derive(Debug, Clone)]
pub struct GasEstimator {
    /// Multiplier applied to a successful estimate (e.g. 1.5 = 50% buffer)
    inflation_factor: Decimal,
    /// Gas limit used when estimation fails but the call does not revert
    fallback_gas: U256,
}

impl GasEstimator {
    /// Create a new gas estimator
    pub fn new(inflation_factor: Decimal, fallback_gas: U256) -> Self {
        Self {
            inflation_factor,
            fallback_gas,
        }
    }

    /// Compute a gas limit for `tx`.
    ///
    /// A successful estimate is inflated by the configured factor. When the
    /// node cannot estimate, the transaction is dry-run: if that succeeds the
    /// estimation failure is treated as an RPC quirk and the fallback limit is
    /// returned, otherwise the transaction is invalid and nothing should be
    /// sent.
    pub async fn estimate<T>(&self, tx: &T) -> ReporterResult<U256>
    where
        T: TransactionRequest + ?Sized,
    {
        match tx.estimate_gas().await {
            Ok(estimate) => {
                let gas_limit = mul_floor(estimate, self.inflation_factor);
                debug!(
                    estimate = %estimate,
                    gas_limit = %gas_limit,
                    "Gas estimated (factor {})",
                    self.inflation_factor
                );
                Ok(gas_limit)
            }
            Err(estimate_err) => {
                warn!("Gas estimation failed, dry-running transaction: {}", estimate_err);

                match tx.call().await {
                    Ok(()) => {
                        warn!(
                            fallback_gas = %self.fallback_gas,
                            "Dry run succeeded, using fallback gas limit"
                        );
                        Ok(self.fallback_gas)
                    }
                    Err(call_err) => Err(ReporterError::Validation {
                        estimate: Box::new(estimate_err),
                        call: call_err.to_string(),
                    }),
                }
            }
        }
    }
}

/// `floor(value * factor)` in exact decimal arithmetic.
///
/// Negative factors are clamped to zero. Results above `U256::MAX` saturate.
pub fn mul_floor(value: U256, factor: Decimal) -> U256 {
    let factor = factor.max(Decimal::ZERO);
    let numerator = U256::from(factor.mantissa().unsigned_abs());
    let denominator = U256::exp10(factor.scale() as usize);

    // value = q * d + r, so floor(value * n / d) = q * n + floor(r * n / d).
    // r < 10^28 and n < 2^96, so the remainder product cannot overflow.
    let remainder = (value % denominator) * numerator / denominator;
    (value / denominator)
        .checked_mul(numerator)
        .and_then(|whole| whole.checked_add(remainder))
        .unwrap_or(U256::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::request::MockTransactionRequest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_mul_floor() {
        assert_eq!(mul_floor(U256::from(10u64), dec("0.1")), U256::from(1u64));
        assert_eq!(mul_floor(U256::from(11u64), dec("0.1")), U256::from(1u64));
        assert_eq!(mul_floor(U256::from(21_001u64), dec("1.5")), U256::from(31_501u64));
        assert_eq!(mul_floor(U256::from(100u64), dec("0")), U256::zero());
        assert_eq!(mul_floor(U256::from(100u64), dec("-2")), U256::zero());
        assert_eq!(
            mul_floor(U256::from(30_000_000_001u64), dec("0.125")),
            U256::from(3_750_000_000u64)
        );
    }

    #[test]
    fn test_mul_floor_near_u256_max() {
        assert_eq!(mul_floor(U256::MAX, dec("0.5")), U256::MAX / 2u64);
        assert_eq!(mul_floor(U256::MAX, dec("1")), U256::MAX);
        assert_eq!(mul_floor(U256::MAX, dec("1.5")), U256::MAX);
        assert_eq!(
            mul_floor(U256::MAX / 10u64, dec("0.1")),
            U256::MAX / 100u64
        );
    }

    #[tokio::test]
    async fn test_estimate_is_inflated() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .times(1)
            .returning(|| Ok(U256::from(100_001u64)));
        tx.expect_call().never();

        let estimator = GasEstimator::new(dec("1.5"), U256::from(500_000u64));
        let gas = estimator.estimate(&tx).await.unwrap();
        assert_eq!(gas, U256::from(150_001u64));
    }

    #[tokio::test]
    async fn test_failed_estimate_with_clean_dry_run_uses_fallback() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .times(1)
            .returning(|| Err(ReporterError::GasEstimation("header not found".to_string())));
        tx.expect_call().times(1).returning(|| Ok(()));

        let estimator = GasEstimator::new(dec("1.5"), U256::from(500_000u64));
        let gas = estimator.estimate(&tx).await.unwrap();
        assert_eq!(gas, U256::from(500_000u64));
    }

    #[tokio::test]
    async fn test_failed_estimate_and_dry_run_is_invalid() {
        let mut tx = MockTransactionRequest::new();
        tx.expect_estimate_gas()
            .times(1)
            .returning(|| Err(ReporterError::GasEstimation("execution reverted".to_string())));
        tx.expect_call()
            .times(1)
            .returning(|| Err(ReporterError::Contract("execution reverted".to_string())));

        let estimator = GasEstimator::new(dec("1.5"), U256::from(500_000u64));
        let err = estimator.estimate(&tx).await.unwrap_err();
        assert_eq!(
            std::error::Error::source(&err).map(|e| e.to_string()),
            Some(ReporterError::GasEstimation("execution reverted".to_string()).to_string())
        );

        match err {
            ReporterError::Validation { estimate, .. } => assert_eq!(
                *estimate,
                ReporterError::GasEstimation("execution reverted".to_string())
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
