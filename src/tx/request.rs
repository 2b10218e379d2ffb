//! The transaction boundary the submission engine drives

use crate::error::ReporterResult;

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

/// Per-attempt submission parameters. Everything else about the
/// transaction stays fixed across retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub from: Address,
    pub gas: U256,
    pub gas_price: U256,
}

/// Progress signals emitted while a submission is in flight.
///
/// None of these complete the submission; only the receipt does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// The node accepted the transaction into its pending pool
    Accepted { tx_hash: H256, gas_price: U256 },
}

/// A pre-encoded call that can be estimated, dry-run and sent.
#[cfg_attr(test, mockall::automock(type Receipt = String;))]
#[async_trait]
pub trait TransactionRequest: Send + Sync {
    type Receipt: Send;

    /// Estimate gas units. Fails on revert or RPC error.
    async fn estimate_gas(&self) -> ReporterResult<U256>;

    /// Read-only dry run. Fails if execution would revert.
    async fn call(&self) -> ReporterResult<()>;

    /// Broadcast with the given parameters and wait for the receipt.
    async fn send(&self, params: TxParams) -> ReporterResult<Self::Receipt>;
}
