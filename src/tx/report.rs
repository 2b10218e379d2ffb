//! Price report transaction against the oracle contract

use super::request::{SubmissionEvent, TransactionRequest, TxParams};
use crate::chain::SignerClient;
use crate::error::{ReporterError, ReporterResult};

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::TransactionRequest as LegacyRequest;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Oracle entry point taking a round id and the answer
pub const SUBMIT_SIGNATURE: &str = "submit(uint256,int256)";

/// Confirmations before a submission counts as complete
const CONFIRMATIONS: usize = 1;

/// A price answer for one oracle round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceReport {
    pub round_id: U256,
    pub answer: I256,
}

impl PriceReport {
    pub fn new(round_id: u64, answer: i128) -> Self {
        Self {
            round_id: U256::from(round_id),
            answer: I256::from(answer),
        }
    }

    /// ABI-encoded `submit(round_id, answer)` calldata
    pub fn calldata(&self) -> Bytes {
        let mut data = ethers::utils::id(SUBMIT_SIGNATURE).to_vec();
        data.extend(abi::encode(&[
            Token::Uint(self.round_id),
            Token::Int(self.answer.into_raw()),
        ]));
        data.into()
    }
}

/// A pre-encoded oracle call bound to a signing client
pub struct ContractCall<M = SignerClient> {
    client: Arc<M>,
    to: Address,
    from: Address,
    data: Bytes,
    events: Option<mpsc::UnboundedSender<SubmissionEvent>>,
}

impl<M: Middleware> ContractCall<M> {
    pub fn new(client: Arc<M>, to: Address, from: Address, report: &PriceReport) -> Self {
        Self {
            client,
            to,
            from,
            data: report.calldata(),
            events: None,
        }
    }

    /// Forward progress signals of each submission to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SubmissionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn base_request(&self) -> LegacyRequest {
        LegacyRequest::new()
            .to(self.to)
            .from(self.from)
            .data(self.data.clone())
    }

    fn notify(&self, event: SubmissionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching progress
            let _ = events.send(event);
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> TransactionRequest for ContractCall<M> {
    type Receipt = TransactionReceipt;

    async fn estimate_gas(&self) -> ReporterResult<U256> {
        let tx: TypedTransaction = self.base_request().into();
        self.client
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| ReporterError::GasEstimation(e.to_string()))
    }

    async fn call(&self) -> ReporterResult<()> {
        let tx: TypedTransaction = self.base_request().into();
        self.client
            .call(&tx, None)
            .await
            .map(|_| ())
            .map_err(|e| ReporterError::Contract(e.to_string()))
    }

    async fn send(&self, params: TxParams) -> ReporterResult<TransactionReceipt> {
        let tx = self
            .base_request()
            .from(params.from)
            .gas(params.gas)
            .gas_price(params.gas_price);

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| ReporterError::Send(e.to_string()))?;

        let tx_hash = pending.tx_hash();
        debug!(tx_hash = ?tx_hash, "Transaction in pending pool");
        self.notify(SubmissionEvent::Accepted {
            tx_hash,
            gas_price: params.gas_price,
        });

        let receipt = pending
            .confirmations(CONFIRMATIONS)
            .await
            .map_err(|e| ReporterError::Send(e.to_string()))?
            .ok_or_else(|| {
                ReporterError::Send(format!("Transaction {:?} dropped from mempool", tx_hash))
            })?;

        if receipt.status == Some(U64::zero()) {
            return Err(ReporterError::Send(format!(
                "Transaction {:?} reverted in block {:?}",
                tx_hash, receipt.block_number
            )));
        }

        info!(
            tx_hash = ?tx_hash,
            block = ?receipt.block_number,
            gas_used = ?receipt.gas_used,
            "Transaction mined"
        );
        Ok(receipt)
    }
}
