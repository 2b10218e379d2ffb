//! Transaction submission module with gas estimation and escalating retries

mod gas;
mod report;
mod request;
mod retry;
mod sender;

pub use gas::GasEstimator;
pub use report::{ContractCall, PriceReport};
pub use request::{SubmissionEvent, TransactionRequest, TxParams};
pub use retry::{next_gas_price, send_with_retries, RetryState};
pub use sender::TransactionSender;
