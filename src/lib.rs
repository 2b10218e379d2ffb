//! Oracle Reporter - delivers price updates on-chain despite gas volatility
//!
//! The heart of the crate is [`tx::send_with_retries`]: it estimates a safe gas
//! limit, submits a pre-encoded transaction and resubmits at an escalating gas
//! price until it obtains a receipt or runs out of retries.

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod tx;

pub use error::{ReporterError, ReporterResult};
