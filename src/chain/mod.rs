//! Chain module - the signing connection to the oracle's network

pub mod provider;

pub use provider::{ChainConnection, SignerClient};
