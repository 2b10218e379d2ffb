//! Configuration management for the Oracle Reporter
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub reporter: ReporterConfig,
    pub transaction: TransactionSettings,
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    pub instance_id: String,
}

/// Gas and retry policy as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionSettings {
    /// Inflation factor applied to a gas estimate
    pub gas_price_multiplier: Decimal,
    /// Retries after the first attempt
    pub retry_limit: u32,
    /// Per-retry gas price growth factor
    pub retry_gas_price_multiplier: Decimal,
    pub oracle_account: String,
    /// Gas limit used when estimation fails but the dry run passes
    pub fallback_gas_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub oracle_address: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

/// Fully resolved gas/retry policy for one engine invocation.
///
/// Built once from validated [`TransactionSettings`]; the engine never fills
/// in defaults of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionManagerConfig {
    pub gas_price_multiplier: Decimal,
    pub transaction_retry_limit: u32,
    pub transaction_retry_gas_price_multiplier: Decimal,
    pub oracle_account: Address,
    pub fallback_gas_limit: U256,
}

impl Settings {
    /// Load settings from a configuration file
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let tx = &self.transaction;
        if tx.gas_price_multiplier <= Decimal::ZERO {
            anyhow::bail!("transaction.gas_price_multiplier must be positive");
        }
        if tx.retry_gas_price_multiplier.is_sign_negative() {
            anyhow::bail!("transaction.retry_gas_price_multiplier must not be negative");
        }
        if tx.gas_price_multiplier < Decimal::ONE {
            tracing::warn!(
                "gas_price_multiplier {} shrinks gas estimates - transactions may run out of gas",
                tx.gas_price_multiplier
            );
        }
        tx.oracle_account
            .parse::<Address>()
            .with_context(|| format!("Invalid oracle account: {}", tx.oracle_account))?;

        if self.chain.rpc_url.is_empty() {
            anyhow::bail!("chain.rpc_url is not configured");
        }
        self.chain
            .oracle_address
            .parse::<Address>()
            .with_context(|| format!("Invalid oracle address: {}", self.chain.oracle_address))?;

        if self.wallet.private_key_env.is_empty() {
            anyhow::bail!("wallet.private_key_env is not configured");
        }

        Ok(())
    }

    /// Resolve the transaction section into the engine configuration
    pub fn transaction_manager(&self) -> Result<TransactionManagerConfig> {
        let tx = &self.transaction;
        let oracle_account = tx
            .oracle_account
            .parse::<Address>()
            .with_context(|| format!("Invalid oracle account: {}", tx.oracle_account))?;

        Ok(TransactionManagerConfig {
            gas_price_multiplier: tx.gas_price_multiplier,
            transaction_retry_limit: tx.retry_limit,
            transaction_retry_gas_price_multiplier: tx.retry_gas_price_multiplier,
            oracle_account,
            fallback_gas_limit: U256::from(tx.fallback_gas_limit),
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}
