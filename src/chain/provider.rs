//! Signing chain connection used to report prices

use crate::config::{ChainConfig, WalletConfig};
use crate::error::{ReporterError, ReporterResult};

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Provider with the oracle wallet attached as signer
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Connection to the chain hosting the oracle contract
pub struct ChainConnection {
    /// Chain configuration
    config: ChainConfig,
    /// Signing client
    client: Arc<SignerClient>,
}

impl ChainConnection {
    /// Connect to the configured RPC endpoint and attach the wallet
    pub async fn connect(config: ChainConfig, wallet: &WalletConfig) -> ReporterResult<Self> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| ReporterError::ChainConnection {
                chain_id: config.chain_id,
                message: format!("Invalid RPC URL: {}", e),
            })?
            .interval(Duration::from_millis(config.poll_interval_ms));

        let remote_chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| ReporterError::ChainConnection {
                chain_id: config.chain_id,
                message: e.to_string(),
            })?;

        if remote_chain_id != U256::from(config.chain_id) {
            return Err(ReporterError::ChainConnection {
                chain_id: config.chain_id,
                message: format!("RPC endpoint serves chain {}", remote_chain_id),
            });
        }

        let wallet = load_wallet(&wallet.private_key_env, config.chain_id)?;
        info!(
            "Connected to chain {} as {:?}",
            config.chain_id,
            wallet.address()
        );

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            config,
        })
    }

    /// Get the signing client
    pub fn client(&self) -> Arc<SignerClient> {
        self.client.clone()
    }

    /// Get wallet address
    pub fn address(&self) -> Address {
        self.client.address()
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Get the oracle contract address
    pub fn oracle_address(&self) -> ReporterResult<Address> {
        self.config
            .oracle_address
            .parse()
            .map_err(|e| ReporterError::Config(format!("Invalid oracle address: {}", e)))
    }

    /// Current network gas price, used as the first attempt's price
    pub async fn gas_price(&self) -> ReporterResult<U256> {
        let price = self
            .client
            .get_gas_price()
            .await
            .map_err(|e| ReporterError::GasEstimation(e.to_string()))?;

        debug!("Gas price for chain {}: {}", self.config.chain_id, price);
        Ok(price)
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.client.get_block_number().await {
            Ok(block) => {
                debug!("Chain {} at block {}", self.config.chain_id, block);
                true
            }
            Err(e) => {
                error!("Health check failed for chain {}: {}", self.config.chain_id, e);
                false
            }
        }
    }
}

/// Load the oracle wallet from the named environment variable
pub fn load_wallet(private_key_env: &str, chain_id: u64) -> ReporterResult<LocalWallet> {
    let key = std::env::var(private_key_env).map_err(|_| {
        ReporterError::Wallet(format!(
            "No wallet configured. Set {} to the oracle private key",
            private_key_env
        ))
    })?;

    let wallet = key
        .trim()
        .parse::<LocalWallet>()
        .map_err(|e| ReporterError::Wallet(format!("Invalid private key: {}", e)))?;

    Ok(wallet.with_chain_id(chain_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (anvil/hardhat account 0)
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_load_wallet_from_env() {
        std::env::set_var("REPORTER_TEST_KEY", DEV_KEY);
        let wallet = load_wallet("REPORTER_TEST_KEY", 31337).unwrap();

        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(wallet.address(), expected);
        assert_eq!(wallet.chain_id(), 31337);
    }

    #[test]
    fn test_missing_wallet_env() {
        let err = load_wallet("REPORTER_TEST_KEY_UNSET", 1).unwrap_err();
        assert!(matches!(err, ReporterError::Wallet(_)));
    }

    #[test]
    fn test_invalid_wallet_key() {
        std::env::set_var("REPORTER_TEST_BAD_KEY", "not-a-key");
        let err = load_wallet("REPORTER_TEST_BAD_KEY", 1).unwrap_err();
        assert!(matches!(err, ReporterError::Wallet(_)));
    }
}
