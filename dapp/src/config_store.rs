//! Static dapp configuration: built-in Scroll Sepolia defaults, optionally
//! overridden by a JSON file. Nothing here is ever written back.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::abi::ContractInterface;
use crate::blockchain::{parse_address, Address, TxHash};
use crate::errors::{DappError, DappResult};
use crate::validation::InputValidator;

/// Environment variable selecting the configuration environment label.
pub const ENVIRONMENT_VAR: &str = "DAPP_ENV";

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xE7289411Cbb84CAa98857b9725A9F993427f8590";

pub const DEFAULT_CONTRACT_ABI: &str = r#"[
  {"type":"constructor","inputs":[],"stateMutability":"nonpayable"},
  {"type":"receive","stateMutability":"payable"},
  {"type":"function","name":"getETHAmountFor50USD","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"owner","inputs":[],"outputs":[{"name":"","type":"address","internalType":"address payable"}],"stateMutability":"view"},
  {"type":"function","name":"withdraw50USDInETH","inputs":[],"outputs":[],"stateMutability":"nonpayable"}
]"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_endpoint: String,
    pub explorer_name: String,
    pub explorer_url: String,
    pub currency_symbol: String,
    pub currency_decimals: u8,
    pub testnet: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        // Scroll Sepolia Testnet
        Self {
            chain_id: 534_351,
            chain_name: "Scroll Sepolia Testnet".to_string(),
            rpc_endpoint: "https://534351.rpc.thirdweb.com".to_string(),
            explorer_name: "ScrollScan".to_string(),
            explorer_url: "https://sepolia.scrollscan.com".to_string(),
            currency_symbol: "ETH".to_string(),
            currency_decimals: 18,
            testnet: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContractConfig {
    pub address: String,
    /// JSON interface description
    pub abi: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            abi: DEFAULT_CONTRACT_ABI.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    pub lifetime_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { lifetime_secs: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransactionConfig {
    /// Receipt polling interval for providers that poll
    pub poll_interval_ms: u64,
    /// No limit when unset; a confirmation wait then lasts as long as the chain takes.
    pub confirmation_timeout_secs: Option<u64>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            confirmation_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DappConfig {
    pub network: NetworkConfig,
    pub contract: ContractConfig,
    pub notifications: NotificationConfig,
    pub transactions: TransactionConfig,
    pub environment: String,
}

impl Default for DappConfig {
    fn default() -> Self {
        Self::new("development")
    }
}

impl DappConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            network: NetworkConfig::default(),
            contract: ContractConfig::default(),
            notifications: NotificationConfig::default(),
            transactions: TransactionConfig::default(),
            environment: environment.into(),
        }
    }

    /// Defaults labelled with `DAPP_ENV`, or `development` when unset.
    pub fn from_env() -> Self {
        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::new(environment)
    }

    pub fn from_json(json: &str) -> DappResult<Self> {
        let config: DappConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the JSON config at `path`, or the built-in defaults labelled
    /// `environment` when no file exists. Sections missing from the file
    /// keep their defaults.
    pub fn load_or_default(
        path: impl AsRef<Path>,
        environment: impl Into<String>,
    ) -> DappResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config file at {}; using defaults", path.display());
            let config = Self::new(environment);
            config.validate()?;
            return Ok(config);
        }

        log::info!("Loading config from {}", path.display());
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> DappResult<()> {
        let validator = InputValidator::new()?;
        parse_address(&self.contract.address)?;
        validator.validate_endpoint(&self.network.rpc_endpoint)?;
        validator.validate_endpoint(&self.network.explorer_url)?;
        ContractInterface::from_json(&self.contract.abi)?;

        if self.network.currency_decimals != 18 {
            return Err(DappError::ValidationError(format!(
                "Unsupported native currency decimals {}",
                self.network.currency_decimals
            )));
        }
        if self.notifications.lifetime_secs == 0 {
            return Err(DappError::ValidationError(
                "Notification lifetime must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn contract_address(&self) -> DappResult<Address> {
        parse_address(&self.contract.address)
    }

    pub fn contract_interface(&self) -> DappResult<ContractInterface> {
        ContractInterface::from_json(&self.contract.abi)
    }

    pub fn notification_lifetime(&self) -> Duration {
        Duration::from_secs(self.notifications.lifetime_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.transactions.poll_interval_ms.max(1))
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.transactions
            .confirmation_timeout_secs
            .map(Duration::from_secs)
    }

    pub fn explorer_tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{}", self.network.explorer_url.trim_end_matches('/'), hash)
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!(
            "{}/address/{}",
            self.network.explorer_url.trim_end_matches('/'),
            address
        )
    }
}
