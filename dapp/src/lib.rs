// lib.rs - Core library structure for the withdrawal dapp

pub mod abi;
pub mod app_state;
pub mod blockchain;
#[cfg(feature = "rpc")]
pub mod blockchain_client;
pub mod config_store;
pub mod contract;
pub mod coordinator;
pub mod errors;
pub mod notifications;
pub mod provider;
#[cfg(feature = "rpc")]
pub mod rpc_provider;
pub mod session;
pub mod validation;

pub mod dapp {
    //! Subsystem bootstrap shared by the native and browser hosts

    use std::path::Path;

    use crate::config_store::DappConfig;
    use crate::errors::DappResult;

    /// Configuration file at `path`, or defaults labelled with `DAPP_ENV`
    pub fn load_config(path: impl AsRef<Path>) -> DappResult<DappConfig> {
        let environment = DappConfig::from_env().environment;
        let config = DappConfig::load_or_default(path, environment)?;
        init(&config)?;
        Ok(config)
    }

    /// Validate the configuration the host is about to run with
    pub fn init(config: &DappConfig) -> DappResult<()> {
        log::info!("Initializing withdrawal dapp ({})", config.environment);

        config.validate()?;
        log::info!(
            "Contract {} on {} (chain {})",
            config.contract.address,
            config.network.chain_name,
            config.network.chain_id
        );

        Ok(())
    }
}

// Re-export common types
pub use abi::ContractInterface;
pub use app_state::{DappContext, SessionSnapshot};
pub use blockchain::{
    Address, AddressExt, Amount, Bytes, TransactionReceipt, TransactionRequest, TxHash, U256,
};
#[cfg(feature = "rpc")]
pub use blockchain_client::BlockchainClient;
pub use config_store::{
    ContractConfig, DappConfig, NetworkConfig, NotificationConfig, TransactionConfig,
};
pub use contract::{ContractQuantities, TransactionHandle, TransactionKind, WithdrawalContract};
pub use coordinator::{TransactionCoordinator, TransactionOutcome};
pub use errors::{DappError, DappResult};
pub use notifications::{
    ExpiryScheduler, ExpiryTicket, Notification, NotificationKind, NotificationSink,
};
pub use provider::{
    AccountsHandler, ListenerId, LocalFuture, ProviderGateway, ProviderRpcError, Signer,
    SigningProvider,
};
#[cfg(feature = "rpc")]
pub use rpc_provider::RpcProvider;
pub use session::{
    OwnerCheck, PendingTransaction, QuantitiesTicket, Session, SessionState, TransactionState,
};
pub use validation::InputValidator;
