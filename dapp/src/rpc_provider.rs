//! Native signing provider backed by a JSON-RPC node.
//!
//! Dev nodes (anvil, hardhat, geth `--dev`) expose unlocked accounts through
//! `eth_accounts` and sign `eth_sendTransaction` themselves, which is the
//! same contract an injected browser wallet offers. Node accounts never
//! switch, so account-change registrations are accepted and never fire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::blockchain::{Address, Amount, Bytes, TransactionReceipt, TransactionRequest, TxHash};
use crate::blockchain_client::BlockchainClient;
use crate::config_store::DappConfig;
use crate::errors::{DappError, DappResult};
use crate::provider::{AccountsHandler, ListenerId, SigningProvider};

pub struct RpcProvider {
    client: BlockchainClient,
    poll_interval: Duration,
    confirmation_timeout: Option<Duration>,
    next_listener: AtomicU64,
}

impl RpcProvider {
    pub fn new(client: BlockchainClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
            confirmation_timeout: None,
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &DappConfig) -> DappResult<Self> {
        let client = BlockchainClient::new(&config.network.rpc_endpoint)?;
        let mut provider = Self::new(client, config.poll_interval());
        provider.confirmation_timeout = config.confirmation_timeout();
        Ok(provider)
    }

    pub fn client(&self) -> &BlockchainClient {
        &self.client
    }

    async fn poll_receipt(&self, hash: &TxHash) -> DappResult<TransactionReceipt> {
        loop {
            if let Some(receipt) = self.client.get_transaction_receipt(hash).await? {
                return Ok(receipt);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait(?Send)]
impl SigningProvider for RpcProvider {
    async fn request_accounts(&self) -> DappResult<Vec<Address>> {
        // Node accounts are authorized up front; there is nobody to prompt.
        self.client.accounts().await
    }

    async fn accounts(&self) -> DappResult<Vec<Address>> {
        self.client.accounts().await
    }

    async fn call(&self, to: &Address, data: &[u8]) -> DappResult<Bytes> {
        self.client.call(to, data).await
    }

    async fn balance(&self, address: &Address) -> DappResult<Amount> {
        self.client.get_balance(address).await
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> DappResult<TxHash> {
        self.client.send_transaction(request).await
    }

    async fn wait_for_transaction(&self, hash: &TxHash) -> DappResult<TransactionReceipt> {
        match self.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.poll_receipt(hash))
                .await
                .map_err(|_| {
                    DappError::ConfirmationTimeout(format!("{} not mined within {:?}", hash, limit))
                })?,
            None => self.poll_receipt(hash).await,
        }
    }

    fn subscribe_accounts_changed(&self, _handler: AccountsHandler) -> DappResult<ListenerId> {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        log::debug!("Node accounts are static; listener {:?} will not fire", id);
        Ok(id)
    }

    fn unsubscribe(&self, _id: ListenerId) {}
}
