//! Provider gateway over the host-injected signing provider.
//!
//! The [`SigningProvider`] trait is the host boundary (an EIP-1193 object in
//! the browser, a JSON-RPC node natively). [`ProviderGateway`] is what the
//! rest of the crate talks to: it checks that a provider exists before every
//! operation, hands out [`Signer`]s, and owns the single account-change
//! registration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::{Address, Amount, Bytes, TransactionReceipt, TransactionRequest, TxHash};
use crate::errors::{DappError, DappResult};

/// Boxed future for single-threaded hosts; browser promises are not `Send`.
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Callback invoked with the new account list on a provider account switch.
/// The provider drives the returned future to completion.
pub type AccountsHandler = Arc<dyn Fn(Vec<Address>) -> LocalFuture<'static, ()>>;

/// Identity of one account-change registration at the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// EIP-1193 code for "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1474 code nodes use for execution reverts.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Error object returned by an EIP-1193 provider or a JSON-RPC node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    fn is_revert(&self) -> bool {
        self.code == EXECUTION_REVERTED_CODE
            || self.message.to_lowercase().contains("revert")
            || self
                .data
                .as_ref()
                .and_then(Value::as_str)
                .map(|data| data.starts_with("0x08c379a0"))
                .unwrap_or(false)
    }
}

impl From<ProviderRpcError> for DappError {
    fn from(error: ProviderRpcError) -> Self {
        if error.code == USER_REJECTED_CODE {
            DappError::UserRejected
        } else if error.is_revert() {
            DappError::OnChainRevert(error.message)
        } else {
            DappError::NetworkError(format!("{} (code {})", error.message, error.code))
        }
    }
}

/// The host-supplied signing capability.
#[async_trait(?Send)]
pub trait SigningProvider {
    /// Prompt the user for account access (`eth_requestAccounts`).
    async fn request_accounts(&self) -> DappResult<Vec<Address>>;

    /// Already-authorized accounts (`eth_accounts`); never prompts.
    async fn accounts(&self) -> DappResult<Vec<Address>>;

    /// Read-only contract call (`eth_call` at the latest block).
    async fn call(&self, to: &Address, data: &[u8]) -> DappResult<Bytes>;

    /// Native balance (`eth_getBalance`).
    async fn balance(&self, address: &Address) -> DappResult<Amount>;

    /// Sign and broadcast (`eth_sendTransaction`); resolves once broadcast.
    async fn send_transaction(&self, request: &TransactionRequest) -> DappResult<TxHash>;

    /// Resolve once the transaction is mined.
    async fn wait_for_transaction(&self, hash: &TxHash) -> DappResult<TransactionReceipt>;

    fn subscribe_accounts_changed(&self, handler: AccountsHandler) -> DappResult<ListenerId>;

    fn unsubscribe(&self, id: ListenerId);
}

/// Scoped account-change registration; released on drop.
pub struct AccountsSubscription<P: SigningProvider> {
    provider: Arc<P>,
    id: ListenerId,
}

impl<P: SigningProvider> AccountsSubscription<P> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl<P: SigningProvider> Drop for AccountsSubscription<P> {
    fn drop(&mut self) {
        log::debug!("Releasing accounts listener {:?}", self.id);
        self.provider.unsubscribe(self.id);
    }
}

/// Capability to send transactions as one connected account.
pub struct Signer<P: SigningProvider> {
    address: Address,
    provider: Arc<P>,
}

impl<P: SigningProvider> Signer<P> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn send_transaction(&self, request: TransactionRequest) -> DappResult<TxHash> {
        let request = request.with_from(self.address);
        self.provider.send_transaction(&request).await
    }
}

pub struct ProviderGateway<P: SigningProvider> {
    provider: Option<Arc<P>>,
    subscription: Mutex<Option<AccountsSubscription<P>>>,
}

impl<P: SigningProvider> ProviderGateway<P> {
    /// `None` models a page with no injected provider.
    pub fn new(provider: Option<Arc<P>>) -> Self {
        Self {
            provider,
            subscription: Mutex::new(None),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> DappResult<&Arc<P>> {
        self.provider.as_ref().ok_or(DappError::NoProvider)
    }

    /// Request account access and return the first authorized account.
    pub async fn connect(&self) -> DappResult<Address> {
        let provider = self.provider()?;
        let accounts = provider.request_accounts().await?;
        let account = accounts.first().copied().ok_or(DappError::NoSigner)?;
        log::info!("Provider granted access to {}", account);
        Ok(account)
    }

    pub async fn current_accounts(&self) -> DappResult<Vec<Address>> {
        self.provider()?.accounts().await
    }

    pub async fn get_signer(&self) -> DappResult<Signer<P>> {
        let provider = self.provider()?;
        let accounts = provider.accounts().await?;
        let address = accounts.first().copied().ok_or(DappError::NoSigner)?;
        Ok(Signer {
            address,
            provider: Arc::clone(provider),
        })
    }

    pub async fn native_balance(&self, address: &Address) -> DappResult<Amount> {
        self.provider()?.balance(address).await
    }

    pub async fn call(&self, to: &Address, data: &[u8]) -> DappResult<Bytes> {
        self.provider()?.call(to, data).await
    }

    pub async fn wait_for_transaction(&self, hash: &TxHash) -> DappResult<TransactionReceipt> {
        self.provider()?.wait_for_transaction(hash).await
    }

    /// Register `handler` for account switches, releasing any earlier
    /// registration first so at most one is ever active.
    pub fn on_accounts_changed(&self, handler: AccountsHandler) -> DappResult<ListenerId> {
        let provider = self.provider()?;
        let mut slot = self.subscription.lock();
        drop(slot.take());

        let id = provider.subscribe_accounts_changed(handler)?;
        *slot = Some(AccountsSubscription {
            provider: Arc::clone(provider),
            id,
        });
        Ok(id)
    }

    /// Release the account-change registration, if any.
    pub fn release_accounts_listener(&self) {
        drop(self.subscription.lock().take());
    }

    pub fn active_listener(&self) -> Option<ListenerId> {
        self.subscription.lock().as_ref().map(AccountsSubscription::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_provider_error_codes() {
        let rejected = ProviderRpcError {
            code: 4001,
            message: "User denied transaction signature.".into(),
            data: None,
        };
        assert_eq!(DappError::from(rejected), DappError::UserRejected);

        let reverted = ProviderRpcError {
            code: -32603,
            message: "Internal JSON-RPC error.".into(),
            data: Some(json!("0x08c379a0deadbeef")),
        };
        assert!(matches!(DappError::from(reverted), DappError::OnChainRevert(_)));

        let by_code = ProviderRpcError {
            code: 3,
            message: "execution reverted: Not owner".into(),
            data: None,
        };
        assert_eq!(
            DappError::from(by_code),
            DappError::OnChainRevert("execution reverted: Not owner".into())
        );

        let network = ProviderRpcError {
            code: -32000,
            message: "header not found".into(),
            data: None,
        };
        assert!(matches!(DappError::from(network), DappError::NetworkError(_)));
    }

    #[test]
    fn deserializes_provider_error_objects() {
        let error: ProviderRpcError =
            serde_json::from_value(json!({ "code": 4001, "message": "rejected" })).unwrap();
        assert_eq!(error.data, None);
        assert_eq!(DappError::from(error), DappError::UserRejected);
    }
}
