//! Typed facade over the 50 USD withdrawal contract.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use alloy_sol_types::SolCall;

use crate::abi::{
    decode_returns, getETHAmountFor50USDCall, ownerCall, withdraw50USDInETHCall,
    ContractInterface,
};
use crate::blockchain::{Address, Amount, TransactionReceipt, TransactionRequest, TxHash};
use crate::errors::{DappError, DappResult};
use crate::provider::{ProviderGateway, SigningProvider};
use crate::validation::InputValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "deposit"),
            TransactionKind::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// Quoted price and contract balance, always read as a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractQuantities {
    pub eth_price_quote: Amount,
    pub contract_balance: Amount,
}

/// A broadcast transaction; awaiting it does not block other reads.
pub struct TransactionHandle<P: SigningProvider> {
    kind: TransactionKind,
    hash: TxHash,
    gateway: Arc<ProviderGateway<P>>,
}

impl<P: SigningProvider> TransactionHandle<P> {
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Wait until mined; a reverted receipt is an error.
    pub async fn wait(&self) -> DappResult<TransactionReceipt> {
        let receipt = self.gateway.wait_for_transaction(&self.hash).await?;
        if !receipt.status {
            return Err(DappError::OnChainRevert(format!(
                "{} transaction {} reverted",
                self.kind, self.hash
            )));
        }
        Ok(receipt)
    }
}

pub struct WithdrawalContract<P: SigningProvider> {
    address: Address,
    interface: ContractInterface,
    gateway: Arc<ProviderGateway<P>>,
    validator: InputValidator,
}

impl<P: SigningProvider> WithdrawalContract<P> {
    /// Bind `address` and `interface` to the gateway. The interface must
    /// describe the owner, quote and withdraw functions and a payable receive.
    pub fn new(
        address: Address,
        interface: ContractInterface,
        gateway: Arc<ProviderGateway<P>>,
    ) -> DappResult<Self> {
        interface.expect_call::<ownerCall>(true, Some("address"))?;
        interface.expect_call::<getETHAmountFor50USDCall>(true, Some("uint256"))?;
        interface.expect_call::<withdraw50USDInETHCall>(false, None)?;
        if !interface.accepts_value() {
            return Err(DappError::ValidationError(
                "Contract interface has no payable receive entry".to_string(),
            ));
        }

        Ok(Self {
            address,
            interface,
            gateway,
            validator: InputValidator::new()?,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    async fn view<C: SolCall>(&self, call: C) -> DappResult<C::Return> {
        let output = self.gateway.call(&self.address, &call.abi_encode()).await?;
        decode_returns::<C>(&output)
    }

    pub async fn read_owner(&self) -> DappResult<Address> {
        self.view(ownerCall {}).await
    }

    /// Current ETH equivalent of 50 USD per the contract's price feed
    pub async fn read_quoted_amount(&self) -> DappResult<Amount> {
        self.view(getETHAmountFor50USDCall {})
            .await
            .map(Amount::from_wei)
    }

    pub async fn contract_balance(&self) -> DappResult<Amount> {
        self.gateway.native_balance(&self.address).await
    }

    /// Both quantities, or an error; never one without the other.
    pub async fn read_quantities(&self) -> DappResult<ContractQuantities> {
        let eth_price_quote = self.read_quoted_amount().await?;
        let contract_balance = self.contract_balance().await?;
        Ok(ContractQuantities {
            eth_price_quote,
            contract_balance,
        })
    }

    /// Call `withdraw50USDInETH`; the owner check happens on-chain.
    pub async fn submit_withdraw(&self) -> DappResult<TransactionHandle<P>> {
        let data = withdraw50USDInETHCall {}.abi_encode();
        let signer = self.gateway.get_signer().await?;
        let hash = signer
            .send_transaction(TransactionRequest::call(self.address, data))
            .await?;
        Ok(self.handle(TransactionKind::Withdraw, hash))
    }

    /// Send `amount` ETH to the contract. The amount is validated before the
    /// provider is touched.
    pub async fn submit_deposit(&self, amount: &str) -> DappResult<TransactionHandle<P>> {
        let value = self.validator.parse_deposit_amount(amount)?;
        let signer = self.gateway.get_signer().await?;
        let hash = signer
            .send_transaction(TransactionRequest::transfer(self.address, value))
            .await?;
        Ok(self.handle(TransactionKind::Deposit, hash))
    }

    fn handle(&self, kind: TransactionKind, hash: TxHash) -> TransactionHandle<P> {
        log::info!("{} transaction broadcast: {}", kind, hash);
        TransactionHandle {
            kind,
            hash,
            gateway: Arc::clone(&self.gateway),
        }
    }
}
