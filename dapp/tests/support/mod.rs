//! In-memory signing provider for driving the dapp without a wallet.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use eth_withdrawal_lib::abi::{getETHAmountFor50USDCall, ownerCall};
use eth_withdrawal_lib::blockchain::parse_address;
use eth_withdrawal_lib::{
    AccountsHandler, Address, Amount, Bytes, DappConfig, DappResult, ListenerId, LocalFuture,
    ProviderRpcError, SigningProvider, TransactionReceipt, TransactionRequest, TxHash, U256,
};

pub fn address(fill: char) -> Address {
    parse_address(&format!("0x{}", fill.to_string().repeat(40))).expect("valid address")
}

pub fn wei(value: u128) -> U256 {
    U256::from(value)
}

pub fn test_config() -> DappConfig {
    DappConfig::new("test")
}

async fn yield_times(count: usize) {
    for _ in 0..count {
        tokio::task::yield_now().await;
    }
}

#[derive(Default)]
struct MockState {
    wallet_accounts: Vec<Address>,
    authorized: bool,
    reject_connect: bool,
    connect_delay: usize,
    connect_requests: usize,
    owner: Option<Address>,
    owner_failures: usize,
    quote_wei: U256,
    balance_wei: U256,
    reject_sends: bool,
    revert_receipts: bool,
    hold_confirmations: bool,
    sent: Vec<TransactionRequest>,
    owner_delays: VecDeque<usize>,
    quote_delays: VecDeque<usize>,
    listeners: BTreeMap<u64, AccountsHandler>,
    interactions: usize,
}

pub struct MockProvider {
    contract: Address,
    state: RefCell<MockState>,
    next_id: Cell<u64>,
}

impl MockProvider {
    pub fn new(contract: Address, wallet_accounts: Vec<Address>) -> Self {
        Self {
            contract,
            state: RefCell::new(MockState {
                wallet_accounts,
                quote_wei: wei(20_000_000_000_000_000),
                balance_wei: wei(100_000_000_000_000_000),
                ..MockState::default()
            }),
            next_id: Cell::new(1),
        }
    }

    pub fn with_owner(self, owner: Address) -> Self {
        self.state.borrow_mut().owner = Some(owner);
        self
    }

    pub fn pre_authorized(self) -> Self {
        self.state.borrow_mut().authorized = true;
        self
    }

    pub fn reject_connect(&self) {
        self.state.borrow_mut().reject_connect = true;
    }

    /// Keep `eth_requestAccounts` open for `yields` scheduler turns, like a
    /// wallet prompt the user has not answered yet.
    pub fn delay_connect(&self, yields: usize) {
        self.state.borrow_mut().connect_delay = yields;
    }

    pub fn reject_sends(&self) {
        self.state.borrow_mut().reject_sends = true;
    }

    pub fn revert_receipts(&self) {
        self.state.borrow_mut().revert_receipts = true;
    }

    /// Broadcast transactions never get mined.
    pub fn hold_confirmations(&self) {
        self.state.borrow_mut().hold_confirmations = true;
    }

    /// The next `count` owner reads fail with a node error.
    pub fn fail_owner_reads(&self, count: usize) {
        self.state.borrow_mut().owner_failures = count;
    }

    /// Yield counts for the next owner reads, consumed in order.
    pub fn delay_owner_reads(&self, delays: &[usize]) {
        self.state.borrow_mut().owner_delays.extend(delays);
    }

    /// Yield counts for the next quote reads, consumed in order. A read
    /// returns the quote as it was when the read started.
    pub fn delay_quote_reads(&self, delays: &[usize]) {
        self.state.borrow_mut().quote_delays.extend(delays);
    }

    pub fn set_quote(&self, quote_wei: U256) {
        self.state.borrow_mut().quote_wei = quote_wei;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.borrow().sent.clone()
    }

    pub fn interactions(&self) -> usize {
        self.state.borrow().interactions
    }

    pub fn connect_requests(&self) -> usize {
        self.state.borrow().connect_requests
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub fn balance_wei(&self) -> U256 {
        self.state.borrow().balance_wei
    }

    /// Switch wallet accounts and invoke every registered handler. The
    /// returned futures are what the host would drive.
    pub fn emit_accounts(&self, accounts: Vec<Address>) -> Vec<LocalFuture<'static, ()>> {
        let handlers: Vec<AccountsHandler> = {
            let mut state = self.state.borrow_mut();
            state.wallet_accounts = accounts.clone();
            state.listeners.values().cloned().collect()
        };
        handlers
            .iter()
            .map(|handler| handler(accounts.clone()))
            .collect()
    }

    fn touch(&self) {
        self.state.borrow_mut().interactions += 1;
    }

    fn rejection() -> ProviderRpcError {
        ProviderRpcError {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        }
    }

    fn node_error(message: &str) -> ProviderRpcError {
        ProviderRpcError {
            code: -32000,
            message: message.into(),
            data: None,
        }
    }
}

#[async_trait(?Send)]
impl SigningProvider for MockProvider {
    async fn request_accounts(&self) -> DappResult<Vec<Address>> {
        self.touch();
        let delay = {
            let mut state = self.state.borrow_mut();
            state.connect_requests += 1;
            state.connect_delay
        };
        yield_times(delay).await;

        let mut state = self.state.borrow_mut();
        if state.reject_connect {
            return Err(Self::rejection().into());
        }
        state.authorized = true;
        Ok(state.wallet_accounts.clone())
    }

    async fn accounts(&self) -> DappResult<Vec<Address>> {
        self.touch();
        let state = self.state.borrow();
        if state.authorized {
            Ok(state.wallet_accounts.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn call(&self, to: &Address, data: &[u8]) -> DappResult<Bytes> {
        self.touch();
        assert_eq!(*to, self.contract, "calls must target the contract");

        if data == ownerCall::SELECTOR.as_slice() {
            let (delay, failing) = {
                let mut state = self.state.borrow_mut();
                let failing = state.owner_failures > 0;
                state.owner_failures = state.owner_failures.saturating_sub(1);
                (state.owner_delays.pop_front().unwrap_or(0), failing)
            };
            yield_times(delay).await;
            if failing {
                return Err(Self::node_error("header not found").into());
            }
            let owner = self.state.borrow().owner.unwrap_or(address('0'));
            return Ok(owner.abi_encode().into());
        }

        if data == getETHAmountFor50USDCall::SELECTOR.as_slice() {
            let (delay, quote) = {
                let mut state = self.state.borrow_mut();
                (state.quote_delays.pop_front().unwrap_or(0), state.quote_wei)
            };
            yield_times(delay).await;
            return Ok(quote.abi_encode().into());
        }

        Err(Self::node_error("execution reverted: unknown selector").into())
    }

    async fn balance(&self, address: &Address) -> DappResult<Amount> {
        self.touch();
        if *address == self.contract {
            Ok(Amount::from_wei(self.state.borrow().balance_wei))
        } else {
            Ok(Amount::zero())
        }
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> DappResult<TxHash> {
        self.touch();
        let mut state = self.state.borrow_mut();
        if state.reject_sends {
            return Err(Self::rejection().into());
        }
        state.sent.push(request.clone());
        Ok(TxHash::with_last_byte(state.sent.len() as u8))
    }

    async fn wait_for_transaction(&self, hash: &TxHash) -> DappResult<TransactionReceipt> {
        self.touch();
        let held = self.state.borrow().hold_confirmations;
        if held {
            std::future::pending::<()>().await;
        }
        // Give concurrently driven futures a chance to run while "mining".
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        let status = !state.revert_receipts;
        if status {
            if let Some(request) = state.sent.last().cloned() {
                match request.value {
                    Some(value) => state.balance_wei += value.wei(),
                    None => {
                        let quote = state.quote_wei;
                        state.balance_wei = state.balance_wei.saturating_sub(quote);
                    }
                }
            }
        }
        Ok(TransactionReceipt {
            transaction_hash: *hash,
            block_number: Some(state.sent.len() as u64),
            status,
        })
    }

    fn subscribe_accounts_changed(&self, handler: AccountsHandler) -> DappResult<ListenerId> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.state.borrow_mut().listeners.insert(id, handler);
        Ok(ListenerId(id))
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(&id.0);
    }
}
