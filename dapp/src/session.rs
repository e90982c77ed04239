use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blockchain::{Address, TxHash};
use crate::contract::{ContractQuantities, TransactionKind};

/// Connection and UI flags for the current page session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub account: Option<Address>,
    /// Only meaningful while `account` is set; cleared with it.
    pub is_owner: bool,
    pub connecting: bool,
    pub processing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionState {
    Submitting,
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub kind: TransactionKind,
    pub hash: Option<TxHash>,
    pub state: TransactionState,
}

/// Proof that an owner check was started for `address`. Results are only
/// applied while that address is still the session account.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an owner check must be resolved with set_owner_flag"]
pub struct OwnerCheck {
    address: Address,
}

impl OwnerCheck {
    pub fn address(&self) -> Address {
        self.address
    }
}

/// Issued when a quantities read starts; orders concurrent refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[must_use = "a quantities refresh must be committed with set_quantities"]
pub struct QuantitiesTicket {
    generation: u64,
}

#[derive(Debug, Default)]
struct SessionInner {
    session: Session,
    /// The last owner check for the current account errored out.
    owner_check_failed: bool,
    quantities: Option<ContractQuantities>,
    quantities_issued: u64,
    quantities_committed: u64,
    pending: Option<PendingTransaction>,
}

/// Single source of truth for session, quantities and the in-flight
/// transaction. Every mutation happens under one write lock, so readers
/// never see a half-applied transition.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<SessionInner>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Session {
        self.inner.read().session.clone()
    }

    pub fn account(&self) -> Option<Address> {
        self.inner.read().session.account
    }

    pub fn is_processing(&self) -> bool {
        self.inner.read().session.processing
    }

    pub fn quantities(&self) -> Option<ContractQuantities> {
        self.inner.read().quantities
    }

    pub fn pending(&self) -> Option<PendingTransaction> {
        self.inner.read().pending.clone()
    }

    /// Consistent copy of everything under one read lock.
    pub fn read_all(
        &self,
    ) -> (
        Session,
        Option<ContractQuantities>,
        Option<PendingTransaction>,
    ) {
        let inner = self.inner.read();
        (inner.session.clone(), inner.quantities, inner.pending.clone())
    }

    /// Set the account and clear the owner flag; the caller resolves the
    /// returned check once the contract owner is known.
    pub fn set_connected(&self, address: Address) -> OwnerCheck {
        let mut inner = self.inner.write();
        inner.session.account = Some(address);
        inner.session.is_owner = false;
        inner.owner_check_failed = false;
        OwnerCheck { address }
    }

    pub fn set_disconnected(&self) {
        let mut inner = self.inner.write();
        inner.session.account = None;
        inner.session.is_owner = false;
        inner.owner_check_failed = false;
    }

    /// Apply an owner check result. Returns `false` (and changes nothing)
    /// when the session has moved to another account since the check began.
    pub fn set_owner_flag(&self, check: OwnerCheck, is_owner: bool) -> bool {
        let mut inner = self.inner.write();
        if inner.session.account != Some(check.address) {
            log::warn!(
                "Discarding stale owner check for {}; session account is {:?}",
                check.address,
                inner.session.account
            );
            return false;
        }
        inner.session.is_owner = is_owner;
        inner.owner_check_failed = false;
        true
    }

    /// Record that `check` could not be resolved. The owner flag stays
    /// cleared and the next event for the same account retries the check.
    pub fn owner_check_failed(&self, check: OwnerCheck) {
        let mut inner = self.inner.write();
        if inner.session.account == Some(check.address) {
            inner.owner_check_failed = true;
        }
    }

    /// Fold a provider account-change event into the session. Re-applying
    /// the same list is a no-op unless the last owner check failed; a new
    /// first account always needs an owner check.
    pub fn apply_accounts(&self, accounts: &[Address]) -> Option<OwnerCheck> {
        let Some(first) = accounts.first().copied() else {
            self.set_disconnected();
            return None;
        };

        let mut inner = self.inner.write();
        if inner.session.account == Some(first) {
            if !inner.owner_check_failed {
                return None;
            }
            inner.owner_check_failed = false;
            return Some(OwnerCheck { address: first });
        }

        inner.session.account = Some(first);
        inner.session.is_owner = false;
        inner.owner_check_failed = false;
        Some(OwnerCheck { address: first })
    }

    /// Claim the connecting flag. Returns `false` when a connect request is
    /// already waiting on the wallet.
    pub fn begin_connecting(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.session.connecting {
            return false;
        }
        inner.session.connecting = true;
        true
    }

    pub fn finish_connecting(&self) {
        self.inner.write().session.connecting = false;
    }

    /// Claim the processing flag for a new transaction. Returns `false`
    /// without side effects when another transaction holds it.
    pub fn begin_transaction(&self, kind: TransactionKind) -> bool {
        let mut inner = self.inner.write();
        if inner.session.processing {
            return false;
        }
        inner.session.processing = true;
        inner.pending = Some(PendingTransaction {
            kind,
            hash: None,
            state: TransactionState::Submitting,
        });
        true
    }

    pub fn advance_transaction(&self, state: TransactionState, hash: Option<TxHash>) {
        let mut inner = self.inner.write();
        if let Some(pending) = inner.pending.as_mut() {
            pending.state = state;
            if hash.is_some() {
                pending.hash = hash;
            }
        }
    }

    /// Release the processing flag and drop the pending transaction.
    pub fn finish_transaction(&self) {
        let mut inner = self.inner.write();
        inner.session.processing = false;
        inner.pending = None;
    }

    pub fn begin_quantities_refresh(&self) -> QuantitiesTicket {
        let mut inner = self.inner.write();
        inner.quantities_issued += 1;
        QuantitiesTicket {
            generation: inner.quantities_issued,
        }
    }

    /// Publish a quantities pair. Returns `false` (and changes nothing) when
    /// a refresh started later has already been published.
    pub fn set_quantities(&self, ticket: QuantitiesTicket, quantities: ContractQuantities) -> bool {
        let mut inner = self.inner.write();
        if ticket.generation <= inner.quantities_committed {
            log::debug!(
                "Dropping quantities from refresh {}; refresh {} already landed",
                ticket.generation,
                inner.quantities_committed
            );
            return false;
        }
        inner.quantities_committed = ticket.generation;
        inner.quantities = Some(quantities);
        true
    }
}
