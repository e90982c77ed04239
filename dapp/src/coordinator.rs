//! Lifecycle driver for deposit and withdraw transactions.
//!
//! `Idle → Submitting → AwaitingConfirmation → Confirmed | Failed → Idle`.
//! Both kinds share the session's processing flag, so at most one
//! transaction of either kind is in flight. The return to idle runs on every
//! exit path, including when the driving future is dropped mid-flight.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blockchain::TxHash;
use crate::contract::{TransactionHandle, TransactionKind, WithdrawalContract};
use crate::errors::DappResult;
use crate::notifications::{NotificationKind, NotificationSink};
use crate::provider::SigningProvider;
use crate::session::{SessionState, TransactionState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "hash", rename_all = "camelCase")]
pub enum TransactionOutcome {
    /// Another transaction held the processing flag; nothing was sent.
    Ignored,
    Confirmed(TxHash),
    Failed,
}

struct Messages {
    submitted: &'static str,
    success: &'static str,
    failed: &'static str,
}

fn messages(kind: TransactionKind) -> Messages {
    match kind {
        TransactionKind::Deposit => Messages {
            submitted: "Transaction sent! Waiting for confirmation...",
            success: "Deposit successful!",
            failed: "Failed to deposit. Please try again.",
        },
        TransactionKind::Withdraw => Messages {
            submitted: "Withdrawal transaction sent! Waiting for confirmation...",
            success: "Withdrawal successful!",
            failed: "Failed to withdraw. Please try again.",
        },
    }
}

/// Releases the processing flag when dropped.
struct ProcessingGuard<'a> {
    session: &'a SessionState,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.session.finish_transaction();
    }
}

pub struct TransactionCoordinator<P: SigningProvider> {
    contract: Arc<WithdrawalContract<P>>,
    session: SessionState,
    notifications: NotificationSink,
}

impl<P: SigningProvider> TransactionCoordinator<P> {
    pub fn new(
        contract: Arc<WithdrawalContract<P>>,
        session: SessionState,
        notifications: NotificationSink,
    ) -> Self {
        Self {
            contract,
            session,
            notifications,
        }
    }

    pub async fn deposit(&self, amount: &str) -> TransactionOutcome {
        self.run(TransactionKind::Deposit, || self.contract.submit_deposit(amount)).await
    }

    pub async fn withdraw(&self) -> TransactionOutcome {
        self.run(TransactionKind::Withdraw, || self.contract.submit_withdraw()).await
    }

    /// Read both contract quantities and publish them together. A refresh
    /// overtaken by a newer one that already landed is dropped.
    pub async fn refresh_quantities(&self) -> DappResult<()> {
        let ticket = self.session.begin_quantities_refresh();
        let quantities = self.contract.read_quantities().await?;
        self.session.set_quantities(ticket, quantities);
        Ok(())
    }

    async fn run<F, Fut>(&self, kind: TransactionKind, submit: F) -> TransactionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DappResult<TransactionHandle<P>>>,
    {
        if !self.session.begin_transaction(kind) {
            log::debug!("Ignoring {} request while another transaction is processing", kind);
            return TransactionOutcome::Ignored;
        }
        let _guard = ProcessingGuard {
            session: &self.session,
        };
        let messages = messages(kind);
        self.notifications.clear();

        match self.drive(kind, &messages, submit).await {
            Ok(hash) => TransactionOutcome::Confirmed(hash),
            Err(err) => {
                if err.is_recoverable() {
                    log::error!("{} failed [{}]: {}", kind, err.kind(), err);
                } else {
                    log::error!("{} failed, not retryable [{}]: {}", kind, err.kind(), err);
                }
                self.session.advance_transaction(TransactionState::Failed, None);
                self.notifications.notify(messages.failed, NotificationKind::Error);
                TransactionOutcome::Failed
            }
        }
    }

    async fn drive<F, Fut>(
        &self,
        kind: TransactionKind,
        messages: &Messages,
        submit: F,
    ) -> DappResult<TxHash>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DappResult<TransactionHandle<P>>>,
    {
        let handle = submit().await?;
        let hash = handle.hash();
        self.session.advance_transaction(TransactionState::Pending, Some(hash));
        self.notifications.notify(messages.submitted, NotificationKind::Success);

        let receipt = handle.wait().await?;
        log::info!("{} {} confirmed in block {:?}", kind, hash, receipt.block_number);
        self.session.advance_transaction(TransactionState::Confirmed, None);
        self.notifications.notify(messages.success, NotificationKind::Success);

        if let Err(err) = self.refresh_quantities().await {
            log::warn!("Quantities refresh after {} failed: {}", kind, err);
        }
        Ok(hash)
    }
}
