use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use crate::blockchain::{Address, AddressExt};
use crate::config_store::DappConfig;
use crate::contract::{ContractQuantities, WithdrawalContract};
use crate::coordinator::{TransactionCoordinator, TransactionOutcome};
use crate::errors::{DappError, DappResult};
use crate::notifications::{ExpiryScheduler, Notification, NotificationKind, NotificationSink};
use crate::provider::{AccountsHandler, ListenerId, LocalFuture, ProviderGateway, SigningProvider};
use crate::session::{OwnerCheck, PendingTransaction, Session, SessionState};

const CONNECTED_MESSAGE: &str = "Wallet connected successfully!";
const CONNECT_FAILED_MESSAGE: &str = "Failed to connect wallet. Please try again.";

/// Everything the page renders, read at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session: Session,
    pub quantities: Option<ContractQuantities>,
    pub pending: Option<PendingTransaction>,
    pub notification: Option<Notification>,
    pub connected: bool,
    /// UI hint only; the contract enforces ownership on-chain.
    pub can_withdraw: bool,
    pub can_deposit: bool,
}

/// Clears the connecting flag when dropped.
struct ConnectingGuard<'a> {
    session: &'a SessionState,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.session.finish_connecting();
    }
}

/// Page-level application context: one gateway, contract, session and
/// notification sink, plus the actions the UI triggers.
pub struct DappContext<P: SigningProvider + 'static> {
    config: DappConfig,
    gateway: Arc<ProviderGateway<P>>,
    contract: Arc<WithdrawalContract<P>>,
    session: SessionState,
    notifications: NotificationSink,
    coordinator: TransactionCoordinator<P>,
}

impl<P: SigningProvider + 'static> DappContext<P> {
    pub fn new(
        config: DappConfig,
        provider: Option<Arc<P>>,
        scheduler: Option<ExpiryScheduler>,
    ) -> DappResult<Arc<Self>> {
        config.validate()?;

        let gateway = Arc::new(ProviderGateway::new(provider));
        let contract = Arc::new(WithdrawalContract::new(
            config.contract_address()?,
            config.contract_interface()?,
            Arc::clone(&gateway),
        )?);

        let session = SessionState::new();
        let mut notifications = NotificationSink::new(config.notification_lifetime());
        if let Some(scheduler) = scheduler {
            notifications = notifications.with_scheduler(scheduler);
        }
        let coordinator = TransactionCoordinator::new(
            Arc::clone(&contract),
            session.clone(),
            notifications.clone(),
        );

        log::info!(
            "Dapp context ready for {} on {} (chain {})",
            contract.address(),
            config.network.chain_name,
            config.network.chain_id
        );

        Ok(Arc::new(Self {
            config,
            gateway,
            contract,
            session,
            notifications,
            coordinator,
        }))
    }

    pub fn config(&self) -> &DappConfig {
        &self.config
    }

    pub fn gateway(&self) -> &ProviderGateway<P> {
        &self.gateway
    }

    pub fn contract(&self) -> &WithdrawalContract<P> {
        &self.contract
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn notifications(&self) -> &NotificationSink {
        &self.notifications
    }

    /// Page load: pick up an already-authorized account, read the contract
    /// quantities and start listening for account switches. Without a
    /// provider this is a no-op.
    pub async fn initialize(self: &Arc<Self>) -> DappResult<()> {
        if !self.gateway.has_provider() {
            log::warn!("No Ethereum provider injected; wallet actions are unavailable");
            return Ok(());
        }

        match self.gateway.current_accounts().await {
            Ok(accounts) => self.handle_accounts_changed(accounts).await,
            Err(err) => log::error!("Reading authorized accounts failed: {}", err),
        }

        if let Err(err) = self.refresh_quantities().await {
            log::error!("Initial quantities refresh failed: {}", err);
        }

        self.start_listening()?;
        Ok(())
    }

    /// Register the account-change listener. The handler holds only a weak
    /// reference, so the registration does not keep the context alive.
    pub fn start_listening(self: &Arc<Self>) -> DappResult<ListenerId> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handler: AccountsHandler =
            Arc::new(move |accounts: Vec<Address>| -> LocalFuture<'static, ()> {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(context) = weak.upgrade() {
                        context.handle_accounts_changed(accounts).await;
                    }
                })
            });
        self.gateway.on_accounts_changed(handler)
    }

    /// Release the account-change listener.
    pub fn teardown(&self) {
        self.gateway.release_accounts_listener();
    }

    /// Connect action. The outcome is also reported as a notification.
    /// While one request is waiting on the wallet, further calls fail with
    /// [`DappError::ConnectInProgress`] and never reach the provider.
    pub async fn connect(&self) -> DappResult<Address> {
        if !self.session.begin_connecting() {
            log::debug!("Ignoring connect request while another is pending");
            return Err(DappError::ConnectInProgress);
        }

        let result = {
            let _guard = ConnectingGuard {
                session: &self.session,
            };
            self.notifications.clear();
            self.gateway.connect().await
        };

        match result {
            Ok(address) => {
                let check = self.session.set_connected(address);
                self.notifications.notify(CONNECTED_MESSAGE, NotificationKind::Success);
                self.refresh_owner(check).await;
                Ok(address)
            }
            Err(err) => {
                log::error!("Wallet connection failed [{}]: {}", err.kind(), err);
                self.notifications.notify(CONNECT_FAILED_MESSAGE, NotificationKind::Error);
                Err(err)
            }
        }
    }

    /// Apply an account-change event and re-check ownership if the account
    /// changed or its last owner check failed.
    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        match self.session.apply_accounts(&accounts) {
            Some(check) => {
                log::info!("Active account is now {}", check.address().short());
                self.refresh_owner(check).await;
            }
            None if accounts.is_empty() => log::info!("Wallet disconnected"),
            None => {}
        }
    }

    /// Resolve an owner check against the contract. Failures leave the flag
    /// cleared and mark the check for retry; results for a superseded
    /// account are discarded.
    pub async fn refresh_owner(&self, check: OwnerCheck) {
        match self.contract.read_owner().await {
            Ok(owner) => {
                let is_owner = owner == check.address();
                if self.session.set_owner_flag(check, is_owner) && is_owner {
                    log::info!("Connected account is the contract owner");
                }
            }
            Err(err) => {
                log::error!("Owner check for {} failed: {}", check.address(), err);
                self.session.owner_check_failed(check);
            }
        }
    }

    pub async fn refresh_quantities(&self) -> DappResult<()> {
        self.coordinator.refresh_quantities().await
    }

    pub async fn deposit(&self, amount: &str) -> TransactionOutcome {
        self.coordinator.deposit(amount).await
    }

    pub async fn withdraw(&self) -> TransactionOutcome {
        self.coordinator.withdraw().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (session, quantities, pending) = self.session.read_all();
        let connected = session.account.is_some();
        SessionSnapshot {
            can_withdraw: connected && session.is_owner && !session.processing,
            can_deposit: connected && !session.processing,
            connected,
            notification: self.notifications.current(),
            session,
            quantities,
            pending,
        }
    }

    /// Explorer link for the connected account, if any.
    pub fn account_explorer_url(&self) -> DappResult<String> {
        let account = self.session.account().ok_or(DappError::NoSigner)?;
        Ok(self.config.explorer_address_url(&account))
    }
}

impl<P: SigningProvider + 'static> Drop for DappContext<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}
