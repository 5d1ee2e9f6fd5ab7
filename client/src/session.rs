//! Session controller: keeps wallet connection, chain binding and the
//! published view consistent while the wallet changes underneath.
//!
//! ```text
//! Disconnected --walletConnected--> Connecting
//! Connecting   --bindSucceeded----> Bound
//! Connecting   --bindFailed-------> Unsupported      (no deployment)
//! Connecting   --bindFailed-------> Disconnected     (transport)
//! Bound | Unsupported --accountChanged / networkChanged--> Connecting
//! any          --walletDisconnected--> Disconnected
//! ```
//!
//! Transitions are applied synchronously, in delivery order. Each bind runs
//! as its own task so that a newer event can be applied while an older
//! attempt is still waiting on the wallet. Every transition that starts a
//! bind or disconnects bumps a generation counter; bind and refresh results
//! from an older generation are dropped on arrival.

use ballot_types::{
    AccountAddress, CandidateId, ChainId, ErrorKind, TxReceipt, VoteReceipt, VotingWindow,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::binding::{ChainBinder, ChainBinding};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::view::{Status, VotingView};
use crate::wallet::{AccountEvent, NetworkEvent, Subscription, WalletSdk};
use crate::workflow::{ReadState, VotingWorkflow};

/// A wallet notification, queued in delivery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    Account(AccountEvent),
    Network(NetworkEvent),
}

/// An account + network with a valid binding.
#[derive(Clone, Debug)]
pub struct Session {
    pub account: AccountAddress,
    pub chain_id: ChainId,
    pub binding: ChainBinding,
}

#[derive(Clone, Debug)]
pub enum SessionState {
    Disconnected,
    /// Waiting for a bind; `chain_id` is `None` until the wallet reports one.
    Connecting {
        account: AccountAddress,
        chain_id: Option<ChainId>,
    },
    Bound(Session),
    Unsupported {
        account: AccountAddress,
        chain_id: ChainId,
    },
}

impl SessionState {
    pub fn status(&self) -> Status {
        match self {
            Self::Disconnected => Status::Disconnected,
            Self::Connecting { .. } => Status::Connecting,
            Self::Bound(_) => Status::Bound,
            Self::Unsupported { .. } => Status::Unsupported,
        }
    }

    pub fn account(&self) -> Option<&AccountAddress> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { account, .. } | Self::Unsupported { account, .. } => Some(account),
            Self::Bound(session) => Some(&session.account),
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { chain_id, .. } => *chain_id,
            Self::Unsupported { chain_id, .. } => Some(*chain_id),
            Self::Bound(session) => Some(session.chain_id),
        }
    }

    pub fn binding(&self) -> Option<&ChainBinding> {
        match self {
            Self::Bound(session) => Some(&session.binding),
            _ => None,
        }
    }
}

/// How a bind attempt ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,
    Unsupported(ChainId),
    Disconnected(ClientError),
    /// Superseded by a later event; the result was dropped.
    Stale,
}

/// A bind (plus the refresh that follows it) started by a wallet event.
///
/// The event pump spawns these; tests may drive them by hand.
#[must_use = "a bind attempt does nothing unless awaited or spawned"]
pub struct BindAttempt {
    generation: u64,
    fut: BoxFuture<'static, BindOutcome>,
}

impl BindAttempt {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Future for BindAttempt {
    type Output = BindOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<BindOutcome> {
        self.fut.poll_unpin(cx)
    }
}

struct Inner {
    state: SessionState,
    generation: u64,
    last_chain: Option<ChainId>,
    read: ReadState,
    message: Option<String>,
}

struct Subscriptions {
    account: Subscription,
    network: Subscription,
    pump: JoinHandle<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SessionController {
    sdk: Arc<dyn WalletSdk>,
    binder: ChainBinder,
    workflow: VotingWorkflow,
    network_names: HashMap<ChainId, String>,
    inner: Mutex<Inner>,
    subscriptions: Mutex<Option<Subscriptions>>,
    view: watch::Sender<VotingView>,
}

impl SessionController {
    pub fn new(sdk: Arc<dyn WalletSdk>, binder: ChainBinder, config: &ClientConfig) -> Arc<Self> {
        Arc::new(Self {
            sdk,
            binder,
            workflow: VotingWorkflow::new(config.confirmation_timeout()),
            network_names: config
                .networks
                .iter()
                .map(|n| (n.chain_id, n.name.clone()))
                .collect(),
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                generation: 0,
                last_chain: None,
                read: ReadState::default(),
                message: None,
            }),
            subscriptions: Mutex::new(None),
            view: watch::Sender::new(VotingView::disconnected()),
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Subscribe to wallet notifications and start the event pump.
    ///
    /// If the wallet already reports an address and network (page reload
    /// with a persisted wallet session), a connect event is queued before
    /// any live notification. Calling `init` again is a no-op. Must run
    /// inside a Tokio runtime.
    pub fn init(self: &Arc<Self>) {
        let mut subs = lock(&self.subscriptions);
        if subs.is_some() {
            debug!("session controller already initialised");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();

        if let (Some(address), Some(chain_id)) =
            (self.sdk.address(), self.sdk.state().selected_network)
        {
            info!(account = %address, %chain_id, "wallet already connected, restoring session");
            let _ = tx.send(WalletEvent::Account(AccountEvent::connected(address)));
        }

        let account_tx = tx.clone();
        let account = self.sdk.subscribe_account(Arc::new(move |event| {
            let _ = account_tx.send(WalletEvent::Account(event));
        }));
        let network = self.sdk.subscribe_network(Arc::new(move |event| {
            let _ = tx.send(WalletEvent::Network(event));
        }));

        let receipts = self.workflow.subscribe_receipts();
        let pump = tokio::spawn(Arc::clone(self).pump(rx, receipts));

        *subs = Some(Subscriptions {
            account,
            network,
            pump,
        });
        info!("session controller initialised");
    }

    /// Unregister wallet handlers, stop the pump and drop the session.
    pub fn teardown(&self) {
        let subs = lock(&self.subscriptions).take();
        if let Some(subs) = subs {
            subs.account.unsubscribe();
            subs.network.unsubscribe();
            subs.pump.abort();
            info!("session controller torn down");
        }
        let mut inner = lock(&self.inner);
        self.enter_disconnected(&mut inner, None);
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.subscriptions).is_some()
    }

    async fn pump(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<WalletEvent>,
        mut receipts: watch::Receiver<Option<VoteReceipt>>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if let Some(attempt) = self.handle_event(event) {
                            tokio::spawn(attempt);
                        }
                    }
                    None => break,
                },
                changed = receipts.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.republish();
                }
            }
        }
        debug!("session event pump stopped");
    }

    // ── Transitions ────────────────────────────────────────────────────

    /// Apply one wallet event. Returns the bind attempt it started, if any.
    pub fn handle_event(self: &Arc<Self>, event: WalletEvent) -> Option<BindAttempt> {
        let mut inner = lock(&self.inner);
        match event {
            WalletEvent::Account(event) => match event.connected_address() {
                None => {
                    if !matches!(inner.state, SessionState::Disconnected) {
                        info!("wallet disconnected");
                    }
                    self.enter_disconnected(&mut inner, None);
                    None
                }
                Some(address) => {
                    let chain = self.sdk.state().selected_network.or(inner.last_chain);
                    if Self::is_current(&inner.state, address, chain) {
                        debug!(account = %address, "account unchanged");
                        return None;
                    }
                    info!(account = %address, "account changed");
                    self.begin_connecting(&mut inner, address.clone(), chain)
                }
            },
            WalletEvent::Network(NetworkEvent { chain_id }) => {
                inner.last_chain = Some(chain_id);
                let account = inner.state.account().cloned()?;
                if Self::is_current(&inner.state, &account, Some(chain_id)) {
                    debug!(%chain_id, "network unchanged");
                    return None;
                }
                info!(%chain_id, "network changed");
                self.begin_connecting(&mut inner, account, Some(chain_id))
            }
        }
    }

    fn is_current(state: &SessionState, account: &AccountAddress, chain: Option<ChainId>) -> bool {
        !matches!(state, SessionState::Disconnected)
            && state.account() == Some(account)
            && state.chain_id() == chain
    }

    fn begin_connecting(
        self: &Arc<Self>,
        inner: &mut Inner,
        account: AccountAddress,
        chain_id: Option<ChainId>,
    ) -> Option<BindAttempt> {
        inner.generation += 1;
        let generation = inner.generation;
        inner.state = SessionState::Connecting {
            account,
            chain_id,
        };
        inner.read = ReadState::default();
        inner.message = None;

        let Some(chain_id) = chain_id else {
            debug!("waiting for the wallet to report a network");
            self.publish(inner);
            return None;
        };
        let Some(transport) = self.sdk.wallet_transport() else {
            warn!("no wallet provider available");
            self.enter_disconnected(inner, Some("No wallet provider available".into()));
            return None;
        };
        self.publish(inner);

        let this = Arc::clone(self);
        Some(BindAttempt {
            generation,
            fut: async move {
                let result = this.binder.bind(transport, chain_id).await;
                this.finish_bind(generation, chain_id, result).await
            }
            .boxed(),
        })
    }

    async fn finish_bind(
        &self,
        generation: u64,
        chain_id: ChainId,
        result: Result<ChainBinding, ClientError>,
    ) -> BindOutcome {
        let binding = {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                debug!(generation, current = inner.generation, "discarding stale bind result");
                return BindOutcome::Stale;
            }
            let account = match &inner.state {
                SessionState::Connecting { account, .. } => account.clone(),
                _ => return BindOutcome::Stale,
            };

            match result {
                Ok(binding) if binding.signer() == &account => {
                    inner.state = SessionState::Bound(Session {
                        account,
                        chain_id,
                        binding: binding.clone(),
                    });
                    info!(%chain_id, "session bound");
                    self.publish(&inner);
                    binding
                }
                Ok(binding) => {
                    // The wallet switched accounts mid-bind; its notification follows.
                    debug!(
                        signer = %binding.signer(),
                        expected = %account,
                        "signer moved during bind"
                    );
                    return BindOutcome::Stale;
                }
                Err(ClientError::UnsupportedNetwork(chain)) => {
                    warn!(%chain, "voting contract not deployed on this network");
                    inner.state = SessionState::Unsupported {
                        account,
                        chain_id: chain,
                    };
                    self.publish(&inner);
                    return BindOutcome::Unsupported(chain);
                }
                Err(e) if self.sdk.state().selected_network != Some(chain_id) => {
                    debug!("bind failed after the wallet switched network: {e}");
                    return BindOutcome::Stale;
                }
                Err(e) => {
                    warn!("failed to bind contract: {e}");
                    self.enter_disconnected(&mut inner, Some(e.to_string()));
                    return BindOutcome::Disconnected(e);
                }
            }
        };

        self.refresh_as(generation, binding).await;
        BindOutcome::Bound
    }

    fn enter_disconnected(&self, inner: &mut Inner, message: Option<String>) {
        inner.generation += 1;
        inner.state = SessionState::Disconnected;
        inner.read = ReadState::default();
        inner.message = message;
        self.publish(inner);
    }

    // ── Read path ──────────────────────────────────────────────────────

    /// Re-read candidates, window and vote status for the current binding.
    pub async fn refresh(&self) {
        let (generation, binding) = self.snapshot();
        if let Some(binding) = binding {
            self.refresh_as(generation, binding).await;
        }
    }

    async fn refresh_as(&self, generation: u64, binding: ChainBinding) {
        let read = self.workflow.read_state(Some(binding)).await;
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "discarding stale read");
            return;
        }
        inner.read = read;
        self.publish(&inner);
    }

    fn snapshot(&self) -> (u64, Option<ChainBinding>) {
        let inner = lock(&self.inner);
        (inner.generation, inner.state.binding().cloned())
    }

    // ── User actions ───────────────────────────────────────────────────

    /// Cast the vote, then refresh on confirmation.
    ///
    /// A bound account whose vote status is not known to be "not voted" is
    /// refused without a ledger call.
    pub async fn cast_vote(
        &self,
        selection: Option<CandidateId>,
    ) -> Result<VoteReceipt, ClientError> {
        let (generation, binding, refused) = {
            let inner = lock(&self.inner);
            let bound = matches!(inner.state, SessionState::Bound(_));
            let refused = match inner.read.has_voted {
                _ if !bound || selection.is_none() => None,
                Some(true) => Some(ClientError::AlreadyVoted),
                Some(false) => None,
                None => Some(ClientError::TransportUnavailable(
                    "vote status unknown, refresh and try again".into(),
                )),
            };
            (inner.generation, inner.state.binding().cloned(), refused)
        };
        let result = match refused {
            Some(e) => {
                debug!("vote refused before submission: {e}");
                Err(e)
            }
            None => self.workflow.cast_vote(binding.clone(), selection).await,
        };
        if result.is_ok() {
            let mut inner = lock(&self.inner);
            if inner.generation == generation {
                inner.read.has_voted = Some(true);
            }
        }
        self.after_write(generation, binding, &result, "Voted successfully!")
            .await;
        result
    }

    /// Add a candidate, then refresh on confirmation.
    pub async fn submit_candidate(
        &self,
        name: &str,
        party: &str,
    ) -> Result<TxReceipt, ClientError> {
        let (generation, binding) = self.snapshot();
        let result = self
            .workflow
            .submit_candidate(binding.clone(), name, party)
            .await;
        self.after_write(generation, binding, &result, "Candidate added successfully!")
            .await;
        result
    }

    /// Set the voting window, then refresh on confirmation.
    pub async fn set_voting_window(
        &self,
        start: &str,
        end: &str,
    ) -> Result<VotingWindow, ClientError> {
        let (generation, binding) = self.snapshot();
        let result = self
            .workflow
            .set_voting_window(binding.clone(), start, end)
            .await;
        self.after_write(generation, binding, &result, "Voting dates set successfully!")
            .await;
        result
    }

    async fn after_write<T>(
        &self,
        generation: u64,
        binding: Option<ChainBinding>,
        result: &Result<T, ClientError>,
        success: &str,
    ) {
        let message = match result {
            Ok(_) => success.to_string(),
            Err(e) => user_message(e),
        };
        {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                debug!("session changed while the write was in flight");
                return;
            }
            inner.message = Some(message);
            self.publish(&inner);
        }
        if let (Ok(_), Some(binding)) = (result, binding) {
            self.refresh_as(generation, binding).await;
        }
    }

    // ── Observation ────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state.clone()
    }

    pub fn session(&self) -> Option<Session> {
        match &lock(&self.inner).state {
            SessionState::Bound(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        lock(&self.inner).generation
    }

    pub fn workflow(&self) -> &VotingWorkflow {
        &self.workflow
    }

    /// The latest view.
    pub fn view(&self) -> VotingView {
        self.view.borrow().clone()
    }

    /// Receive every republished view.
    pub fn subscribe_view(&self) -> watch::Receiver<VotingView> {
        self.view.subscribe()
    }

    fn republish(&self) {
        let inner = lock(&self.inner);
        self.publish(&inner);
    }

    fn publish(&self, inner: &Inner) {
        let status = inner.state.status();
        let chain_id = inner.state.chain_id();
        let vote_pending = self.workflow.vote_pending();
        let bound = status == Status::Bound;
        let view = VotingView {
            status,
            account: inner.state.account().cloned(),
            chain_id,
            network_name: chain_id.and_then(|c| {
                self.network_names
                    .get(&c)
                    .cloned()
                    .or_else(|| c.well_known_name().map(str::to_string))
            }),
            candidates: inner.read.candidates.clone(),
            window: inner.read.window,
            has_voted: if bound { inner.read.has_voted } else { None },
            vote_enabled: bound && inner.read.has_voted == Some(false) && !vote_pending,
            message: if vote_pending {
                Some("Processing your vote...".to_string())
            } else {
                inner.message.clone()
            },
        };
        self.view.send_replace(view);
    }
}

/// Message shown for a failed action. Ledger rejections are shown verbatim.
fn user_message(e: &ClientError) -> String {
    match e.kind() {
        ErrorKind::LedgerRejected => format!("Error: {e}"),
        kind => format!("{e} ({})", kind.hint()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_rejection_is_shown_verbatim() {
        let e = ClientError::LedgerRejected("execution reverted: voting closed".into());
        assert_eq!(user_message(&e), "Error: execution reverted: voting closed");
    }

    #[test]
    fn other_errors_carry_a_hint() {
        assert_eq!(
            user_message(&ClientError::NoSelection),
            "please vote for a candidate (select a candidate)"
        );
    }

    #[test]
    fn disconnected_state_has_nothing() {
        let state = SessionState::Disconnected;
        assert_eq!(state.status(), Status::Disconnected);
        assert!(state.account().is_none());
        assert!(state.chain_id().is_none());
        assert!(state.binding().is_none());
    }
}
