//! Nullable wallet SDK that emits account and network changes on demand.

use async_trait::async_trait;
use ballot_client::{
    AccountEvent, AccountHandler, NetworkEvent, NetworkHandler, Subscription, TransportError,
    WalletSdk, WalletState, WalletTransport,
};
use ballot_types::{AccountAddress, ChainId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

struct Inner {
    account: Mutex<Option<AccountAddress>>,
    chain: Mutex<Option<ChainId>>,
    reachable: AtomicBool,
    provider_available: AtomicBool,
    account_handlers: Mutex<HashMap<u64, AccountHandler>>,
    network_handlers: Mutex<HashMap<u64, NetworkHandler>>,
    next_id: AtomicU64,
    /// `Some` while network reads are being held back.
    held: Mutex<Option<Vec<(ChainId, oneshot::Sender<()>)>>>,
    network_reads: AtomicUsize,
}

/// A test wallet SDK that is also its own transport.
///
/// Handlers run synchronously inside [`NullWallet::connect`],
/// [`NullWallet::switch_network`] and [`NullWallet::disconnect`], like SDK
/// callbacks do.
#[derive(Clone)]
pub struct NullWallet {
    inner: Arc<Inner>,
}

impl NullWallet {
    /// A wallet with nothing connected.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                account: Mutex::new(None),
                chain: Mutex::new(None),
                reachable: AtomicBool::new(true),
                provider_available: AtomicBool::new(true),
                account_handlers: Mutex::new(HashMap::new()),
                network_handlers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                held: Mutex::new(None),
                network_reads: AtomicUsize::new(0),
            }),
        }
    }

    /// A wallet that is already connected (persisted session), without
    /// emitting anything.
    pub fn already_connected(account: AccountAddress, chain: ChainId) -> Self {
        let wallet = Self::new();
        *wallet.inner.account.lock().unwrap() = Some(account);
        *wallet.inner.chain.lock().unwrap() = Some(chain);
        wallet
    }

    /// Set the network without emitting.
    pub fn set_network_silently(&self, chain: ChainId) {
        *self.inner.chain.lock().unwrap() = Some(chain);
    }

    /// Connect (or switch to) `account` and notify account handlers.
    pub fn connect(&self, account: AccountAddress) {
        *self.inner.account.lock().unwrap() = Some(account.clone());
        self.emit_account(AccountEvent::connected(account));
    }

    /// Disconnect and notify account handlers.
    pub fn disconnect(&self) {
        *self.inner.account.lock().unwrap() = None;
        self.emit_account(AccountEvent::disconnected());
    }

    /// Move to `chain` and notify network handlers.
    pub fn switch_network(&self, chain: ChainId) {
        *self.inner.chain.lock().unwrap() = Some(chain);
        let handlers: Vec<NetworkHandler> = self
            .inner
            .network_handlers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            handler(NetworkEvent { chain_id: chain });
        }
    }

    fn emit_account(&self, event: AccountEvent) {
        let handlers: Vec<AccountHandler> = self
            .inner
            .account_handlers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            handler(event.clone());
        }
    }

    /// When unreachable, every transport call fails.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// When unavailable, `wallet_transport()` returns `None`.
    pub fn set_provider_available(&self, available: bool) {
        self.inner.provider_available.store(available, Ordering::SeqCst);
    }

    /// Make every following network read wait until released.
    pub fn hold_network_reads(&self) {
        let mut held = self.inner.held.lock().unwrap();
        if held.is_none() {
            *held = Some(Vec::new());
        }
    }

    /// Release the oldest held read that was made while on `chain`.
    /// Returns `false` if there is none.
    pub fn release_network_read(&self, chain: ChainId) -> bool {
        let mut held = self.inner.held.lock().unwrap();
        let Some(waiting) = held.as_mut() else {
            return false;
        };
        match waiting.iter().position(|(c, _)| *c == chain) {
            Some(pos) => {
                let (_, tx) = waiting.remove(pos);
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Release everything and stop holding.
    pub fn release_all(&self) {
        if let Some(waiting) = self.inner.held.lock().unwrap().take() {
            for (_, tx) in waiting {
                let _ = tx.send(());
            }
        }
    }

    /// Number of network reads currently held.
    pub fn held_reads(&self) -> usize {
        self.inner
            .held
            .lock()
            .unwrap()
            .as_ref()
            .map_or(0, Vec::len)
    }

    /// Total network-identity reads served.
    pub fn network_reads(&self) -> usize {
        self.inner.network_reads.load(Ordering::SeqCst)
    }

    pub fn account_handler_count(&self) -> usize {
        self.inner.account_handlers.lock().unwrap().len()
    }

    pub fn network_handler_count(&self) -> usize {
        self.inner.network_handlers.lock().unwrap().len()
    }

    fn check_reachable(&self) -> Result<(), TransportError> {
        if self.inner.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }
}

impl Default for NullWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletSdk for NullWallet {
    fn subscribe_account(&self, handler: AccountHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.account_handlers.lock().unwrap().insert(id, handler);
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner.account_handlers.lock().unwrap().remove(&id);
        })
    }

    fn subscribe_network(&self, handler: NetworkHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.network_handlers.lock().unwrap().insert(id, handler);
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            inner.network_handlers.lock().unwrap().remove(&id);
        })
    }

    fn wallet_transport(&self) -> Option<Arc<dyn WalletTransport>> {
        if self.inner.provider_available.load(Ordering::SeqCst) {
            Some(Arc::new(self.clone()) as Arc<dyn WalletTransport>)
        } else {
            None
        }
    }

    fn address(&self) -> Option<AccountAddress> {
        self.inner.account.lock().unwrap().clone()
    }

    fn state(&self) -> WalletState {
        WalletState {
            selected_network: *self.inner.chain.lock().unwrap(),
        }
    }
}

#[async_trait]
impl WalletTransport for NullWallet {
    async fn chain_id(&self) -> Result<ChainId, TransportError> {
        self.check_reachable()?;
        self.inner.network_reads.fetch_add(1, Ordering::SeqCst);
        let chain = (*self.inner.chain.lock().unwrap())
            .ok_or_else(|| TransportError::Request("no network selected".into()))?;

        let gate = {
            let mut held = self.inner.held.lock().unwrap();
            held.as_mut().map(|waiting| {
                let (tx, rx) = oneshot::channel();
                waiting.push((chain, tx));
                rx
            })
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        Ok(chain)
    }

    async fn signer_address(&self) -> Result<AccountAddress, TransportError> {
        self.check_reachable()?;
        self.inner
            .account
            .lock()
            .unwrap()
            .clone()
            .ok_or(TransportError::Locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> AccountAddress {
        AccountAddress::parse(&format!("0x{}{:02x}", "00".repeat(19), last)).unwrap()
    }

    #[test]
    fn handlers_receive_events_until_unsubscribed() {
        let wallet = NullWallet::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let sub = wallet.subscribe_account(Arc::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));
        wallet.connect(addr(1));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        assert_eq!(wallet.account_handler_count(), 0);
        wallet.connect(addr(2));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn held_read_waits_for_release() {
        let wallet = NullWallet::already_connected(addr(1), ChainId::new(5));
        wallet.hold_network_reads();

        let reader = wallet.clone();
        let task = tokio::spawn(async move { reader.chain_id().await });
        while wallet.held_reads() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(wallet.release_network_read(ChainId::new(5)));
        assert_eq!(task.await.unwrap(), Ok(ChainId::new(5)));
    }

    #[tokio::test]
    async fn unreachable_wallet_fails_transport_calls() {
        let wallet = NullWallet::already_connected(addr(1), ChainId::new(5));
        wallet.set_reachable(false);
        assert_eq!(wallet.chain_id().await, Err(TransportError::Disconnected));
        assert_eq!(wallet.signer_address().await, Err(TransportError::Disconnected));
    }
}
