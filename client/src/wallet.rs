//! Wallet SDK boundary.
//!
//! The wallet SDK owns connection UI and adapter negotiation. The client only
//! needs its notifications, its current state, and a transport that can
//! answer "which chain" and "which signer".

use async_trait::async_trait;
use ballot_types::{AccountAddress, ChainId};
use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;

/// Account notification as delivered by the wallet SDK.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountEvent {
    pub address: Option<AccountAddress>,
    pub is_connected: bool,
}

impl AccountEvent {
    pub fn connected(address: AccountAddress) -> Self {
        Self {
            address: Some(address),
            is_connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            address: None,
            is_connected: false,
        }
    }

    /// The connected address, if the event describes a usable connection.
    pub fn connected_address(&self) -> Option<&AccountAddress> {
        match (&self.address, self.is_connected) {
            (Some(address), true) => Some(address),
            _ => None,
        }
    }
}

/// Network notification as delivered by the wallet SDK.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkEvent {
    pub chain_id: ChainId,
}

/// Snapshot of the wallet SDK's own state (`getState`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalletState {
    pub selected_network: Option<ChainId>,
}

pub type AccountHandler = Arc<dyn Fn(AccountEvent) + Send + Sync>;
pub type NetworkHandler = Arc<dyn Fn(NetworkEvent) + Send + Sync>;

/// Unregister capability returned by every handler registration.
///
/// The handler is removed when [`Subscription::unsubscribe`] is called or
/// the subscription is dropped, whichever comes first.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Authorized transport to the wallet (`getWalletProvider`).
#[async_trait]
pub trait WalletTransport: Send + Sync {
    /// The chain the wallet is attached to right now.
    async fn chain_id(&self) -> Result<ChainId, TransportError>;

    /// The account that will sign transactions.
    async fn signer_address(&self) -> Result<AccountAddress, TransportError>;
}

/// The wallet SDK collaborator.
pub trait WalletSdk: Send + Sync {
    fn subscribe_account(&self, handler: AccountHandler) -> Subscription;

    fn subscribe_network(&self, handler: NetworkHandler) -> Subscription;

    /// `None` when no wallet has been connected yet.
    fn wallet_transport(&self) -> Option<Arc<dyn WalletTransport>>;

    /// Address the SDK currently reports as connected (`getAddress`).
    fn address(&self) -> Option<AccountAddress>;

    fn state(&self) -> WalletState;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscription_runs_unsubscribe_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        {
            let _sub = Subscription::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnected_event_has_no_address() {
        assert!(AccountEvent::disconnected().connected_address().is_none());
        let stale = AccountEvent {
            address: AccountAddress::parse("0x00000000000000000000000000000000000000aa").ok(),
            is_connected: false,
        };
        assert!(stale.connected_address().is_none());
    }
}
