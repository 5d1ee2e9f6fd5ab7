//! Property-based tests for the session state machine.
//!
//! Whatever order wallet events arrive in, and whatever order the binds they
//! start happen to finish in, the controller must end up describing the
//! wallet's final account and network, never an intermediate one.

use std::sync::Arc;

use proptest::prelude::*;

use ballot_client::{
    AccountEvent, BindAttempt, BindOutcome, ChainBinder, ClientConfig, DeployedArtifacts,
    NetworkEvent, SessionController, SessionState, WalletEvent, WalletSdk,
};
use ballot_nullables::{NullLedger, NullWallet};
use ballot_types::{AccountAddress, ChainId};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const CHAINS: [u64; 3] = [1, 5, 1337];
const DEPLOYED: [u64; 2] = [1, 5];

#[derive(Clone, Debug)]
enum Op {
    Connect(u8),
    Disconnect,
    Switch(u64),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u8..=3).prop_map(Op::Connect),
        1 => Just(Op::Disconnect),
        3 => prop::sample::select(CHAINS.to_vec()).prop_map(Op::Switch),
    ]
}

fn account(last: u8) -> AccountAddress {
    AccountAddress::parse(&format!("0x{}{:02x}", "cd".repeat(19), last)).expect("valid address")
}

fn controller(wallet: &NullWallet) -> Arc<SessionController> {
    let contract = account(0xff);
    let artifacts = DeployedArtifacts::new(
        serde_json::json!([]),
        DEPLOYED.map(|c| (ChainId::new(c), contract.clone())),
    );
    let binder = ChainBinder::new(artifacts, Arc::new(NullLedger::new()));
    SessionController::new(Arc::new(wallet.clone()), binder, &ClientConfig::default())
}

/// Apply `op` to the wallet, then hand the resulting notification to the
/// controller.
fn apply(wallet: &NullWallet, ctl: &Arc<SessionController>, op: &Op) -> Option<BindAttempt> {
    let event = match op {
        Op::Connect(n) => {
            wallet.connect(account(*n));
            WalletEvent::Account(AccountEvent::connected(account(*n)))
        }
        Op::Disconnect => {
            wallet.disconnect();
            WalletEvent::Account(AccountEvent::disconnected())
        }
        Op::Switch(chain) => {
            let chain_id = ChainId::new(*chain);
            wallet.set_network_silently(chain_id);
            WalletEvent::Network(NetworkEvent { chain_id })
        }
    };
    ctl.handle_event(event)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn final_state_tracks_the_wallet(
        ops in prop::collection::vec(arb_op(), 1..12),
        reverse in any::<bool>(),
    ) {
        let wallet = NullWallet::new();
        wallet.set_network_silently(ChainId::MAINNET);
        let ctl = controller(&wallet);

        let mut attempts: Vec<BindAttempt> =
            ops.iter().filter_map(|op| apply(&wallet, &ctl, op)).collect();
        if reverse {
            attempts.reverse();
        }
        let latest = ctl.generation();

        let outcomes: Vec<(u64, BindOutcome)> = runtime().block_on(async {
            let mut outcomes = Vec::new();
            for attempt in attempts {
                let generation = attempt.generation();
                outcomes.push((generation, attempt.await));
            }
            outcomes
        });

        for (generation, outcome) in &outcomes {
            if *generation != latest {
                prop_assert_eq!(outcome, &BindOutcome::Stale);
            }
        }

        let chain = wallet.state().selected_network;
        match (wallet.address(), chain) {
            (None, _) => {
                prop_assert!(matches!(ctl.state(), SessionState::Disconnected));
            }
            (Some(address), Some(chain)) if DEPLOYED.contains(&chain.as_u64()) => {
                let session = ctl.session();
                prop_assert!(session.is_some(), "expected bound, got {:?}", ctl.state());
                let session = session.expect("checked above");
                prop_assert_eq!(&session.account, &address);
                prop_assert_eq!(session.chain_id, chain);
                prop_assert_eq!(session.binding.signer(), &address);
            }
            (Some(address), Some(chain)) => {
                let unsupported = matches!(
                    ctl.state(),
                    SessionState::Unsupported { account, chain_id }
                        if account == address && chain_id == chain
                );
                prop_assert!(unsupported, "expected unsupported, got {:?}", ctl.state());
            }
            (Some(_), None) => unreachable!("a network is always selected"),
        }
        prop_assert_eq!(ctl.view().status, ctl.state().status());
    }

    #[test]
    fn generation_never_decreases(ops in prop::collection::vec(arb_op(), 1..20)) {
        let wallet = NullWallet::new();
        wallet.set_network_silently(ChainId::MAINNET);
        let ctl = controller(&wallet);

        let mut last = ctl.generation();
        for op in &ops {
            drop(apply(&wallet, &ctl, op));
            let now = ctl.generation();
            prop_assert!(now >= last);
            last = now;
        }
    }
}
