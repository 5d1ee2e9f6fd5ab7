//! Ballot client core.
//!
//! Keeps a wallet connection, a chain-specific contract binding and the
//! rendered voting view consistent while the wallet's account or network
//! changes underneath, and submits at most one vote at a time:
//! - Deployed-artifacts table (chain id → contract address + ABI)
//! - Chain binding (transport, signer, contract handle)
//! - Session state machine with stale-result suppression
//! - Voting workflow (candidate list, window, vote status, writes)
//! - JSON-RPC gateway client for headless use

pub mod artifacts;
pub mod binding;
pub mod config;
pub mod contract;
pub mod error;
pub mod gateway;
pub mod session;
pub mod view;
pub mod wallet;
pub mod workflow;

pub use artifacts::{DeployedArtifacts, Deployment};
pub use binding::{ChainBinder, ChainBinding};
pub use config::{AppMetadata, ClientConfig, NetworkInfo};
pub use contract::{Abi, ContractConnector, PendingTx, VotingContract};
pub use error::{ClientError, LedgerError, TransportError};
pub use gateway::{GatewayClient, GatewayWallet};
pub use session::{
    BindAttempt, BindOutcome, Session, SessionController, SessionState, WalletEvent,
};
pub use view::{Status, VotingView};
pub use wallet::{
    AccountEvent, AccountHandler, NetworkEvent, NetworkHandler, Subscription, WalletSdk,
    WalletState, WalletTransport,
};
pub use workflow::{ReadState, VotingWorkflow, MAX_CANDIDATES};
