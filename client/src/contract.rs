//! Ledger boundary: the voting contract's observable RPC surface.

use async_trait::async_trait;
use ballot_types::{AccountAddress, Candidate, CandidateId, TxReceipt, VotingWindow};
use std::sync::Arc;

use crate::error::LedgerError;
use crate::wallet::WalletTransport;

/// Contract ABI as shipped in the build artifacts.
pub type Abi = Arc<serde_json::Value>;

/// A submitted transaction that can be waited on.
#[async_trait]
pub trait PendingTx: Send {
    fn tx_hash(&self) -> &str;

    /// Wait until the ledger includes the transaction. A revert is an `Err`.
    async fn wait(self: Box<Self>) -> Result<TxReceipt, LedgerError>;
}

/// The deployed voting contract, bound to one signer.
#[async_trait]
pub trait VotingContract: Send + Sync {
    async fn get_count_candidates(&self) -> Result<u64, LedgerError>;

    async fn get_candidate(&self, id: CandidateId) -> Result<Candidate, LedgerError>;

    async fn add_candidate(&self, name: &str, party: &str)
        -> Result<Box<dyn PendingTx>, LedgerError>;

    async fn set_dates(&self, start: u64, end: u64) -> Result<Box<dyn PendingTx>, LedgerError>;

    async fn get_dates(&self) -> Result<VotingWindow, LedgerError>;

    /// Whether the bound signer has already voted.
    async fn check_vote(&self) -> Result<bool, LedgerError>;

    async fn vote(&self, candidate: CandidateId) -> Result<Box<dyn PendingTx>, LedgerError>;
}

/// Builds contract handles (`new Contract(address, abi, signer)`).
///
/// Construction is local; no ledger call is made.
pub trait ContractConnector: Send + Sync {
    fn connect(
        &self,
        transport: Arc<dyn WalletTransport>,
        address: &AccountAddress,
        abi: &Abi,
        signer: &AccountAddress,
    ) -> Arc<dyn VotingContract>;
}
