//! Transaction and vote receipts.

use serde::{Deserialize, Serialize};

use crate::CandidateId;

/// Local tracking state of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    /// Submitted, waiting for the ledger to include it.
    Pending,
    /// Included and successful.
    Confirmed,
    /// Reverted, rejected by the signer, or otherwise refused.
    Failed,
    /// The confirmation wait gave up; the ledger may still include it.
    Indeterminate,
}

impl TxState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Ephemeral record of the one vote this client has in flight (or just finished).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub candidate_id: CandidateId,
    pub tx_state: TxState,
}

/// Confirmation record for an included transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    #[serde(default)]
    pub block_number: Option<u64>,
}
