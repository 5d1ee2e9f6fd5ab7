//! Candidates as reported by the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger-assigned candidate id. Ids start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(u64);

impl CandidateId {
    /// Returns `None` for 0, which the ledger never assigns.
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate row. Only ever constructed from a ledger read; the client
/// never adjusts `vote_count` itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub vote_count: u64,
}
