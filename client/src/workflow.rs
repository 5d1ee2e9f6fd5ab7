//! User-facing voting operations.
//!
//! Reads never fail: with no binding, or on a ledger error, they return an
//! empty or neutral value and log the problem. Writes follow one protocol:
//! validate locally, submit, wait for the receipt (bounded), and let the
//! caller refresh read state.
//!
//! The workflow never holds on to a [`ChainBinding`]; each call gets the
//! binding that is current at the time of the call.

use ballot_types::{Candidate, CandidateId, TxReceipt, TxState, VoteReceipt, VotingWindow};
use ballot_utils::parse_timestamp;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::binding::ChainBinding;
use crate::contract::PendingTx;
use crate::error::ClientError;

/// Largest candidate count that will be read row by row.
pub const MAX_CANDIDATES: u64 = 10_000;

/// Everything the view needs from the ledger, read in one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadState {
    pub candidates: Vec<Candidate>,
    pub window: Option<VotingWindow>,
    /// `None` when the check could not be made.
    pub has_voted: Option<bool>,
}

pub struct VotingWorkflow {
    confirmation_timeout: Duration,
    vote: watch::Sender<Option<VoteReceipt>>,
}

/// Marks the vote slot as settled when dropped, so a cancelled wait can
/// never leave a `Pending` receipt behind.
struct VoteSlot<'a> {
    slot: &'a watch::Sender<Option<VoteReceipt>>,
    candidate_id: CandidateId,
    settled: bool,
}

impl VoteSlot<'_> {
    fn settle(mut self, tx_state: TxState) -> VoteReceipt {
        self.settled = true;
        let receipt = VoteReceipt {
            candidate_id: self.candidate_id,
            tx_state,
        };
        self.slot.send_replace(Some(receipt));
        receipt
    }
}

impl Drop for VoteSlot<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.slot.send_replace(Some(VoteReceipt {
                candidate_id: self.candidate_id,
                tx_state: TxState::Indeterminate,
            }));
        }
    }
}

impl VotingWorkflow {
    pub fn new(confirmation_timeout: Duration) -> Self {
        Self {
            confirmation_timeout,
            vote: watch::Sender::new(None),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    /// Candidates with ids `1..=count`, ascending.
    ///
    /// A candidate whose read fails is left out and logged; the rest of the
    /// list is still returned. Ids are never renumbered, so a gap shows
    /// exactly which read failed.
    pub async fn list_candidates(&self, binding: Option<ChainBinding>) -> Vec<Candidate> {
        let Some(binding) = binding else {
            return Vec::new();
        };
        let contract = binding.contract();

        let count = match contract.get_count_candidates().await {
            Ok(count) => count,
            Err(e) => {
                warn!("failed to read candidate count: {e}");
                return Vec::new();
            }
        };

        if count > MAX_CANDIDATES {
            warn!(count, "candidate count exceeds {MAX_CANDIDATES}, ignoring list");
            return Vec::new();
        }

        let mut candidates = Vec::with_capacity(count as usize);
        for id in (1..=count).filter_map(CandidateId::new) {
            match contract.get_candidate(id).await {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(candidate = %id, "skipping candidate: {e}"),
            }
        }
        candidates
    }

    /// The voting window, or `None` when unset or unreadable.
    pub async fn voting_window(&self, binding: Option<ChainBinding>) -> Option<VotingWindow> {
        let binding = binding?;
        match binding.contract().get_dates().await {
            Ok(window) if window.is_unset() => None,
            Ok(window) => Some(window),
            Err(e) => {
                warn!("failed to read voting window: {e}");
                None
            }
        }
    }

    /// Whether the bound account has voted. `false` when unknown.
    pub async fn has_voted(&self, binding: Option<ChainBinding>) -> bool {
        self.check_vote(binding).await.unwrap_or(false)
    }

    async fn check_vote(&self, binding: Option<ChainBinding>) -> Option<bool> {
        let binding = binding?;
        match binding.contract().check_vote().await {
            Ok(voted) => Some(voted),
            Err(e) => {
                warn!(account = %binding.signer(), "failed to check vote status: {e}");
                None
            }
        }
    }

    /// Read candidates, window and vote status for one binding.
    pub async fn read_state(&self, binding: Option<ChainBinding>) -> ReadState {
        ReadState {
            candidates: self.list_candidates(binding.clone()).await,
            window: self.voting_window(binding.clone()).await,
            has_voted: self.check_vote(binding).await,
        }
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Add a candidate. Both fields must be non-blank.
    pub async fn submit_candidate(
        &self,
        binding: Option<ChainBinding>,
        name: &str,
        party: &str,
    ) -> Result<TxReceipt, ClientError> {
        let (name, party) = (name.trim(), party.trim());
        if name.is_empty() || party.is_empty() {
            return Err(ClientError::InvalidInput(
                "please enter both name and party".into(),
            ));
        }
        let binding = require_binding(binding)?;

        let tx = binding.contract().add_candidate(name, party).await?;
        let receipt = self.confirm(tx).await?;
        info!(name, party, tx = %receipt.tx_hash, "candidate added");
        Ok(receipt)
    }

    /// Set the voting window from user input. Each bound must parse to a
    /// positive Unix timestamp and `end` must come after `start`.
    pub async fn set_voting_window(
        &self,
        binding: Option<ChainBinding>,
        start: &str,
        end: &str,
    ) -> Result<VotingWindow, ClientError> {
        let start = parse_timestamp(start)
            .map_err(|e| ClientError::InvalidInput(format!("start date: {e}")))?;
        let end = parse_timestamp(end)
            .map_err(|e| ClientError::InvalidInput(format!("end date: {e}")))?;
        if end <= start {
            return Err(ClientError::InvalidInput(
                "end date must be after start date".into(),
            ));
        }
        let binding = require_binding(binding)?;

        let tx = binding.contract().set_dates(start, end).await?;
        let receipt = self.confirm(tx).await?;
        info!(start, end, tx = %receipt.tx_hash, "voting window set");
        Ok(VotingWindow::new(start, end))
    }

    /// Cast the vote for `selection`.
    ///
    /// Only one vote may be pending at a time. The ledger's rejection text is
    /// returned untouched; a timed-out wait leaves the receipt
    /// `Indeterminate` rather than `Failed`.
    pub async fn cast_vote(
        &self,
        binding: Option<ChainBinding>,
        selection: Option<CandidateId>,
    ) -> Result<VoteReceipt, ClientError> {
        let candidate_id = selection.ok_or(ClientError::NoSelection)?;
        let binding = require_binding(binding)?;

        let claimed = self.vote.send_if_modified(|current| {
            if current.is_some_and(|r| r.tx_state.is_pending()) {
                return false;
            }
            *current = Some(VoteReceipt {
                candidate_id,
                tx_state: TxState::Pending,
            });
            true
        });
        if !claimed {
            return Err(ClientError::VoteInProgress);
        }
        let slot = VoteSlot {
            slot: &self.vote,
            candidate_id,
            settled: false,
        };

        let tx = match binding.contract().vote(candidate_id).await {
            Ok(tx) => tx,
            Err(e) => {
                slot.settle(TxState::Failed);
                return Err(e.into());
            }
        };
        info!(candidate = %candidate_id, tx = %tx.tx_hash(), "vote submitted");

        match self.confirm(tx).await {
            Ok(receipt) => {
                info!(candidate = %candidate_id, tx = %receipt.tx_hash, "vote confirmed");
                Ok(slot.settle(TxState::Confirmed))
            }
            Err(e @ ClientError::LedgerRejected(_)) => {
                slot.settle(TxState::Failed);
                Err(e)
            }
            Err(e) => {
                slot.settle(TxState::Indeterminate);
                Err(e)
            }
        }
    }

    /// The latest vote receipt, if a vote was attempted.
    pub fn vote_receipt(&self) -> Option<VoteReceipt> {
        *self.vote.borrow()
    }

    /// Watch receipt transitions (pending, confirmed, failed…).
    pub fn subscribe_receipts(&self) -> watch::Receiver<Option<VoteReceipt>> {
        self.vote.subscribe()
    }

    pub fn vote_pending(&self) -> bool {
        self.vote_receipt()
            .is_some_and(|r| r.tx_state.is_pending())
    }

    async fn confirm(&self, tx: Box<dyn PendingTx>) -> Result<TxReceipt, ClientError> {
        let tx_hash = tx.tx_hash().to_string();
        match tokio::time::timeout(self.confirmation_timeout, tx.wait()).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => {
                warn!(tx = %tx_hash, "gave up waiting for confirmation");
                Err(ClientError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: self.confirmation_timeout.as_secs(),
                })
            }
        }
    }
}

fn require_binding(binding: Option<ChainBinding>) -> Result<ChainBinding, ClientError> {
    binding.ok_or_else(|| ClientError::TransportUnavailable("wallet not connected".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_without_binding_are_neutral() {
        let workflow = VotingWorkflow::new(Duration::from_secs(1));
        assert!(workflow.list_candidates(None).await.is_empty());
        assert!(workflow.voting_window(None).await.is_none());
        assert!(!workflow.has_voted(None).await);
        assert_eq!(workflow.read_state(None).await, ReadState::default());
    }

    #[tokio::test]
    async fn validation_runs_before_binding_check() {
        let workflow = VotingWorkflow::new(Duration::from_secs(1));
        assert!(matches!(
            workflow.submit_candidate(None, " ", "Red").await,
            Err(ClientError::InvalidInput(_))
        ));
        assert!(matches!(
            workflow.set_voting_window(None, "soon", "later").await,
            Err(ClientError::InvalidInput(_))
        ));
        assert!(matches!(
            workflow.set_voting_window(None, "2024-02-01", "2024-01-01").await,
            Err(ClientError::InvalidInput(_))
        ));
        assert_eq!(
            workflow.cast_vote(None, None).await,
            Err(ClientError::NoSelection)
        );
    }

    #[tokio::test]
    async fn writes_without_binding_need_wallet() {
        let workflow = VotingWorkflow::new(Duration::from_secs(1));
        let err = workflow
            .cast_vote(None, CandidateId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TransportUnavailable(_)));
        assert!(workflow.vote_receipt().is_none());
    }

    #[test]
    fn dropped_slot_becomes_indeterminate() {
        let workflow = VotingWorkflow::new(Duration::from_secs(1));
        let id = CandidateId::new(2).unwrap();
        workflow.vote.send_replace(Some(VoteReceipt {
            candidate_id: id,
            tx_state: TxState::Pending,
        }));
        drop(VoteSlot {
            slot: &workflow.vote,
            candidate_id: id,
            settled: false,
        });
        assert_eq!(
            workflow.vote_receipt().map(|r| r.tx_state),
            Some(TxState::Indeterminate)
        );
        assert!(!workflow.vote_pending());
    }
}
