//! Nullable ledger: an in-memory voting contract.
//!
//! Transactions take effect when their receipt is awaited, so a test can
//! submit, inspect the submission, and only then let it land.

use async_trait::async_trait;
use ballot_client::{
    Abi, ContractConnector, LedgerError, PendingTx, VotingContract, WalletTransport,
};
use ballot_types::{AccountAddress, Candidate, CandidateId, TxReceipt, VotingWindow};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::clock::NullClock;

/// Default clock reading: 2023-11-14T22:13:20Z.
const DEFAULT_NOW: u64 = 1_700_000_000;

/// A state-changing call the client submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    AddCandidate { name: String, party: String },
    SetDates { start: u64, end: u64 },
    Vote { candidate: CandidateId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedTx {
    pub hash: String,
    pub from: AccountAddress,
    pub call: LedgerCall,
}

#[derive(Default)]
struct LedgerState {
    candidates: Vec<Candidate>,
    window: VotingWindow,
    voters: HashSet<AccountAddress>,
    submitted: Vec<SubmittedTx>,
    failing_reads: HashSet<CandidateId>,
    /// Count reported by `getCountCandidates` instead of the real one.
    reported_count: Option<u64>,
    reject_next: Option<LedgerError>,
    stalled: bool,
    unavailable: bool,
    connections: usize,
    /// Calls per method name, for asserting read patterns.
    calls: HashMap<&'static str, usize>,
}

/// In-memory ledger shared by every contract handle it hands out.
#[derive(Clone)]
pub struct NullLedger {
    state: Arc<Mutex<LedgerState>>,
    clock: Arc<NullClock>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            clock: Arc::new(NullClock::new(DEFAULT_NOW)),
        }
    }

    /// Register a candidate with a starting vote count.
    pub fn with_candidate(self, name: &str, party: &str, votes: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(id) = CandidateId::new(state.candidates.len() as u64 + 1) {
                state.candidates.push(Candidate {
                    id,
                    name: name.to_string(),
                    party: party.to_string(),
                    vote_count: votes,
                });
            }
        }
        self
    }

    pub fn with_dates(self, start: u64, end: u64) -> Self {
        self.state.lock().unwrap().window = VotingWindow::new(start, end);
        self
    }

    /// Make reads of candidate `id` fail.
    pub fn fail_candidate_read(&self, id: u64) {
        if let Some(id) = CandidateId::new(id) {
            self.state.lock().unwrap().failing_reads.insert(id);
        }
    }

    /// Report `count` candidates regardless of how many exist.
    pub fn report_candidate_count(&self, count: u64) {
        self.state.lock().unwrap().reported_count = Some(count);
    }

    /// Refuse the next submission with `error` (e.g. the signer declining).
    pub fn reject_next_submission(&self, error: LedgerError) {
        self.state.lock().unwrap().reject_next = Some(error);
    }

    /// While stalled, receipts never arrive.
    pub fn stall_confirmations(&self, stalled: bool) {
        self.state.lock().unwrap().stalled = stalled;
    }

    /// While unavailable, every call fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn has_voted(&self, voter: &AccountAddress) -> bool {
        self.state.lock().unwrap().voters.contains(voter)
    }

    pub fn vote_count(&self, id: u64) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .candidates
            .iter()
            .find(|c| c.id.as_u64() == id)
            .map(|c| c.vote_count)
    }

    pub fn window(&self) -> VotingWindow {
        self.state.lock().unwrap().window
    }

    /// How many contract handles have been built.
    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    /// How many times `method` was called across all handles.
    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn clock(&self) -> &NullClock {
        &self.clock
    }

    fn enter(&self, method: &'static str) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        if state.unavailable {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        Ok(())
    }

    fn submit(
        &self,
        from: &AccountAddress,
        call: LedgerCall,
    ) -> Result<Box<dyn PendingTx>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.reject_next.take() {
            return Err(error);
        }
        let tx = SubmittedTx {
            hash: format!("0x{:064x}", state.submitted.len() + 1),
            from: from.clone(),
            call,
        };
        state.submitted.push(tx.clone());
        Ok(Box::new(NullTx {
            ledger: self.clone(),
            tx,
        }))
    }

    /// Apply a transaction's effect, or return its revert reason.
    fn apply(&self, tx: &SubmittedTx) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        match &tx.call {
            LedgerCall::AddCandidate { name, party } => {
                let id = CandidateId::new(state.candidates.len() as u64 + 1)
                    .ok_or_else(|| LedgerError::Reverted("candidate id overflow".into()))?;
                state.candidates.push(Candidate {
                    id,
                    name: name.clone(),
                    party: party.clone(),
                    vote_count: 0,
                });
            }
            LedgerCall::SetDates { start, end } => {
                if end <= start {
                    return Err(LedgerError::Reverted("invalid voting dates".into()));
                }
                state.window = VotingWindow::new(*start, *end);
            }
            LedgerCall::Vote { candidate } => {
                if state.voters.contains(&tx.from) {
                    return Err(LedgerError::Reverted("already voted".into()));
                }
                if !state.window.is_unset() && !state.window.is_open(now) {
                    return Err(LedgerError::Reverted("voting is not open".into()));
                }
                let Some(row) = state.candidates.iter_mut().find(|c| c.id == *candidate) else {
                    return Err(LedgerError::Reverted("invalid candidate".into()));
                };
                row.vote_count += 1;
                state.voters.insert(tx.from.clone());
            }
        }
        Ok(state.submitted.len() as u64)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractConnector for NullLedger {
    fn connect(
        &self,
        _transport: Arc<dyn WalletTransport>,
        _address: &AccountAddress,
        _abi: &Abi,
        signer: &AccountAddress,
    ) -> Arc<dyn VotingContract> {
        self.state.lock().unwrap().connections += 1;
        Arc::new(NullContract {
            ledger: self.clone(),
            signer: signer.clone(),
        })
    }
}

/// A contract handle bound to one signer.
pub struct NullContract {
    ledger: NullLedger,
    signer: AccountAddress,
}

#[async_trait]
impl VotingContract for NullContract {
    async fn get_count_candidates(&self) -> Result<u64, LedgerError> {
        self.ledger.enter("getCountCandidates")?;
        let state = self.ledger.state.lock().unwrap();
        Ok(state
            .reported_count
            .unwrap_or(state.candidates.len() as u64))
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Candidate, LedgerError> {
        self.ledger.enter("getCandidate")?;
        let state = self.ledger.state.lock().unwrap();
        if state.failing_reads.contains(&id) {
            return Err(LedgerError::Unavailable(format!("read of candidate {id} failed")));
        }
        state
            .candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::Reverted("invalid candidate".into()))
    }

    async fn add_candidate(
        &self,
        name: &str,
        party: &str,
    ) -> Result<Box<dyn PendingTx>, LedgerError> {
        self.ledger.enter("addCandidate")?;
        self.ledger.submit(
            &self.signer,
            LedgerCall::AddCandidate {
                name: name.to_string(),
                party: party.to_string(),
            },
        )
    }

    async fn set_dates(&self, start: u64, end: u64) -> Result<Box<dyn PendingTx>, LedgerError> {
        self.ledger.enter("setDates")?;
        self.ledger
            .submit(&self.signer, LedgerCall::SetDates { start, end })
    }

    async fn get_dates(&self) -> Result<VotingWindow, LedgerError> {
        self.ledger.enter("getDates")?;
        Ok(self.ledger.window())
    }

    async fn check_vote(&self) -> Result<bool, LedgerError> {
        self.ledger.enter("checkVote")?;
        Ok(self.ledger.has_voted(&self.signer))
    }

    async fn vote(&self, candidate: CandidateId) -> Result<Box<dyn PendingTx>, LedgerError> {
        self.ledger.enter("vote")?;
        self.ledger.submit(&self.signer, LedgerCall::Vote { candidate })
    }
}

struct NullTx {
    ledger: NullLedger,
    tx: SubmittedTx,
}

#[async_trait]
impl PendingTx for NullTx {
    fn tx_hash(&self) -> &str {
        &self.tx.hash
    }

    async fn wait(self: Box<Self>) -> Result<TxReceipt, LedgerError> {
        let stalled = self.ledger.state.lock().unwrap().stalled;
        if stalled {
            std::future::pending::<()>().await;
        }
        let block_number = self.ledger.apply(&self.tx)?;
        Ok(TxReceipt {
            tx_hash: self.tx.hash.clone(),
            block_number: Some(block_number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(last: u8) -> AccountAddress {
        AccountAddress::parse(&format!("0x{}{:02x}", "00".repeat(19), last)).unwrap()
    }

    fn contract(ledger: &NullLedger, signer: AccountAddress) -> NullContract {
        NullContract {
            ledger: ledger.clone(),
            signer,
        }
    }

    #[tokio::test]
    async fn vote_lands_on_wait() {
        let ledger = NullLedger::new().with_candidate("Alice", "Red", 3);
        let handle = contract(&ledger, voter(1));

        let tx = handle.vote(CandidateId::new(1).unwrap()).await.unwrap();
        assert_eq!(ledger.vote_count(1), Some(3));
        tx.wait().await.unwrap();
        assert_eq!(ledger.vote_count(1), Some(4));
        assert!(handle.check_vote().await.unwrap());
    }

    #[tokio::test]
    async fn second_vote_reverts() {
        let ledger = NullLedger::new().with_candidate("Alice", "Red", 0);
        let handle = contract(&ledger, voter(1));
        let id = CandidateId::new(1).unwrap();

        handle.vote(id).await.unwrap().wait().await.unwrap();
        let err = handle.vote(id).await.unwrap().wait().await.unwrap_err();
        assert_eq!(err, LedgerError::Reverted("already voted".into()));
        assert_eq!(ledger.vote_count(1), Some(1));
    }

    #[tokio::test]
    async fn closed_window_reverts_vote() {
        let ledger = NullLedger::new()
            .with_candidate("Alice", "Red", 0)
            .with_dates(DEFAULT_NOW + 10, DEFAULT_NOW + 20);
        let handle = contract(&ledger, voter(1));
        let id = CandidateId::new(1).unwrap();

        let err = handle.vote(id).await.unwrap().wait().await.unwrap_err();
        assert_eq!(err, LedgerError::Reverted("voting is not open".into()));

        ledger.clock().advance(15);
        handle.vote(id).await.unwrap().wait().await.unwrap();
        assert_eq!(ledger.vote_count(1), Some(1));
    }

    #[tokio::test]
    async fn failing_read_only_affects_that_candidate() {
        let ledger = NullLedger::new()
            .with_candidate("Alice", "Red", 0)
            .with_candidate("Bob", "Blue", 0);
        ledger.fail_candidate_read(1);
        let handle = contract(&ledger, voter(1));

        assert!(handle.get_candidate(CandidateId::new(1).unwrap()).await.is_err());
        assert_eq!(
            handle.get_candidate(CandidateId::new(2).unwrap()).await.unwrap().name,
            "Bob"
        );
    }

    #[tokio::test]
    async fn rejected_submission_is_not_recorded() {
        let ledger = NullLedger::new();
        ledger.reject_next_submission(LedgerError::UserRejected("user denied".into()));
        let handle = contract(&ledger, voter(1));

        assert!(handle.add_candidate("Carol", "Green").await.is_err());
        assert!(ledger.submitted().is_empty());
        assert!(handle.add_candidate("Carol", "Green").await.is_ok());
        assert_eq!(ledger.submitted().len(), 1);
    }
}
