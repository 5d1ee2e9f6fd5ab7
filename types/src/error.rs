//! Error taxonomy shared across crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of every error the client can surface to the user.
///
/// None of these are fatal: each one resolves to a state transition or a
/// message in the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Wallet not reachable; the user must reconnect.
    TransportUnavailable,
    /// No deployment for the active chain; the user must switch network.
    UnsupportedNetwork,
    /// Local validation failed; no ledger call was issued.
    InvalidInput,
    /// No candidate selected.
    NoSelection,
    /// Transaction reverted or signing declined.
    LedgerRejected,
    /// Receipt wait exceeded its bound; outcome unknown.
    ConfirmationTimeout,
    /// A vote from this client is still waiting for confirmation.
    VoteInProgress,
    /// The ledger already records a vote from this account.
    AlreadyVoted,
}

impl ErrorKind {
    /// Whether the same action may simply be tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LedgerRejected | Self::TransportUnavailable | Self::ConfirmationTimeout
        )
    }

    /// Short hint telling the user what to do next.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::TransportUnavailable => "reconnect your wallet",
            Self::UnsupportedNetwork => "switch to a supported network",
            Self::InvalidInput => "check the entered values",
            Self::NoSelection => "select a candidate",
            Self::LedgerRejected => "try again",
            Self::ConfirmationTimeout => "refresh to check whether the transaction landed",
            Self::VoteInProgress => "wait for the pending vote to confirm",
            Self::AlreadyVoted => "each account can vote once",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportUnavailable => "transport_unavailable",
            Self::UnsupportedNetwork => "unsupported_network",
            Self::InvalidInput => "invalid_input",
            Self::NoSelection => "no_selection",
            Self::LedgerRejected => "ledger_rejected",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::VoteInProgress => "vote_in_progress",
            Self::AlreadyVoted => "already_voted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(ErrorKind::LedgerRejected.is_retryable());
        assert!(ErrorKind::ConfirmationTimeout.is_retryable());
        assert!(!ErrorKind::AlreadyVoted.is_retryable());
        assert!(!ErrorKind::NoSelection.is_retryable());
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(ErrorKind::AlreadyVoted.to_string(), "already_voted");
        assert_eq!(ErrorKind::VoteInProgress.to_string(), "vote_in_progress");
    }
}
