use ballot_types::{ChainId, ErrorKind};
use thiserror::Error;

/// Failure reported by the wallet transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("wallet is locked")]
    Locked,

    #[error("wallet provider disconnected")]
    Disconnected,

    #[error("wallet request failed: {0}")]
    Request(String),
}

/// Failure reported by the ledger for a contract call or transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The contract call or transaction reverted. The reason is the ledger's text.
    #[error("{0}")]
    Reverted(String),

    /// The signer refused to sign.
    #[error("{0}")]
    UserRejected(String),

    /// The ledger could not be reached or answered nonsense.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the client core. Every variant maps onto one [`ErrorKind`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("wallet unavailable: {0}")]
    TransportUnavailable(String),

    #[error("voting contract is not deployed on chain {0}")]
    UnsupportedNetwork(ChainId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("please vote for a candidate")]
    NoSelection,

    /// The ledger's own message, untouched.
    #[error("{0}")]
    LedgerRejected(String),

    #[error("transaction {tx_hash} not confirmed within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error("a vote is already waiting for confirmation")]
    VoteInProgress,

    #[error("this account has already voted")]
    AlreadyVoted,

    #[error("config error: {0}")]
    Config(String),

    #[error("artifacts error: {0}")]
    Artifacts(String),
}

impl ClientError {
    /// Classify for the view. Startup errors count as transport problems.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransportUnavailable(_) | Self::Config(_) | Self::Artifacts(_) => {
                ErrorKind::TransportUnavailable
            }
            Self::UnsupportedNetwork(_) => ErrorKind::UnsupportedNetwork,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NoSelection => ErrorKind::NoSelection,
            Self::LedgerRejected(_) => ErrorKind::LedgerRejected,
            Self::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            Self::VoteInProgress => ErrorKind::VoteInProgress,
            Self::AlreadyVoted => ErrorKind::AlreadyVoted,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        ClientError::TransportUnavailable(e.to_string())
    }
}

impl From<LedgerError> for ClientError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Reverted(msg) | LedgerError::UserRejected(msg) => {
                ClientError::LedgerRejected(msg)
            }
            LedgerError::Unavailable(msg) => ClientError::TransportUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_message_is_kept_verbatim() {
        let err: ClientError =
            LedgerError::Reverted("execution reverted: already voted".into()).into();
        assert_eq!(err.to_string(), "execution reverted: already voted");
        assert_eq!(err.kind(), ErrorKind::LedgerRejected);
    }

    #[test]
    fn user_rejection_is_ledger_rejected() {
        let err: ClientError = LedgerError::UserRejected("user denied signature".into()).into();
        assert_eq!(err.kind(), ErrorKind::LedgerRejected);
    }

    #[test]
    fn transport_errors_map_to_transport_unavailable() {
        let err: ClientError = TransportError::Locked.into();
        assert_eq!(err.kind(), ErrorKind::TransportUnavailable);
        let err: ClientError = LedgerError::Unavailable("connection refused".into()).into();
        assert_eq!(err.kind(), ErrorKind::TransportUnavailable);
    }
}
