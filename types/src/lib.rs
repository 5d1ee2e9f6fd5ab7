//! Fundamental types for the ballot client.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! account addresses, chain identifiers, candidates, voting windows, vote receipts
//! and the error taxonomy.

pub mod address;
pub mod candidate;
pub mod chain;
pub mod error;
pub mod receipt;
pub mod window;

pub use address::{AccountAddress, AddressError};
pub use candidate::{Candidate, CandidateId};
pub use chain::ChainId;
pub use error::ErrorKind;
pub use receipt::{TxReceipt, TxState, VoteReceipt};
pub use window::VotingWindow;
