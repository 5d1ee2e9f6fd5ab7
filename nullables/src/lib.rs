//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! The wallet SDK, the ledger and the clock are abstracted behind traits.
//! This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (emit wallet events, hold reads,
//!   fail reads, reject or stall transactions)
//! - Never touch the network
//!
//! Usage: swap the wallet SDK and contract connector for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod wallet;

pub use clock::NullClock;
pub use ledger::{LedgerCall, NullContract, NullLedger, SubmittedTx};
pub use wallet::NullWallet;
