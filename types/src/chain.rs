//! Chain (network) identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which chain a wallet is attached to (EIP-155 chain id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const MAINNET: Self = Self(1);
    pub const SEPOLIA: Self = Self(11_155_111);
    pub const HARDHAT: Self = Self(31_337);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Well-known name for chains the client ships with.
    pub fn well_known_name(&self) -> Option<&'static str> {
        match self.0 {
            1 => Some("Ethereum"),
            11_155_111 => Some("Sepolia"),
            31_337 => Some("Hardhat"),
            _ => None,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
