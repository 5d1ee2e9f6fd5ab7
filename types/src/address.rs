//! Account address type with `0x` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),

    #[error("address must be 20 bytes, got {0}")]
    WrongLength(usize),

    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

/// A 20-byte account address, stored lowercase with its `0x` prefix.
///
/// Wallets report checksummed (mixed-case) addresses; comparisons must not
/// depend on the casing, so the address is normalised on construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress(String);

impl AccountAddress {
    /// The standard prefix for all account addresses.
    pub const PREFIX: &'static str = "0x";

    /// Parse and normalise an address string.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix(Self::PREFIX)
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(trimmed.to_string()))?;
        let bytes = hex::decode(body).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(AddressError::WrongLength(bytes.len()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, hex::encode(bytes))))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for display, e.g. `0x1234…abcd`.
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AccountAddress> for String {
    fn from(address: AccountAddress) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksummed_and_lowercase_compare_equal() {
        let a = AccountAddress::parse("0xAbCdEf0123456789aBcDeF0123456789AbCdEf01").unwrap();
        let b = AccountAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = AccountAddress::parse("abcdef0123456789abcdef0123456789abcdef01").unwrap_err();
        assert!(matches!(err, AddressError::MissingPrefix(_)));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            AccountAddress::parse("0x1234").unwrap_err(),
            AddressError::WrongLength(2)
        );
    }

    #[test]
    fn short_form() {
        let a = AccountAddress::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(a.short(), "0xabcd…ef01");
    }

    #[test]
    fn serde_goes_through_validation() {
        let bad: Result<AccountAddress, _> = serde_json::from_str("\"0xzz\"");
        assert!(bad.is_err());
        let good: AccountAddress =
            serde_json::from_str("\"0x00000000000000000000000000000000000000AA\"").unwrap();
        assert!(good.as_str().ends_with("aa"));
    }
}
