//! Client configuration with TOML file support.

use ballot_types::{AccountAddress, ChainId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;

/// A network the wallet SDK offers to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub chain_id: ChainId,
    pub name: String,
}

/// App metadata shown by the wallet during connection and in the CLI header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_description")]
    pub description: String,
    #[serde(default = "default_app_url")]
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            description: default_app_description(),
            url: default_app_url(),
            icons: Vec::new(),
        }
    }
}

/// Configuration for the ballot client.
///
/// Can be loaded from a TOML file via [`ClientConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Path to the contract build artifact (ABI + deployed addresses).
    #[serde(default = "default_artifacts_path")]
    pub artifacts_path: PathBuf,

    /// Ledger gateway JSON-RPC endpoint.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Account to act as when no wallet SDK supplies one.
    #[serde(default)]
    pub account: Option<AccountAddress>,

    /// Upper bound on waiting for a transaction receipt.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// How often to poll the gateway for a receipt.
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // Tables last so the struct serializes to valid TOML.
    #[serde(default)]
    pub metadata: AppMetadata,

    /// Networks offered to the user.
    #[serde(default = "default_networks")]
    pub networks: Vec<NetworkInfo>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_artifacts_path() -> PathBuf {
    PathBuf::from("./build/contracts/Voting.json")
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_app_name() -> String {
    "Decentralized Voting System".to_string()
}

fn default_app_description() -> String {
    "A secure blockchain-based voting platform".to_string()
}

fn default_app_url() -> String {
    "https://voting-dapp.com".to_string()
}

fn default_networks() -> Vec<NetworkInfo> {
    [ChainId::MAINNET, ChainId::SEPOLIA, ChainId::HARDHAT]
        .into_iter()
        .filter_map(|chain_id| {
            chain_id.well_known_name().map(|name| NetworkInfo {
                chain_id,
                name: name.to_string(),
            })
        })
        .collect()
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ClientError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ClientError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ClientError> {
        toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ClientError> {
        toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    /// Display name for `chain`, if it is one of the configured networks.
    pub fn network_name(&self, chain: ChainId) -> Option<&str> {
        self.networks
            .iter()
            .find(|n| n.chain_id == chain)
            .map(|n| n.name.as_str())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            artifacts_path: default_artifacts_path(),
            gateway_url: default_gateway_url(),
            account: None,
            metadata: AppMetadata::default(),
            networks: default_networks(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ClientConfig::default();
        let toml_str = config.to_toml_string().expect("should serialize");
        let parsed = ClientConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.confirmation_timeout_secs, config.confirmation_timeout_secs);
        assert_eq!(parsed.networks, config.networks);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ClientConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(120));
        assert_eq!(config.log_format, "human");
        assert_eq!(config.network_name(ChainId::SEPOLIA), Some("Sepolia"));
        assert_eq!(config.network_name(ChainId::new(1337)), None);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            gateway_url = "http://10.0.0.5:8545"
            account = "0x00000000000000000000000000000000000000AA"
            confirmation_timeout_secs = 30

            [[networks]]
            chain_id = 5777
            name = "Ganache"
        "#;
        let config = ClientConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.gateway_url, "http://10.0.0.5:8545");
        assert_eq!(
            config.account.as_ref().map(|a| a.as_str()),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert_eq!(config.network_name(ChainId::new(5777)), Some("Ganache"));
        assert_eq!(config.network_name(ChainId::MAINNET), None);
        assert_eq!(config.metadata.name, "Decentralized Voting System");
    }

    #[test]
    fn invalid_account_is_config_error() {
        let result = ClientConfig::from_toml_str(r#"account = "0x12""#);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let config = ClientConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = ClientConfig::from_toml_file("/nonexistent/ballot.toml");
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
