//! Deployed-artifacts table: chain id → contract address + ABI.
//!
//! Read once at startup from the contract build output (Truffle/Hardhat
//! artifact JSON: an `abi` array and a `networks` map keyed by chain id).

use ballot_types::{AccountAddress, ChainId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::contract::Abi;
use crate::error::ClientError;

#[derive(Deserialize)]
struct ArtifactFile {
    #[serde(rename = "contractName", default)]
    contract_name: Option<String>,
    abi: serde_json::Value,
    #[serde(default)]
    networks: HashMap<String, NetworkEntry>,
}

#[derive(Deserialize)]
struct NetworkEntry {
    address: String,
}

/// One deployment of the contract.
#[derive(Clone, Debug, PartialEq)]
pub struct Deployment {
    pub address: AccountAddress,
    pub abi: Abi,
}

/// Static deployment table. Cheap to clone.
#[derive(Clone, Debug)]
pub struct DeployedArtifacts {
    contract_name: String,
    abi: Abi,
    deployments: Arc<HashMap<ChainId, AccountAddress>>,
}

impl DeployedArtifacts {
    /// Load an artifact file.
    pub fn from_json_file(path: &Path) -> Result<Self, ClientError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Artifacts(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    /// Parse artifact JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ClientError> {
        let file: ArtifactFile =
            serde_json::from_str(s).map_err(|e| ClientError::Artifacts(e.to_string()))?;
        if !file.abi.is_array() {
            return Err(ClientError::Artifacts("abi must be an array".into()));
        }

        let mut deployments = HashMap::with_capacity(file.networks.len());
        for (key, entry) in file.networks {
            let chain: u64 = key
                .parse()
                .map_err(|_| ClientError::Artifacts(format!("bad network id {key:?}")))?;
            let address = AccountAddress::parse(&entry.address)
                .map_err(|e| ClientError::Artifacts(format!("network {key}: {e}")))?;
            deployments.insert(ChainId::new(chain), address);
        }

        Ok(Self {
            contract_name: file.contract_name.unwrap_or_else(|| "Voting".to_string()),
            abi: Arc::new(file.abi),
            deployments: Arc::new(deployments),
        })
    }

    /// Build a table directly (tests, embedded deployments).
    pub fn new(
        abi: serde_json::Value,
        deployments: impl IntoIterator<Item = (ChainId, AccountAddress)>,
    ) -> Self {
        Self {
            contract_name: "Voting".to_string(),
            abi: Arc::new(abi),
            deployments: Arc::new(deployments.into_iter().collect()),
        }
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    /// Deployment for `chain`, or `None` when the contract is not deployed there.
    pub fn lookup(&self, chain: ChainId) -> Option<Deployment> {
        self.deployments.get(&chain).map(|address| Deployment {
            address: address.clone(),
            abi: self.abi.clone(),
        })
    }

    /// Chains with a deployment, ascending.
    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.deployments.keys().copied().collect();
        chains.sort();
        chains
    }
}
