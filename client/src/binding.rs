//! Chain binding: wallet transport + signer + contract handle for one
//! account/network combination.

use ballot_types::{AccountAddress, ChainId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifacts::DeployedArtifacts;
use crate::contract::{Abi, ContractConnector, VotingContract};
use crate::error::ClientError;
use crate::wallet::WalletTransport;

/// A resolved binding. Never mutated; a new one replaces it when the
/// account or network changes.
#[derive(Clone)]
pub struct ChainBinding {
    provider: Arc<dyn WalletTransport>,
    signer: AccountAddress,
    chain_id: ChainId,
    contract_address: AccountAddress,
    abi: Abi,
    contract: Arc<dyn VotingContract>,
}

impl ChainBinding {
    pub fn provider(&self) -> &Arc<dyn WalletTransport> {
        &self.provider
    }

    pub fn signer(&self) -> &AccountAddress {
        &self.signer
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn contract_address(&self) -> &AccountAddress {
        &self.contract_address
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn contract(&self) -> &Arc<dyn VotingContract> {
        &self.contract
    }
}

impl fmt::Debug for ChainBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBinding")
            .field("signer", &self.signer)
            .field("chain_id", &self.chain_id)
            .field("contract_address", &self.contract_address)
            .finish_non_exhaustive()
    }
}

/// Builds [`ChainBinding`]s from the deployment table.
#[derive(Clone)]
pub struct ChainBinder {
    artifacts: DeployedArtifacts,
    connector: Arc<dyn ContractConnector>,
}

impl ChainBinder {
    pub fn new(artifacts: DeployedArtifacts, connector: Arc<dyn ContractConnector>) -> Self {
        Self {
            artifacts,
            connector,
        }
    }

    pub fn artifacts(&self) -> &DeployedArtifacts {
        &self.artifacts
    }

    /// Bind to the contract deployed on `chain_id`.
    ///
    /// Reads the wallet's network identity and signer; no retries. Returns
    /// `UnsupportedNetwork` when nothing is deployed there, and
    /// `TransportUnavailable` when the wallet cannot answer or has already
    /// moved to a different chain.
    pub async fn bind(
        &self,
        transport: Arc<dyn WalletTransport>,
        chain_id: ChainId,
    ) -> Result<ChainBinding, ClientError> {
        let reported = transport.chain_id().await?;
        if reported != chain_id {
            return Err(ClientError::TransportUnavailable(format!(
                "wallet is on chain {reported}, expected {chain_id}"
            )));
        }

        let deployment = match self.artifacts.lookup(chain_id) {
            Some(d) => d,
            None => {
                debug!(%chain_id, "no deployment for chain");
                return Err(ClientError::UnsupportedNetwork(chain_id));
            }
        };

        let signer = transport.signer_address().await?;
        let contract =
            self.connector
                .connect(transport.clone(), &deployment.address, &deployment.abi, &signer);

        info!(
            %chain_id,
            signer = %signer,
            contract = %deployment.address,
            "contract bound"
        );

        Ok(ChainBinding {
            provider: transport,
            signer,
            chain_id,
            contract_address: deployment.address,
            abi: deployment.abi,
            contract,
        })
    }
}
