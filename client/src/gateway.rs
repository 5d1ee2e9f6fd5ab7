//! JSON-RPC ledger gateway client.
//!
//! The gateway fronts the chain: it answers contract reads, signs and
//! relays transactions for the configured account, and reports receipts.
//! Requests are `POST`ed as a JSON object with an `action` field; replies
//! carry either `result` or `error`.

use async_trait::async_trait;
use ballot_types::{AccountAddress, Candidate, CandidateId, ChainId, TxReceipt, VotingWindow};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::contract::{Abi, ContractConnector, PendingTx, VotingContract};
use crate::error::{ClientError, LedgerError, TransportError};
use crate::wallet::{
    AccountHandler, NetworkHandler, Subscription, WalletSdk, WalletState, WalletTransport,
};

// ── GatewayClient ──────────────────────────────────────────────────────

/// HTTP client for the ledger gateway.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    url: String,
    poll_interval: Duration,
}

impl GatewayClient {
    /// Create a client targeting `url` (e.g. `http://127.0.0.1:8545`).
    pub fn new(url: impl Into<String>, poll_interval: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            poll_interval,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and return its `result` field.
    async fn rpc_call(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let mut body = params;
        body.as_object_mut()
            .ok_or_else(|| LedgerError::Unavailable("params must be a JSON object".into()))?
            .insert("action".to_string(), serde_json::json!(action));

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Unavailable(format!(
                "gateway returned HTTP {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("invalid JSON response: {e}")))?;

        if let Some(err) = json.get("error") {
            return Err(gateway_error(err));
        }

        Ok(json.get("result").cloned().unwrap_or(json))
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<T, LedgerError> {
        let result = self.rpc_call(action, params).await?;
        serde_json::from_value(result)
            .map_err(|e| LedgerError::Unavailable(format!("invalid {action} response: {e}")))
    }

    pub async fn chain_id(&self) -> Result<ChainId, LedgerError> {
        let resp: ChainIdResult = self.call("chain_id", serde_json::json!({})).await?;
        Ok(ChainId::new(resp.chain_id))
    }
}

/// Map the gateway's `error` member. Reverts and signer refusals come
/// with a `code`; everything else is treated as an outage.
fn gateway_error(err: &serde_json::Value) -> LedgerError {
    let message = err
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| err.as_str())
        .unwrap_or("unknown gateway error")
        .to_string();
    match err.get("code").and_then(|c| c.as_str()) {
        Some("reverted") => LedgerError::Reverted(message),
        Some("user_rejected") => LedgerError::UserRejected(message),
        _ => LedgerError::Unavailable(message),
    }
}

#[derive(Debug, Deserialize)]
struct ChainIdResult {
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct CandidateResult {
    id: u64,
    name: String,
    party: String,
    vote_count: u64,
}

impl CandidateResult {
    /// The reply must describe the candidate that was asked for.
    fn into_candidate(self, requested: CandidateId) -> Result<Candidate, LedgerError> {
        if self.id != requested.as_u64() {
            return Err(LedgerError::Unavailable(format!(
                "asked for candidate {requested}, gateway returned {}",
                self.id
            )));
        }
        Ok(Candidate {
            id: requested,
            name: self.name,
            party: self.party,
            vote_count: self.vote_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DatesResult {
    start: u64,
    end: u64,
}

#[derive(Debug, Deserialize)]
struct VotedResult {
    voted: bool,
}

#[derive(Debug, Deserialize)]
struct SubmitResult {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptResult {
    status: String,
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default)]
    reason: Option<String>,
}

// ── Contract ───────────────────────────────────────────────────────────

impl ContractConnector for GatewayClient {
    fn connect(
        &self,
        _transport: Arc<dyn WalletTransport>,
        address: &AccountAddress,
        _abi: &Abi,
        signer: &AccountAddress,
    ) -> Arc<dyn VotingContract> {
        Arc::new(GatewayContract {
            client: self.clone(),
            contract: address.clone(),
            from: signer.clone(),
        })
    }
}

/// Voting contract reached through the gateway.
pub struct GatewayContract {
    client: GatewayClient,
    contract: AccountAddress,
    from: AccountAddress,
}

impl GatewayContract {
    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<T, LedgerError> {
        self.client
            .call(
                "call",
                serde_json::json!({
                    "to": self.contract.as_str(),
                    "from": self.from.as_str(),
                    "method": method,
                    "args": args,
                }),
            )
            .await
    }

    async fn send(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<Box<dyn PendingTx>, LedgerError> {
        let resp: SubmitResult = self
            .client
            .call(
                "send_transaction",
                serde_json::json!({
                    "to": self.contract.as_str(),
                    "from": self.from.as_str(),
                    "method": method,
                    "args": args,
                }),
            )
            .await?;
        debug!(method, tx = %resp.hash, "transaction submitted");
        Ok(Box::new(GatewayTx {
            client: self.client.clone(),
            hash: resp.hash,
        }))
    }
}

#[async_trait]
impl VotingContract for GatewayContract {
    async fn get_count_candidates(&self) -> Result<u64, LedgerError> {
        let resp: CountResult = self.read("getCountCandidates", serde_json::json!([])).await?;
        Ok(resp.count)
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Candidate, LedgerError> {
        let resp: CandidateResult = self
            .read("getCandidate", serde_json::json!([id.as_u64()]))
            .await?;
        resp.into_candidate(id)
    }

    async fn add_candidate(
        &self,
        name: &str,
        party: &str,
    ) -> Result<Box<dyn PendingTx>, LedgerError> {
        self.send("addCandidate", serde_json::json!([name, party])).await
    }

    async fn set_dates(&self, start: u64, end: u64) -> Result<Box<dyn PendingTx>, LedgerError> {
        self.send("setDates", serde_json::json!([start, end])).await
    }

    async fn get_dates(&self) -> Result<VotingWindow, LedgerError> {
        let resp: DatesResult = self.read("getDates", serde_json::json!([])).await?;
        Ok(VotingWindow::new(resp.start, resp.end))
    }

    async fn check_vote(&self) -> Result<bool, LedgerError> {
        let resp: VotedResult = self.read("checkVote", serde_json::json!([])).await?;
        Ok(resp.voted)
    }

    async fn vote(&self, candidate: CandidateId) -> Result<Box<dyn PendingTx>, LedgerError> {
        self.send("vote", serde_json::json!([candidate.as_u64()])).await
    }
}

/// A transaction relayed by the gateway; `wait` polls for its receipt.
pub struct GatewayTx {
    client: GatewayClient,
    hash: String,
}

#[async_trait]
impl PendingTx for GatewayTx {
    fn tx_hash(&self) -> &str {
        &self.hash
    }

    async fn wait(self: Box<Self>) -> Result<TxReceipt, LedgerError> {
        loop {
            let receipt: ReceiptResult = self
                .client
                .call("get_receipt", serde_json::json!({ "hash": self.hash }))
                .await?;
            match receipt.status.as_str() {
                "confirmed" => {
                    return Ok(TxReceipt {
                        tx_hash: self.hash,
                        block_number: receipt.block_number,
                    })
                }
                "reverted" => {
                    return Err(LedgerError::Reverted(
                        receipt
                            .reason
                            .unwrap_or_else(|| "transaction reverted".to_string()),
                    ))
                }
                _ => tokio::time::sleep(self.client.poll_interval).await,
            }
        }
    }
}

// ── GatewayWallet ──────────────────────────────────────────────────────

/// Transport half of [`GatewayWallet`]: the gateway signs for `account`.
pub struct GatewayTransport {
    client: GatewayClient,
    account: AccountAddress,
}

#[async_trait]
impl WalletTransport for GatewayTransport {
    async fn chain_id(&self) -> Result<ChainId, TransportError> {
        self.client
            .chain_id()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))
    }

    async fn signer_address(&self) -> Result<AccountAddress, TransportError> {
        Ok(self.account.clone())
    }
}

/// Wallet stand-in for headless use: a fixed account on whatever chain the
/// gateway serves. It never emits change notifications, but still tracks
/// registrations so teardown behaves as with a real wallet SDK.
pub struct GatewayWallet {
    transport: Arc<GatewayTransport>,
    chain_id: ChainId,
    handlers: Arc<Mutex<HashSet<u64>>>,
    next_id: AtomicU64,
}

impl GatewayWallet {
    /// Ask the gateway which chain it serves and build the wallet.
    pub async fn connect(
        client: GatewayClient,
        account: AccountAddress,
    ) -> Result<Self, ClientError> {
        let chain_id = client.chain_id().await?;
        Ok(Self {
            transport: Arc::new(GatewayTransport { client, account }),
            chain_id,
            handlers: Arc::new(Mutex::new(HashSet::new())),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn chain(&self) -> ChainId {
        self.chain_id
    }

    fn register(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        let handlers = Arc::clone(&self.handlers);
        Subscription::new(move || {
            handlers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
        })
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl WalletSdk for GatewayWallet {
    fn subscribe_account(&self, _handler: AccountHandler) -> Subscription {
        self.register()
    }

    fn subscribe_network(&self, _handler: NetworkHandler) -> Subscription {
        self.register()
    }

    fn wallet_transport(&self) -> Option<Arc<dyn WalletTransport>> {
        Some(self.transport.clone() as Arc<dyn WalletTransport>)
    }

    fn address(&self) -> Option<AccountAddress> {
        Some(self.transport.account.clone())
    }

    fn state(&self) -> WalletState {
        WalletState {
            selected_network: Some(self.chain_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_code_maps_to_reverted() {
        let err = gateway_error(&serde_json::json!({
            "code": "reverted",
            "message": "execution reverted: already voted"
        }));
        assert_eq!(
            err,
            LedgerError::Reverted("execution reverted: already voted".into())
        );
    }

    #[test]
    fn user_rejection_code() {
        let err = gateway_error(&serde_json::json!({
            "code": "user_rejected",
            "message": "user denied transaction signature"
        }));
        assert!(matches!(err, LedgerError::UserRejected(_)));
    }

    #[test]
    fn plain_string_error_is_unavailable() {
        let err = gateway_error(&serde_json::json!("node syncing"));
        assert_eq!(err, LedgerError::Unavailable("node syncing".into()));
    }

    #[test]
    fn candidate_reply_must_match_requested_id() {
        let reply = || CandidateResult {
            id: 3,
            name: "Carol".into(),
            party: "Green".into(),
            vote_count: 7,
        };
        let three = CandidateId::new(3).unwrap();
        let candidate = reply().into_candidate(three).unwrap();
        assert_eq!(candidate.id, three);
        assert_eq!(candidate.vote_count, 7);

        let err = reply().into_candidate(CandidateId::new(2).unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
    }

    #[test]
    fn client_creation() {
        let client =
            GatewayClient::new("http://127.0.0.1:8545", Duration::from_millis(500)).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8545");
    }
}
