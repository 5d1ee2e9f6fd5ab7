//! Ballot CLI: entry point for viewing and voting from a terminal.

mod render;

use anyhow::{bail, Context};
use ballot_client::{
    AccountEvent, BindOutcome, ChainBinder, ClientConfig, ClientError, DeployedArtifacts,
    GatewayClient, GatewayWallet, SessionController, WalletEvent,
};
use ballot_types::{AccountAddress, CandidateId};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ballot", about = "Vote on the on-chain ballot")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "BALLOT_CONFIG")]
    config: Option<PathBuf>,

    /// Ledger gateway JSON-RPC endpoint.
    #[arg(long, env = "BALLOT_GATEWAY")]
    gateway: Option<String>,

    /// Account to vote from.
    #[arg(long, env = "BALLOT_ACCOUNT")]
    account: Option<AccountAddress>,

    /// Contract build artifact (ABI + deployed addresses).
    #[arg(long, env = "BALLOT_ARTIFACTS")]
    artifacts: Option<PathBuf>,

    /// Seconds to wait for a transaction receipt.
    #[arg(long, env = "BALLOT_CONFIRMATION_TIMEOUT")]
    confirmation_timeout: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Print the full view as JSON instead of text.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show account, network and voting window.
    Status,
    /// List candidates with their vote counts.
    Candidates,
    /// Vote for a candidate.
    Vote {
        /// Candidate id as listed by `candidates`.
        #[arg(long)]
        candidate: u64,
    },
    /// Register a new candidate.
    AddCandidate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        party: String,
    },
    /// Set the voting window. Accepts dates ("2024-01-31"), date-times
    /// ("2024-01-31T18:00") or Unix seconds.
    SetDates {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
}

fn load_config(cli: &Cli) -> (ClientConfig, Option<String>) {
    let file_config = cli.config.as_ref().map(|path| {
        ClientConfig::from_toml_file(&path.to_string_lossy())
            .map_err(|e| format!("failed to load {}: {e}, using defaults", path.display()))
    });
    let (mut config, warning) = match file_config {
        Some(Ok(config)) => (config, None),
        Some(Err(warning)) => (ClientConfig::default(), Some(warning)),
        None => (ClientConfig::default(), None),
    };

    if let Some(gateway) = &cli.gateway {
        config.gateway_url = gateway.clone();
    }
    if let Some(account) = &cli.account {
        config.account = Some(account.clone());
    }
    if let Some(artifacts) = &cli.artifacts {
        config.artifacts_path = artifacts.clone();
    }
    if let Some(secs) = cli.confirmation_timeout {
        config.confirmation_timeout_secs = secs;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    (config, warning)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, warning) = load_config(&cli);

    ballot_utils::init_tracing(&config.log_level, &config.log_format);
    match (&cli.config, warning) {
        (_, Some(warning)) => tracing::warn!("{warning}"),
        (Some(path), None) => tracing::info!("Loaded config from {}", path.display()),
        (None, None) => {}
    }

    let Some(account) = config.account.clone() else {
        bail!("no account configured; pass --account or set BALLOT_ACCOUNT");
    };
    let artifacts = DeployedArtifacts::from_json_file(&config.artifacts_path)?;
    tracing::debug!(
        contract = artifacts.contract_name(),
        chains = ?artifacts.chains(),
        "loaded deployment table"
    );

    let client = GatewayClient::new(&config.gateway_url, config.receipt_poll_interval())?;
    let wallet = GatewayWallet::connect(client.clone(), account.clone())
        .await
        .with_context(|| format!("cannot reach gateway at {}", config.gateway_url))?;
    tracing::info!(%account, chain = %wallet.chain(), "wallet ready");

    let binder = ChainBinder::new(artifacts, Arc::new(client));
    let controller = SessionController::new(Arc::new(wallet), binder, &config);

    let connect = WalletEvent::Account(AccountEvent::connected(account));
    let outcome = match controller.handle_event(connect) {
        Some(attempt) => attempt.await,
        None => bail!("wallet did not report a network"),
    };
    match outcome {
        BindOutcome::Bound => {}
        BindOutcome::Unsupported(_) => bail!("{}", controller.view().status_line()),
        BindOutcome::Disconnected(e) => return Err(e.into()),
        BindOutcome::Stale => bail!("wallet changed while connecting"),
    }

    let list_candidates = matches!(cli.command, Command::Candidates);
    let result = match cli.command {
        Command::Status | Command::Candidates => Ok(()),
        Command::Vote { candidate } => controller
            .cast_vote(CandidateId::new(candidate))
            .await
            .map(|receipt| {
                tracing::debug!(state = ?receipt.tx_state, "vote settled");
            }),
        Command::AddCandidate { name, party } => controller
            .submit_candidate(&name, &party)
            .await
            .map(|_| ()),
        Command::SetDates { start, end } => controller
            .set_voting_window(&start, &end)
            .await
            .map(|_| ()),
    };

    let view = controller.view();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", render::header(&config.metadata));
        if list_candidates {
            print!("{}", render::candidates(&view));
        } else {
            print!("{}", render::status(&view, ballot_utils::unix_now()));
        }
    }

    result.map_err(action_error)
}

/// Exit error for a failed action; says whether rerunning it may help.
fn action_error(e: ClientError) -> anyhow::Error {
    let kind = e.kind();
    let advice = if kind.is_retryable() {
        "safe to retry"
    } else {
        kind.hint()
    };
    anyhow::Error::new(e).context(format!("{kind} ({advice})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_failures_say_so() {
        let err = action_error(ClientError::LedgerRejected("nonce too low".into()));
        assert_eq!(err.to_string(), "ledger_rejected (safe to retry)");
        assert_eq!(err.root_cause().to_string(), "nonce too low");
    }

    #[test]
    fn final_failures_carry_the_hint() {
        let err = action_error(ClientError::AlreadyVoted);
        assert_eq!(err.to_string(), "already_voted (each account can vote once)");
        assert_eq!(err.root_cause().to_string(), "this account has already voted");
    }
}
