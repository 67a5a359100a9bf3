//! gated-ledger
//!
//! Mutates an on-chain key/value ledger only after a remote policy service
//! has approved the transaction.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv ──▶ config (file + .env + env, fatal if incomplete)
//!              │
//!              ▼
//!          cli::command ──usage error──▶ exit 2
//!              │
//!              ▼
//!          cli::dispatcher
//!              │
//!              ▼
//!   ┌──────────────────── pipeline ─────────────────────┐
//!   │ ledger::client ─▶ approval::gateway ─▶ signer     │──▶ chain
//!   │   (Built)           (Approving/Approved) (Pending)│
//!   └───────────────────────────────────────────────────┘
//!              │
//!              ▼
//!   report on stdout, kind-tagged diagnostic on stderr, exit code
//! ```

use std::process::ExitCode;

use gated_ledger::approval::{HttpApprovalGateway, RetryingGateway};
use gated_ledger::blockchain::{BlockchainClient, BlockchainError, ChainSigner, Wallet};
use gated_ledger::cli::{parse_args, CommandError, Dispatcher, Parsed, USAGE_EXIT_CODE};
use gated_ledger::config::{self, LedgerConfig};
use gated_ledger::ledger::LedgerClient;
use gated_ledger::observability::init_logging;
use gated_ledger::resilience::Backoff;
use gated_ledger::{LedgerError, TransactionPipeline};

#[tokio::main]
async fn main() -> ExitCode {
    // Configuration is checked before anything else, including argv.
    let loaded = config::load_env_file().and_then(|env_file| Ok((config::load_config()?, env_file)));

    // A broken configuration is still reported through the default format.
    let log_format = loaded
        .as_ref()
        .map(|(config, _)| config.observability.log_format)
        .unwrap_or_default();
    init_logging(log_format);

    let config = match loaded {
        Ok((config, env_file)) => {
            if let Some(path) = env_file {
                tracing::debug!(path = %path.display(), "Environment file loaded");
            }
            config
        }
        Err(e) => return fail(&CommandError::from(LedgerError::from(e))),
    };

    let command = match parse_args(std::env::args_os()) {
        Parsed::Run(command) => command,
        Parsed::Info(text) => {
            print!("{}", text);
            return ExitCode::SUCCESS;
        }
        Parsed::Usage(text) => {
            eprint!("{}", text);
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    let dispatcher = match connect(&config).await {
        Ok(dispatcher) => dispatcher,
        Err(e) => return fail(&CommandError::from(e)),
    };

    match dispatcher.dispatch(command).await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::from(report.exit_code())
        }
        Err(e) => fail(&e),
    }
}

type LiveDispatcher = Dispatcher<BlockchainClient, RetryingGateway<HttpApprovalGateway>, ChainSigner>;

/// Wire up components from configuration and check chain identity.
async fn connect(config: &LedgerConfig) -> Result<LiveDispatcher, LedgerError> {
    let incomplete = |e: &dyn std::fmt::Display| LedgerError::ConfigurationIncomplete(e.to_string());

    let client = BlockchainClient::new(config.chain.clone()).map_err(|e| incomplete(&e))?;
    match client.verify_chain_id().await {
        Ok(()) => {}
        Err(e @ BlockchainError::ChainMismatch { .. }) => return Err(incomplete(&e)),
        // Unreachable RPC is not a configuration problem; the command will report it.
        Err(e) => tracing::warn!(error = %e, "Could not verify chain id"),
    }

    let wallet = Wallet::from_private_key(config.signer.private_key.expose(), config.chain.chain_id.into())
        .map_err(|e| incomplete(&e))?;
    let signer = ChainSigner::new(client.clone(), wallet).map_err(|e| incomplete(&e))?;

    let gateway = HttpApprovalGateway::new(&config.approval).map_err(|e| incomplete(&e))?;
    let gateway = RetryingGateway::new(
        gateway,
        config.approval.retries,
        Backoff::new(config.approval.retry_base_delay_ms, config.approval.retry_max_delay_ms),
    );

    let ledger = LedgerClient::new(client, config.ledger.contract_address, config.ledger.decimals);
    Ok(Dispatcher::new(TransactionPipeline::new(ledger, gateway, signer)))
}

fn fail(error: &CommandError) -> ExitCode {
    tracing::error!(kind = %error.error.kind(), state = ?error.state, "{}", error.error);
    eprintln!("{}", error.diagnostic());
    ExitCode::from(error.exit_code())
}
