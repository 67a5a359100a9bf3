//! Command dispatcher: runs a parsed command through the pipeline and turns
//! the outcome into a report and an exit code.

use alloy::primitives::TxHash;

use crate::approval::ApprovalGateway;
use crate::cli::command::Command;
use crate::error::LedgerError;
use crate::ledger::{ContractCaller, LedgerEntry};
use crate::pipeline::{PipelineFailure, PipelineState, TransactionReceipt, TransactionPipeline, TransactionSigner};

/// Exit code when `get` finds no value.
pub const NOT_FOUND_EXIT_CODE: u8 = 3;

/// What a successful command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReport {
    Written { key: String, value: String, receipt: TransactionReceipt },
    Removed { key: String, receipt: TransactionReceipt },
    Value(LedgerEntry),
    NotFound { key: String },
    Exists { key: String, exists: bool },
}

impl CommandReport {
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandReport::NotFound { .. } => NOT_FOUND_EXIT_CODE,
            _ => 0,
        }
    }

    /// Hash of the confirmed transaction, for mutations.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            CommandReport::Written { receipt, .. } | CommandReport::Removed { receipt, .. } => Some(receipt.hash),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandReport::Written { key, value, receipt } => {
                write!(f, "set \"{}\" = {} (tx {}{})", key, value, receipt.hash, fmt_block(receipt))
            }
            CommandReport::Removed { key, receipt } => {
                write!(f, "removed \"{}\" (tx {}{})", key, receipt.hash, fmt_block(receipt))
            }
            CommandReport::Value(entry) => write!(f, "{}", entry.value),
            CommandReport::NotFound { key } => write!(f, "key \"{}\" not found", key),
            CommandReport::Exists { key, exists } => {
                write!(f, "key \"{}\" {}", key, if *exists { "exists" } else { "does not exist" })
            }
        }
    }
}

fn fmt_block(receipt: &TransactionReceipt) -> String {
    receipt
        .block_number
        .map(|n| format!(", block {}", n))
        .unwrap_or_default()
}

/// A failed command with the pipeline state it ended in, if it got that far.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct CommandError {
    pub state: Option<PipelineState>,
    #[source]
    pub error: LedgerError,
}

impl CommandError {
    pub fn exit_code(&self) -> u8 {
        self.error.exit_code()
    }

    /// Kind-tagged, multi-line diagnostic including the source chain.
    pub fn diagnostic(&self) -> String {
        let mut out = format!("[{}] {}", self.error.kind().tag(), self.error);
        if let Some(state) = self.state {
            out.push_str(&format!("\n  stopped at: {}", state));
            if self.error.tx_hash().is_some() {
                out.push_str(" (transaction was broadcast)");
            }
        }
        let mut source = std::error::Error::source(&self.error);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }
}

impl From<PipelineFailure> for CommandError {
    fn from(failure: PipelineFailure) -> Self {
        Self {
            state: Some(failure.state),
            error: failure.error,
        }
    }
}

impl From<LedgerError> for CommandError {
    fn from(error: LedgerError) -> Self {
        Self { state: None, error }
    }
}

/// Routes commands to the pipeline.
pub struct Dispatcher<C, G, S> {
    pipeline: TransactionPipeline<C, G, S>,
}

impl<C, G, S> Dispatcher<C, G, S>
where
    C: ContractCaller,
    G: ApprovalGateway,
    S: TransactionSigner,
{
    pub fn new(pipeline: TransactionPipeline<C, G, S>) -> Self {
        Self { pipeline }
    }

    pub async fn dispatch(&self, command: Command) -> Result<CommandReport, CommandError> {
        tracing::info!(
            command = command.name(),
            key = %command.key(),
            gated = command.is_mutation(),
            "Dispatching command"
        );

        match command {
            Command::Set { key, value } => {
                let receipt = self.pipeline.write(&key, &value).await?;
                let value = self
                    .pipeline
                    .ledger()
                    .parse_value(&value)
                    .map(|v| v.to_string())
                    .unwrap_or(value);
                Ok(CommandReport::Written { key, value, receipt })
            }
            Command::Remove { key } => {
                let receipt = self.pipeline.delete(&key).await?;
                Ok(CommandReport::Removed { key, receipt })
            }
            Command::Get { key } => match self.pipeline.read(&key).await? {
                Some(entry) => Ok(CommandReport::Value(entry)),
                None => Ok(CommandReport::NotFound { key }),
            },
            Command::Has { key } => {
                let exists = self.pipeline.exists(&key).await?;
                Ok(CommandReport::Exists { key, exists })
            }
        }
    }
}
