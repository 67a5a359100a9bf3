//! Error taxonomy shared by the pipeline and the dispatcher.
//!
//! Each subsystem has its own error type; all of them converge on
//! [`LedgerError`], whose [`ErrorKind`] decides the process exit code.

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::approval::ApprovalError;
use crate::blockchain::BlockchainError;
use crate::config::ConfigError;
use crate::ledger::RequestError;
use crate::pipeline::SubmissionError;

/// Coarse classification of a failure, used for exit codes and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigurationIncomplete,
    InvalidRequest,
    ApprovalRejected,
    ApprovalUnavailable,
    BroadcastFailed,
    Reverted,
    ReadFailed,
}

impl ErrorKind {
    /// Process exit code for this kind.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::ConfigurationIncomplete => 10,
            ErrorKind::InvalidRequest => 11,
            ErrorKind::ApprovalRejected => 20,
            ErrorKind::ApprovalUnavailable => 21,
            ErrorKind::BroadcastFailed => 30,
            ErrorKind::Reverted => 31,
            ErrorKind::ReadFailed => 40,
        }
    }

    /// Short tag printed in front of diagnostics.
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::ConfigurationIncomplete => "config",
            ErrorKind::InvalidRequest => "invalid-request",
            ErrorKind::ApprovalRejected => "policy-rejected",
            ErrorKind::ApprovalUnavailable => "approval-unavailable",
            ErrorKind::BroadcastFailed => "broadcast-failed",
            ErrorKind::Reverted => "chain-reverted",
            ErrorKind::ReadFailed => "read-failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Any failure a ledger command can end in.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Configuration or chain identity is unusable. Fatal before any command runs.
    #[error("configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// Local validation failed; nothing was sent to the network.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// The policy service declined the transaction.
    #[error("policy rejected the transaction: {reason}")]
    ApprovalRejected { reason: String },

    /// The policy service could not be reached or answered nonsense.
    #[error("approval service unavailable: {0}")]
    ApprovalUnavailable(String),

    /// The signer or the network refused the signed transaction.
    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    /// The chain executed the transaction and the contract rejected it.
    #[error("transaction reverted on-chain{}: {}", fmt_hash(.tx_hash), .reason.as_deref().unwrap_or("no reason given"))]
    Reverted {
        tx_hash: Option<TxHash>,
        reason: Option<String>,
    },

    /// A read-only contract call failed.
    #[error("ledger read failed: {0}")]
    ReadFailed(#[source] BlockchainError),
}

fn fmt_hash(hash: &Option<TxHash>) -> String {
    hash.map(|h| format!(" ({h})")).unwrap_or_default()
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::ConfigurationIncomplete(_) => ErrorKind::ConfigurationIncomplete,
            LedgerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            LedgerError::ApprovalRejected { .. } => ErrorKind::ApprovalRejected,
            LedgerError::ApprovalUnavailable(_) => ErrorKind::ApprovalUnavailable,
            LedgerError::BroadcastFailed(_) => ErrorKind::BroadcastFailed,
            LedgerError::Reverted { .. } => ErrorKind::Reverted,
            LedgerError::ReadFailed(_) => ErrorKind::ReadFailed,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Hash of the transaction, when it is known to have reached the chain.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            LedgerError::Reverted { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}

impl From<ApprovalError> for LedgerError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::Rejected { reason } => LedgerError::ApprovalRejected { reason },
            ApprovalError::Unavailable(detail) => LedgerError::ApprovalUnavailable(detail),
        }
    }
}

impl From<SubmissionError> for LedgerError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Broadcast(detail) => LedgerError::BroadcastFailed(detail),
            SubmissionError::Reverted { tx_hash, reason } => LedgerError::Reverted { tx_hash, reason },
        }
    }
}

impl From<ConfigError> for LedgerError {
    fn from(err: ConfigError) -> Self {
        LedgerError::ConfigurationIncomplete(err.to_string())
    }
}

/// Result type for ledger commands.
pub type LedgerResult<T> = Result<T, LedgerError>;
