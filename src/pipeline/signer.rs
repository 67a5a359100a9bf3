//! Signing capability the pipeline depends on, and what it produces.

use alloy::primitives::{TxHash, B256};
use async_trait::async_trait;
use thiserror::Error;

use crate::approval::ApprovedTransaction;
use crate::blockchain::types::ChainContext;

/// Failure after the transaction left the approval stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Rejected by the signer or the node before inclusion.
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// Executed (or simulated) and rejected by contract logic.
    #[error("reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Reverted {
        tx_hash: Option<TxHash>,
        reason: Option<String>,
    },
}

/// Outcome of the transaction as recorded on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted { reason: Option<String> },
}

/// Terminal artifact of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub gas_used: u64,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Signs, broadcasts and follows transactions for one account on one chain.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Sender address and chain every request is stamped with.
    fn context(&self) -> ChainContext;

    /// Sign and submit. Returns once the node has accepted the transaction.
    async fn sign_and_broadcast(&self, tx: &ApprovedTransaction) -> Result<TxHash, SubmissionError>;

    /// Wait until the transaction has the required confirmations.
    ///
    /// A reverted transaction is a successful wait with a reverted status.
    async fn await_confirmation(
        &self,
        tx: &ApprovedTransaction,
        hash: TxHash,
    ) -> Result<TransactionReceipt, SubmissionError>;
}
