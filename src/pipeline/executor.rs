//! Transaction pipeline: build → approve → sign/broadcast → confirm.
//!
//! Every fault is turned into a [`PipelineFailure`] carrying the state the
//! pipeline stopped in. Nothing here retries; nothing here panics.

use alloy::primitives::TxHash;

use crate::approval::{ApprovalError, ApprovalGateway, ApprovedTransaction};
use crate::blockchain::types::ChainContext;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{ContractCaller, LedgerClient, LedgerEntry, UnsignedCall};
use crate::pipeline::signer::{ReceiptStatus, SubmissionError, TransactionReceipt, TransactionSigner};
use crate::pipeline::state::PipelineState;

/// Mutating ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Write,
    Delete,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::Write => "write",
            Operation::Delete => "delete",
        }
    }
}

/// A mutating operation that stopped short of `Confirmed`.
#[derive(Debug, thiserror::Error)]
#[error("{error} (stopped at {state})")]
pub struct PipelineFailure {
    pub state: PipelineState,
    #[source]
    pub error: LedgerError,
}

impl PipelineFailure {
    pub fn new(state: PipelineState, error: impl Into<LedgerError>) -> Self {
        Self {
            state,
            error: error.into(),
        }
    }
}

/// Orchestrates policy-gated writes and ungated reads against one ledger.
#[derive(Debug)]
pub struct TransactionPipeline<C, G, S> {
    ledger: LedgerClient<C>,
    gateway: G,
    signer: S,
}

impl<C, G, S> TransactionPipeline<C, G, S>
where
    C: ContractCaller,
    G: ApprovalGateway,
    S: TransactionSigner,
{
    pub fn new(ledger: LedgerClient<C>, gateway: G, signer: S) -> Self {
        Self {
            ledger,
            gateway,
            signer,
        }
    }

    pub fn ledger(&self) -> &LedgerClient<C> {
        &self.ledger
    }

    /// Set `key` to the decimal `raw_value`.
    pub async fn write(&self, key: &str, raw_value: &str) -> Result<TransactionReceipt, PipelineFailure> {
        let call = self
            .ledger
            .build_write(key, raw_value)
            .map_err(|e| PipelineFailure::new(PipelineState::Built, e))?;
        self.execute(Operation::Write, key, call).await
    }

    /// Remove `key`. Only the contract owner can do this; others revert.
    pub async fn delete(&self, key: &str) -> Result<TransactionReceipt, PipelineFailure> {
        let call = self
            .ledger
            .build_delete(key)
            .map_err(|e| PipelineFailure::new(PipelineState::Built, e))?;
        self.execute(Operation::Delete, key, call).await
    }

    /// Ungated read.
    pub async fn read(&self, key: &str) -> LedgerResult<Option<LedgerEntry>> {
        Ok(self.ledger.read(key).await?)
    }

    /// Ungated existence check.
    pub async fn exists(&self, key: &str) -> LedgerResult<bool> {
        Ok(self.ledger.exists(key).await?)
    }

    async fn execute(
        &self,
        op: Operation,
        key: &str,
        call: UnsignedCall,
    ) -> Result<TransactionReceipt, PipelineFailure> {
        let context = self.signer.context();
        let request = call.into_request(&context);
        request
            .ensure_complete()
            .map_err(|e| PipelineFailure::new(PipelineState::Built, e))?;
        transition(op, key, PipelineState::Built);

        transition(op, key, PipelineState::Approving);
        let approved = match self.gateway.approve(&request).await {
            Ok(approved) => approved,
            Err(err @ ApprovalError::Rejected { .. }) => {
                return Err(PipelineFailure::new(PipelineState::Rejected, err));
            }
            Err(err) => return Err(PipelineFailure::new(PipelineState::Approving, err)),
        };
        check_approved(&approved, &context).map_err(|e| PipelineFailure::new(PipelineState::Approving, e))?;
        if approved.to != request.to || approved.data != request.data {
            tracing::info!(
                operation = op.as_str(),
                to = %approved.to,
                "Approval rewrote the transaction"
            );
        }
        transition(op, key, PipelineState::Approved);

        transition(op, key, PipelineState::Broadcasting);
        let hash = self
            .signer
            .sign_and_broadcast(&approved)
            .await
            .map_err(|e| submission_failure(e, None))?;
        tracing::info!(operation = op.as_str(), tx_hash = %hash, "Transaction broadcast");

        transition(op, key, PipelineState::Pending);
        let receipt = self
            .signer
            .await_confirmation(&approved, hash)
            .await
            .map_err(|e| submission_failure(e, Some(hash)))?;

        match &receipt.status {
            ReceiptStatus::Success => {
                transition(op, key, PipelineState::Confirmed);
                tracing::info!(
                    operation = op.as_str(),
                    tx_hash = %receipt.hash,
                    block_number = ?receipt.block_number,
                    gas_used = receipt.gas_used,
                    "Transaction confirmed"
                );
                Ok(receipt)
            }
            ReceiptStatus::Reverted { reason } => Err(PipelineFailure::new(
                PipelineState::Reverted,
                LedgerError::Reverted {
                    tx_hash: Some(receipt.hash),
                    reason: reason.clone(),
                },
            )),
        }
    }
}

/// The signer is the only source of sender and chain; an approval that moves
/// either cannot be signed as-is.
fn check_approved(approved: &ApprovedTransaction, context: &ChainContext) -> Result<(), ApprovalError> {
    if approved.chain_id != context.chain_id {
        return Err(ApprovalError::Unavailable(format!(
            "malformed approval response: chain id {} does not match signer chain {}",
            approved.chain_id, context.chain_id
        )));
    }
    if approved.from != context.sender {
        return Err(ApprovalError::Unavailable(format!(
            "malformed approval response: sender {} is not the signer {}",
            approved.from, context.sender
        )));
    }
    if approved.to.is_zero() || approved.data.is_empty() {
        return Err(ApprovalError::Unavailable(
            "malformed approval response: empty transaction".to_string(),
        ));
    }
    Ok(())
}

fn submission_failure(err: SubmissionError, hash: Option<TxHash>) -> PipelineFailure {
    match err {
        SubmissionError::Reverted { tx_hash, reason } => PipelineFailure::new(
            PipelineState::Reverted,
            LedgerError::Reverted {
                tx_hash: tx_hash.or(hash),
                reason,
            },
        ),
        err @ SubmissionError::Broadcast(_) => PipelineFailure::new(PipelineState::BroadcastFailed, err),
    }
}

fn transition(op: Operation, key: &str, state: PipelineState) {
    tracing::debug!(operation = op.as_str(), key = %key, state = %state, "Pipeline transition");
}
