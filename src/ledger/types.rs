//! Ledger-level types: entries, calls and request validation errors.

use alloy::primitives::{Address, Bytes, U256};
use thiserror::Error;

use crate::blockchain::types::ChainContext;
use crate::blockchain::ChainId;
use crate::ledger::value::FixedPoint;

/// Local validation failures. Raised before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("key must not be empty")]
    EmptyKey,

    #[error("'{value}' is not a valid decimal value: {reason}")]
    InvalidValueFormat { value: String, reason: String },

    #[error("transaction request is incomplete: {0}")]
    Incomplete(&'static str),
}

/// A key and its decoded value as stored on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: String,
    pub value: FixedPoint,
}

/// Mutating contract call as built by the ledger client, before the sender and
/// chain are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl UnsignedCall {
    /// Attach sender and chain, producing the request sent for approval.
    pub fn into_request(self, context: &ChainContext) -> TransactionRequest {
        TransactionRequest {
            from: context.sender,
            to: self.to,
            data: self.data,
            value: self.value,
            chain_id: context.chain_id,
        }
    }
}

/// Fully specified transaction awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: ChainId,
}

impl TransactionRequest {
    /// Check every field is populated for submission.
    pub fn ensure_complete(&self) -> Result<(), RequestError> {
        if self.from.is_zero() {
            return Err(RequestError::Incomplete("missing sender"));
        }
        if self.to.is_zero() {
            return Err(RequestError::Incomplete("missing contract address"));
        }
        if self.data.is_empty() {
            return Err(RequestError::Incomplete("missing call data"));
        }
        if self.chain_id.0 == 0 {
            return Err(RequestError::Incomplete("missing chain id"));
        }
        Ok(())
    }
}

pub(crate) fn require_key(key: &str) -> Result<(), RequestError> {
    if key.is_empty() {
        return Err(RequestError::EmptyKey);
    }
    Ok(())
}
