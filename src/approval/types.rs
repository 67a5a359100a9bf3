//! Approval protocol types.
//!
//! Quantities go over the wire as strings so nothing is lost to JSON number
//! precision; responses are accepted with decimal strings, hex strings or
//! plain numbers.

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::blockchain::ChainId;
use crate::ledger::TransactionRequest;

/// Why an approval attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// The policy said no. Terminal.
    #[error("rejected by policy: {reason}")]
    Rejected { reason: String },

    /// The service was unreachable or its answer unusable. Safe to retry.
    #[error("approval service unavailable: {0}")]
    Unavailable(String),
}

impl ApprovalError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApprovalError::Unavailable(_))
    }
}

/// Transaction certified by the policy service. This, not the original
/// request, is what gets signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: ChainId,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: Option<u64>,
}

impl ApprovedTransaction {
    /// Approval that leaves the request untouched.
    pub fn unchanged(request: &TransactionRequest) -> Self {
        Self {
            from: request.from,
            to: request.to,
            data: request.data.clone(),
            value: request.value,
            chain_id: request.chain_id,
            gas_limit: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            nonce: None,
        }
    }
}

/// Body of an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPayload {
    pub from: String,
    pub to: String,
    pub data: String,
    pub value: String,
    pub chain_id: String,
    pub policy_address: String,
}

impl ApprovalPayload {
    pub fn new(request: &TransactionRequest, policy_address: Address) -> Self {
        Self {
            from: request.from.to_string(),
            to: request.to.to_string(),
            data: request.data.to_string(),
            value: request.value.to_string(),
            chain_id: request.chain_id.to_string(),
            policy_address: policy_address.to_string(),
        }
    }
}

/// A numeric field as it may appear in a response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

impl Quantity {
    pub fn to_u256(&self) -> Result<U256, String> {
        match self {
            Quantity::Number(n) => Ok(U256::from(*n)),
            Quantity::Text(s) => U256::from_str(s.trim()).map_err(|e| format!("bad quantity '{}': {}", s, e)),
        }
    }

    fn to_u64(&self) -> Result<u64, String> {
        let v = self.to_u256()?;
        u64::try_from(v).map_err(|_| format!("quantity {} out of range", v))
    }

    fn to_u128(&self) -> Result<u128, String> {
        let v = self.to_u256()?;
        u128::try_from(v).map_err(|_| format!("quantity {} out of range", v))
    }
}

/// Response body, covering both the approved transaction shape and the
/// rejection shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    pub approved: Option<bool>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub data: Option<String>,
    pub value: Option<Quantity>,
    pub chain_id: Option<Quantity>,
    #[serde(alias = "gasLimit")]
    pub gas: Option<Quantity>,
    pub gas_price: Option<Quantity>,
    pub max_fee_per_gas: Option<Quantity>,
    pub max_priority_fee_per_gas: Option<Quantity>,
    pub nonce: Option<Quantity>,
    #[serde(flatten)]
    pub rejection: RejectionPayload,
}

/// Human-readable rejection details.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectionPayload {
    pub reason: Option<String>,
    pub message: Option<String>,
    pub error: Option<serde_json::Value>,
}

impl RejectionPayload {
    /// Best available reason text, if any.
    pub fn reason(&self) -> Option<String> {
        if let Some(reason) = self.reason.as_ref().filter(|r| !r.is_empty()) {
            return Some(reason.clone());
        }
        if let Some(message) = self.message.as_ref().filter(|m| !m.is_empty()) {
            return Some(message.clone());
        }
        match &self.error {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Object(obj)) => obj
                .get("message")
                .or_else(|| obj.get("reason"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}

impl ApprovalResponse {
    /// Whether the body carries a transaction rather than only a verdict.
    pub fn has_transaction(&self) -> bool {
        self.to.is_some() || self.data.is_some()
    }

    /// Turn the response into an approved transaction, checking it against
    /// the request it answers.
    pub fn into_approved(self, request: &TransactionRequest) -> Result<ApprovedTransaction, ApprovalError> {
        let malformed = |what: String| ApprovalError::Unavailable(format!("malformed approval response: {}", what));

        let to = match self.to.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Address::from_str(s).map_err(|e| malformed(format!("bad 'to': {}", e)))?,
            _ => return Err(malformed("missing 'to'".into())),
        };
        let data = match self.data.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() && s != "0x" => {
                Bytes::from_str(s).map_err(|e| malformed(format!("bad 'data': {}", e)))?
            }
            _ => return Err(malformed("missing 'data'".into())),
        };

        let from = match self.from.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                let from = Address::from_str(s).map_err(|e| malformed(format!("bad 'from': {}", e)))?;
                if from != request.from {
                    return Err(malformed(format!("sender changed to {}", from)));
                }
                from
            }
            _ => request.from,
        };

        let chain_id = match &self.chain_id {
            Some(q) => {
                let id = ChainId(q.to_u64().map_err(malformed)?);
                if id != request.chain_id {
                    return Err(malformed(format!("chain id changed to {}", id)));
                }
                id
            }
            None => request.chain_id,
        };

        let value = match &self.value {
            Some(q) => q.to_u256().map_err(malformed)?,
            None => request.value,
        };

        Ok(ApprovedTransaction {
            from,
            to,
            data,
            value,
            chain_id,
            gas_limit: self.gas.as_ref().map(Quantity::to_u64).transpose().map_err(malformed)?,
            gas_price: self.gas_price.as_ref().map(Quantity::to_u128).transpose().map_err(malformed)?,
            max_fee_per_gas: self.max_fee_per_gas.as_ref().map(Quantity::to_u128).transpose().map_err(malformed)?,
            max_priority_fee_per_gas: self
                .max_priority_fee_per_gas
                .as_ref()
                .map(Quantity::to_u128)
                .transpose()
                .map_err(malformed)?,
            nonce: self.nonce.as_ref().map(Quantity::to_u64).transpose().map_err(malformed)?,
        })
    }
}
