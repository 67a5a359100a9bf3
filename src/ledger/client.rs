//! Ledger client: encodes domain operations as contract calls and decodes
//! read results.
//!
//! Mutations are only *built* here; sending them is the pipeline's job. Reads
//! go straight to the chain through a [`ContractCaller`].

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::ledger::contract::ISimpleStorage;
use crate::ledger::types::{require_key, LedgerEntry, RequestError, UnsignedCall};
use crate::ledger::value::FixedPoint;

/// Read-only `eth_call` capability.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes>;
}

/// Client for a single deployed ledger contract.
#[derive(Debug, Clone)]
pub struct LedgerClient<C> {
    caller: C,
    contract: Address,
    decimals: u8,
}

impl<C: ContractCaller> LedgerClient<C> {
    pub fn new(caller: C, contract: Address, decimals: u8) -> Self {
        Self {
            caller,
            contract,
            decimals,
        }
    }

    /// Address of the ledger contract.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Parse a decimal string at this ledger's precision.
    pub fn parse_value(&self, raw_value: &str) -> Result<FixedPoint, RequestError> {
        FixedPoint::parse(raw_value, self.decimals)
    }

    /// Build an unsigned `setValue` call.
    pub fn build_write(&self, key: &str, raw_value: &str) -> Result<UnsignedCall, RequestError> {
        require_key(key)?;
        let value = self.parse_value(raw_value)?;

        let call = ISimpleStorage::setValueCall {
            key: key.to_string(),
            value: value.raw(),
        };
        Ok(self.unsigned(call.abi_encode()))
    }

    /// Build an unsigned `removeValue` call. Ownership is enforced on-chain only.
    pub fn build_delete(&self, key: &str) -> Result<UnsignedCall, RequestError> {
        require_key(key)?;

        let call = ISimpleStorage::removeValueCall { key: key.to_string() };
        Ok(self.unsigned(call.abi_encode()))
    }

    /// Read the value stored under `key`, or `None` if the key is absent.
    pub async fn read(&self, key: &str) -> Result<Option<LedgerEntry>, LedgerReadError> {
        if !self.exists(key).await? {
            tracing::debug!(key = %key, "Key not present in ledger");
            return Ok(None);
        }

        let call = ISimpleStorage::getValueCall { key: key.to_string() };
        let output = self.caller.call(self.contract, call.abi_encode().into()).await?;
        let raw = U256::abi_decode(&output)
            .map_err(|e| BlockchainError::Rpc(format!("Undecodable getValue result: {}", e)))?;

        tracing::debug!(key = %key, raw = %raw, "Read ledger value");
        Ok(Some(LedgerEntry {
            key: key.to_string(),
            value: FixedPoint::from_raw(raw, self.decimals),
        }))
    }

    /// Whether `key` is present in the ledger.
    pub async fn exists(&self, key: &str) -> Result<bool, LedgerReadError> {
        require_key(key)?;

        let call = ISimpleStorage::hasKeyCall { key: key.to_string() };
        let output = self.caller.call(self.contract, call.abi_encode().into()).await?;
        let exists = bool::abi_decode(&output)
            .map_err(|e| BlockchainError::Rpc(format!("Undecodable hasKey result: {}", e)))?;
        Ok(exists)
    }

    fn unsigned(&self, data: Vec<u8>) -> UnsignedCall {
        UnsignedCall {
            to: self.contract,
            data: data.into(),
            value: U256::ZERO,
        }
    }
}

/// Failure on the read path: either the key was invalid or the call failed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerReadError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Chain(#[from] BlockchainError),
}

impl From<LedgerReadError> for crate::error::LedgerError {
    fn from(err: LedgerReadError) -> Self {
        match err {
            LedgerReadError::Request(e) => crate::error::LedgerError::InvalidRequest(e),
            LedgerReadError::Chain(e) => crate::error::LedgerError::ReadFailed(e),
        }
    }
}
