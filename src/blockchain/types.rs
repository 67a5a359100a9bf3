//! Chain identity and RPC-level failures.

use alloy::primitives::Address;
use thiserror::Error;

pub use crate::config::schema::ChainConfig;

/// EIP-155 chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity every outgoing transaction is stamped with.
///
/// Derived once from the signer; both write and delete paths read it from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: ChainId,
    pub sender: Address,
}

/// Failures talking to the node, independent of what was being asked.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Node unreachable, or it answered with an error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Every provider timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The signing key could not be loaded.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The node serves a different chain than configured.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

pub type BlockchainResult<T> = Result<T, BlockchainError>;
