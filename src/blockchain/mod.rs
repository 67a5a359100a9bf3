//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig (RPC URL, chain id), private key
//!     → wallet.rs (key loading, chain-bound signer)
//!     → client.rs (RPC connection with timeouts, reads)
//!     → transaction.rs (sign, broadcast, confirm, revert reasons)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC reads have configurable timeouts

pub mod client;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use transaction::ChainSigner;
pub use types::{BlockchainError, ChainContext, ChainId};
pub use wallet::Wallet;
