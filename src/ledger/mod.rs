//! Key/value ledger subsystem.
//!
//! # Data Flow
//! ```text
//! key, raw value
//!     → value.rs (decimal string → fixed-point uint256)
//!     → contract.rs (ABI encoding)
//!     → client.rs (unsigned calls for the pipeline, eth_call reads)
//! ```

pub mod client;
pub mod contract;
pub mod types;
pub mod value;

pub use client::{ContractCaller, LedgerClient, LedgerReadError};
pub use types::{LedgerEntry, RequestError, TransactionRequest, UnsignedCall};
pub use value::{FixedPoint, LEDGER_DECIMALS};
