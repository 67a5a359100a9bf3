//! Policy-gated key/value ledger client library.

pub mod approval;
pub mod blockchain;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod observability;
pub mod pipeline;
pub mod resilience;

pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError};
pub use pipeline::TransactionPipeline;
