//! Policy-gated transaction pipeline.
//!
//! # Data Flow
//! ```text
//! LedgerClient::build_*          (Built)
//!     → ApprovalGateway::approve (Approving → Approved | Rejected)
//!     → TransactionSigner        (Broadcasting → Pending | BroadcastFailed)
//!     → receipt                  (Confirmed | Reverted)
//! ```
//!
//! Reads and existence checks bypass approval and signing entirely.

pub mod executor;
pub mod signer;
pub mod state;

pub use executor::{Operation, PipelineFailure, TransactionPipeline};
pub use signer::{ReceiptStatus, SubmissionError, TransactionReceipt, TransactionSigner};
pub use state::PipelineState;
