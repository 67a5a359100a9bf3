//! Approval gateway subsystem.
//!
//! # Data Flow
//! ```text
//! TransactionRequest
//!     → gateway.rs (POST to policy service, classify the answer)
//!     → types.rs (wire payloads, ApprovedTransaction)
//!     → retry.rs (optional, caller-side backoff on unavailability)
//! ```
//!
//! # Contract
//! - The returned transaction may differ from the request; it is the one to sign
//! - A rejection is terminal and never retried

pub mod gateway;
pub mod retry;
pub mod types;

pub use gateway::{ApprovalGateway, HttpApprovalGateway};
pub use retry::RetryingGateway;
pub use types::{ApprovalError, ApprovedTransaction};
