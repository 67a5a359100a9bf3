//! Resilience helpers.
//!
//! The transaction pipeline never retries on its own; callers that want to
//! ride out a flaky approval service wrap the gateway with a backoff policy.

pub mod backoff;

pub use backoff::Backoff;
