//! Caller-side retry for transient approval failures.
//!
//! Rejections are final and returned at once; only `Unavailable` is retried.

use async_trait::async_trait;
use tokio::time::sleep;

use crate::approval::gateway::ApprovalGateway;
use crate::approval::types::{ApprovalError, ApprovedTransaction};
use crate::ledger::TransactionRequest;
use crate::resilience::Backoff;

/// Gateway wrapper that retries unavailability with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryingGateway<G> {
    inner: G,
    max_retries: u32,
    backoff: Backoff,
}

impl<G> RetryingGateway<G> {
    pub fn new(inner: G, max_retries: u32, backoff: Backoff) -> Self {
        Self {
            inner,
            max_retries,
            backoff,
        }
    }
}

#[async_trait]
impl<G: ApprovalGateway> ApprovalGateway for RetryingGateway<G> {
    async fn approve(&self, request: &TransactionRequest) -> Result<ApprovedTransaction, ApprovalError> {
        let mut attempt = 0;
        loop {
            match self.inner.approve(request).await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff.delay(attempt);
                    tracing::warn!(
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Approval service unavailable, retrying"
                    );
                    sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
