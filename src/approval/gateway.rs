//! HTTP client for the remote policy service.

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::approval::types::{ApprovalError, ApprovalPayload, ApprovalResponse, ApprovedTransaction};
use crate::config::ApprovalConfig;
use crate::ledger::TransactionRequest;

/// Something that can vet a transaction and hand back the version to sign.
#[async_trait]
pub trait ApprovalGateway: Send + Sync {
    async fn approve(&self, request: &TransactionRequest) -> Result<ApprovedTransaction, ApprovalError>;
}

/// Policy service reached over HTTP, scoped to one policy address.
#[derive(Debug, Clone)]
pub struct HttpApprovalGateway {
    client: Client,
    endpoint: url::Url,
    policy_address: Address,
}

impl HttpApprovalGateway {
    pub fn new(config: &ApprovalConfig) -> Result<Self, ApprovalError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ApprovalError::Unavailable(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            policy_address: config.policy_address,
        })
    }
}

#[async_trait]
impl ApprovalGateway for HttpApprovalGateway {
    async fn approve(&self, request: &TransactionRequest) -> Result<ApprovedTransaction, ApprovalError> {
        let payload = ApprovalPayload::new(request, self.policy_address);
        tracing::debug!(
            endpoint = %self.endpoint,
            payload = ?payload,
            "Requesting approval"
        );

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ApprovalError::Unavailable(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApprovalError::Unavailable(format!("failed to read response body: {}", e)))?;

        classify_response(status, &text, request)
    }
}

/// Map an HTTP answer onto approval, rejection or unavailability.
pub(crate) fn classify_response(
    status: StatusCode,
    body: &str,
    request: &TransactionRequest,
) -> Result<ApprovedTransaction, ApprovalError> {
    let parsed = serde_json::from_str::<ApprovalResponse>(body);

    if status == StatusCode::FORBIDDEN || status == StatusCode::UNPROCESSABLE_ENTITY {
        let reason = parsed
            .ok()
            .and_then(|r| r.rejection.reason())
            .unwrap_or_else(|| body.trim().to_string());
        return Err(rejected(reason, status));
    }

    if !status.is_success() {
        return Err(ApprovalError::Unavailable(format!(
            "approval service returned status {}: {}",
            status,
            body.trim()
        )));
    }

    let response = parsed
        .map_err(|e| ApprovalError::Unavailable(format!("undecodable approval response: {}", e)))?;

    if response.approved == Some(false) || (!response.has_transaction() && response.rejection.reason().is_some()) {
        let reason = response.rejection.reason().unwrap_or_default();
        return Err(rejected(reason, status));
    }

    response.into_approved(request)
}

fn rejected(reason: String, status: StatusCode) -> ApprovalError {
    let reason = if reason.is_empty() {
        format!("no reason given (status {})", status)
    } else {
        reason
    };
    tracing::warn!(reason = %reason, "Transaction rejected by policy");
    ApprovalError::Rejected { reason }
}
