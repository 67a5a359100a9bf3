//! Chain-backed transaction signer.
//!
//! # Responsibilities
//! - Turn an approved transaction into a signed EIP-155 transaction
//! - Broadcast through a wallet-enabled provider
//! - Poll for the receipt until the required confirmations are reached
//! - Recover the revert reason of a failed transaction

use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::TxHash;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{decode_revert_reason, Revert};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::approval::ApprovedTransaction;
use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainContext};
use crate::blockchain::wallet::Wallet;
use crate::pipeline::{ReceiptStatus, SubmissionError, TransactionReceipt, TransactionSigner};

/// Signs with a local key and submits over JSON-RPC.
pub struct ChainSigner {
    /// Provider with the wallet attached; fills nonce and gas when missing.
    provider: Arc<dyn Provider + Send + Sync>,
    /// Read client used for receipts and block numbers.
    client: BlockchainClient,
    wallet: Wallet,
}

impl ChainSigner {
    pub fn new(client: BlockchainClient, wallet: Wallet) -> BlockchainResult<Self> {
        let rpc_url = &client.config().rpc_url;
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new()
            .wallet(wallet.network_wallet())
            .connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            client,
            wallet,
        })
    }

    /// Re-run the failed call at its block to learn why it reverted.
    async fn replay_revert_reason(&self, tx: &ApprovedTransaction, block_number: Option<u64>) -> Option<String> {
        let block = block_number.map(BlockId::number).unwrap_or_else(BlockId::latest);
        match self.provider.call(build_request(tx, &self.wallet)).block(block).await {
            Ok(_) => None,
            Err(e) => revert_reason(&e),
        }
    }
}

#[async_trait]
impl TransactionSigner for ChainSigner {
    fn context(&self) -> ChainContext {
        self.wallet.context()
    }

    async fn sign_and_broadcast(&self, tx: &ApprovedTransaction) -> Result<TxHash, SubmissionError> {
        let request = build_request(tx, &self.wallet);
        match self.provider.send_transaction(request).await {
            Ok(pending) => Ok(*pending.tx_hash()),
            Err(e) => Err(classify_send_error(&e)),
        }
    }

    async fn await_confirmation(
        &self,
        tx: &ApprovedTransaction,
        hash: TxHash,
    ) -> Result<TransactionReceipt, SubmissionError> {
        let config = self.client.config();
        let required = self.client.confirmation_blocks().max(1);
        let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));

        let wait = async {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let receipt = match self.client.get_transaction_receipt(hash).await {
                    Ok(Some(r)) => r,
                    Ok(None) => {
                        tracing::debug!(tx_hash = %hash, "Transaction pending");
                        continue;
                    }
                    Err(e) => return Err(lost_track(hash, e)),
                };

                if !receipt.status() {
                    let reason = self.replay_revert_reason(tx, receipt.block_number).await;
                    return Ok(TransactionReceipt {
                        hash,
                        status: ReceiptStatus::Reverted { reason },
                        block_number: receipt.block_number,
                        block_hash: receipt.block_hash,
                        gas_used: receipt.gas_used,
                    });
                }

                let current_block = self.client.get_block_number().await.map_err(|e| lost_track(hash, e))?;
                let tx_block = receipt.block_number.unwrap_or(current_block);
                let confirmations = current_block.saturating_sub(tx_block) as u32 + 1;

                if confirmations >= required {
                    return Ok(TransactionReceipt {
                        hash,
                        status: ReceiptStatus::Success,
                        block_number: receipt.block_number,
                        block_hash: receipt.block_hash,
                        gas_used: receipt.gas_used,
                    });
                }

                tracing::debug!(
                    tx_hash = %hash,
                    confirmations = confirmations,
                    required = required,
                    "Waiting for confirmations"
                );
            }
        };

        match config.confirmation_timeout_secs {
            None => wait.await,
            Some(secs) => match timeout(Duration::from_secs(secs), wait).await {
                Ok(result) => result,
                Err(_) => Err(SubmissionError::Broadcast(format!(
                    "transaction {} not confirmed within {} seconds",
                    hash, secs
                ))),
            },
        }
    }
}

impl std::fmt::Debug for ChainSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSigner")
            .field("address", &self.wallet.address())
            .field("chain_id", &self.wallet.chain_id())
            .finish()
    }
}

/// Approved transaction → RPC request. Sender and chain always come from the
/// wallet; everything else is taken verbatim from the approval.
pub(crate) fn build_request(tx: &ApprovedTransaction, wallet: &Wallet) -> TransactionRequest {
    let mut request = TransactionRequest::default()
        .with_from(wallet.address())
        .with_to(tx.to)
        .with_input(tx.data.clone())
        .with_value(tx.value)
        .with_chain_id(wallet.chain_id().0);

    if let Some(gas) = tx.gas_limit {
        request.set_gas_limit(gas);
    }
    if let Some(price) = tx.gas_price {
        request.set_gas_price(price);
    }
    if let Some(max_fee) = tx.max_fee_per_gas {
        request.set_max_fee_per_gas(max_fee);
    }
    if let Some(tip) = tx.max_priority_fee_per_gas {
        request.set_max_priority_fee_per_gas(tip);
    }
    if let Some(nonce) = tx.nonce {
        request.set_nonce(nonce);
    }
    request
}

/// The client has already walked every provider, so a lookup failure here is
/// final for this wait.
fn lost_track(hash: TxHash, err: BlockchainError) -> SubmissionError {
    tracing::error!(tx_hash = %hash, error = %err, "Lost contact with node while awaiting confirmation");
    SubmissionError::Broadcast(format!("transaction {} broadcast but its status is unknown: {}", hash, err))
}

/// Gas estimation runs the call; an execution revert there is the contract
/// saying no, not a transport problem.
fn classify_send_error(err: &TransportError) -> SubmissionError {
    if let Some(reason) = revert_reason(err) {
        tracing::warn!(reason = %reason, "Transaction reverted during submission");
        return SubmissionError::Reverted {
            tx_hash: None,
            reason: Some(reason),
        };
    }
    if is_execution_revert(err) {
        return SubmissionError::Reverted {
            tx_hash: None,
            reason: None,
        };
    }
    SubmissionError::Broadcast(err.to_string())
}

fn revert_reason(err: &TransportError) -> Option<String> {
    let payload = err.as_error_resp()?;
    if let Some(revert) = payload.as_decoded_error::<Revert>() {
        return Some(revert.reason);
    }
    // Panics and custom errors keep their decoded description.
    if let Some(data) = payload.as_revert_data() {
        if let Some(reason) = decode_revert_reason(&data) {
            return Some(reason);
        }
    }
    let message: &str = &payload.message;
    message
        .strip_prefix("execution reverted: ")
        .map(str::to_string)
        .filter(|m| !m.is_empty())
}

fn is_execution_revert(err: &TransportError) -> bool {
    err.as_error_resp()
        .map(|payload| payload.message.contains("execution reverted") || payload.as_revert_data().is_some())
        .unwrap_or(false)
}
