//! Read side of the chain connection.
//!
//! # Responsibilities
//! - Hold one provider per configured RPC endpoint (primary first)
//! - Run every read through the same timeout and failover policy
//! - Serve `eth_call` reads for the ledger

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt as RpcReceipt, TransactionRequest};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig, ChainId};
use crate::ledger::ContractCaller;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// RPC reader with ordered failover across endpoints.
#[derive(Clone)]
pub struct BlockchainClient {
    providers: Vec<SharedProvider>,
    config: ChainConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Only URL parsing can fail here; connectivity is checked lazily.
    pub fn new(config: ChainConfig) -> BlockchainResult<Self> {
        let primary: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e)))?;

        let mut providers: Vec<SharedProvider> = vec![Arc::new(ProviderBuilder::new().connect_http(primary))];
        for raw in &config.failover_urls {
            match raw.parse::<url::Url>() {
                Ok(url) => providers.push(Arc::new(ProviderBuilder::new().connect_http(url))),
                Err(_) => tracing::warn!(url = %raw, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            network = %config.network,
            providers = providers.len(),
            "Blockchain client created"
        );

        Ok(Self {
            providers,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            config,
        })
    }

    /// Fail with `ChainMismatch` unless the node serves the configured chain.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = self.get_chain_id().await?;
        if actual.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: actual.0,
            });
        }
        tracing::info!(network = %self.config.network, chain_id = actual.0, "Connected to expected chain");
        Ok(())
    }

    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    pub async fn get_transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<RpcReceipt>> {
        self.with_failover("get receipt", move |p| async move { p.get_transaction_receipt(tx_hash).await })
            .await
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.with_failover("call contract", |p| {
            let request = request.clone();
            async move { p.call(request).await }
        })
        .await
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }

    /// Try each provider in order. An error response from a node is final,
    /// since any other node would give the same answer; transport faults and
    /// timeouts move on to the next provider.
    async fn with_failover<T, F, Fut>(&self, operation: &'static str, op: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut timed_out = false;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if e.as_error_resp().is_some() => {
                    return Err(BlockchainError::Rpc(format!("{} failed: {}", operation, e)));
                }
                Ok(Err(e)) => {
                    timed_out = false;
                    tracing::warn!(provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(provider_idx = i, operation, "RPC timeout, trying next provider");
                }
            }
        }

        if timed_out {
            return Err(BlockchainError::Timeout(self.config.rpc_timeout_secs));
        }
        Err(BlockchainError::Rpc(format!("All RPC providers failed to {}", operation)))
    }
}

#[async_trait]
impl ContractCaller for BlockchainClient {
    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        BlockchainClient::call(self, to, data).await
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("network", &self.config.network)
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("providers", &self.providers.len())
            .finish()
    }
}
