//! Signing identity.
//!
//! The key arrives from configuration already validated as present; here it
//! is parsed, bound to a chain for EIP-155 and never printed.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainContext, ChainId};

/// Local key bound to one chain. The address and chain it yields are the
/// only sender identity the pipeline ever uses.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: ChainId,
}

impl Wallet {
    /// Accepts hex with or without `0x`, surrounding whitespace ignored.
    pub fn from_private_key(secret: &str, chain_id: ChainId) -> BlockchainResult<Self> {
        let hex = secret.trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);

        let signer = hex
            .parse::<PrivateKeySigner>()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?
            .with_chain_id(Some(chain_id.0));

        tracing::info!(address = %signer.address(), chain_id = chain_id.0, "Signing key loaded");
        Ok(Self { signer, chain_id })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn context(&self) -> ChainContext {
        ChainContext {
            chain_id: self.chain_id,
            sender: self.address(),
        }
    }

    /// Provider-side wallet for `ProviderBuilder::wallet`.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id.0)
            .finish()
    }
}
