//! Configuration schema definitions.
//!
//! Two layers: the deployment file as written on disk (serde types, every
//! field optional) and the validated [`LedgerConfig`] handed to components.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contract name looked up under `networks.<name>.contracts` by default.
pub const DEFAULT_CONTRACT_NAME: &str = "SimpleStorage";

/// Deployment file as found on disk.
///
/// ```json
/// { "networks": { "holesky": {
///     "contracts": { "SimpleStorage": "0x..." },
///     "policyAddress": "0x..."
/// } } }
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentFile {
    /// Per-network deployment entries keyed by network name.
    pub networks: BTreeMap<String, NetworkEntry>,
}

/// One network's deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NetworkEntry {
    /// Chain ID; optional for well-known networks.
    pub chain_id: Option<u64>,

    /// Deployed contract addresses by contract name.
    pub contracts: BTreeMap<String, String>,

    /// Policy identity the approval service evaluates against.
    pub policy_address: Option<String>,

    /// Confirmations to wait for (default 1).
    pub confirmations: Option<u32>,

    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: Option<u64>,
}

/// Chain ID of a well-known network name.
pub fn known_chain_id(network: &str) -> Option<u64> {
    match network {
        "mainnet" | "ethereum" => Some(1),
        "sepolia" => Some(11_155_111),
        "holesky" => Some(17_000),
        "anvil" | "localhost" | "hardhat" => Some(31_337),
        _ => None,
    }
}

/// Validated, immutable configuration for one process.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub chain: ChainConfig,
    pub ledger: LedgerSettings,
    pub approval: ApprovalConfig,
    pub signer: SignerConfig,
    pub observability: ObservabilityConfig,
}

/// RPC connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Network name the deployment entry was taken from.
    pub network: String,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 17000 for Holesky, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations to wait for.
    pub confirmation_blocks: u32,

    /// Upper bound on the confirmation wait. `None` waits indefinitely.
    pub confirmation_timeout_secs: Option<u64>,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: "holesky".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 17_000,
            rpc_timeout_secs: 30,
            confirmation_blocks: 1,
            confirmation_timeout_secs: None,
            poll_interval_ms: 2_000,
        }
    }
}

/// Which ledger contract to talk to.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub contract_name: String,
    pub contract_address: Address,
    /// Fractional digits of stored values.
    pub decimals: u8,
}

/// Remote policy service settings.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    pub endpoint: url::Url,
    pub policy_address: Address,
    /// HTTP timeout; `None` leaves the client default.
    pub timeout_secs: Option<u64>,
    /// Caller-side retries on unavailability (0 disables).
    pub retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

/// Signing credential.
#[derive(Clone)]
pub struct SignerConfig {
    pub private_key: SecretString,
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &self.private_key)
            .finish()
    }
}

/// String that never shows up in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
}
