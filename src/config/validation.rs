//! Configuration validation.
//!
//! # Responsibilities
//! - Combine the deployment file with environment values
//! - Check presence of every required value (addresses, endpoints, key)
//! - Parse addresses, URLs and numbers into their typed forms
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before any command is parsed

use alloy::primitives::Address;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{
    known_chain_id, ApprovalConfig, ChainConfig, DeploymentFile, LedgerConfig, LedgerSettings, LogFormat,
    ObservabilityConfig, SecretString, SignerConfig, DEFAULT_CONTRACT_NAME,
};
use crate::ledger::LEDGER_DECIMALS;

/// Environment variable names.
pub mod env {
    pub const CONFIG_PATH: &str = "LEDGER_CONFIG_PATH";
    pub const NETWORK: &str = "LEDGER_NETWORK";
    pub const CONTRACT_NAME: &str = "LEDGER_CONTRACT_NAME";
    pub const RPC_URL: &str = "LEDGER_RPC_URL";
    pub const RPC_FAILOVER_URLS: &str = "LEDGER_RPC_FAILOVER_URLS";
    pub const PRIVATE_KEY: &str = "LEDGER_PRIVATE_KEY";
    pub const APPROVAL_URL: &str = "LEDGER_APPROVAL_URL";
    pub const APPROVAL_TIMEOUT_SECS: &str = "LEDGER_APPROVAL_TIMEOUT_SECS";
    pub const APPROVAL_RETRIES: &str = "LEDGER_APPROVAL_RETRIES";
    pub const CONFIRMATION_TIMEOUT_SECS: &str = "LEDGER_CONFIRMATION_TIMEOUT_SECS";
    pub const LOG_FORMAT: &str = "LEDGER_LOG_FORMAT";
}

/// One problem found while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is not set")]
    MissingEnv(&'static str),

    #[error("network '{0}' not found in deployment file")]
    UnknownNetwork(String),

    #[error("no address for contract '{contract}' on network '{network}'")]
    MissingContractAddress { network: String, contract: String },

    #[error("no policyAddress on network '{0}'")]
    MissingPolicyAddress(String),

    #[error("network '{0}' has no chainId and is not a known network")]
    MissingChainId(String),

    #[error("{field} '{value}' is not a valid address")]
    InvalidAddress { field: String, value: String },

    #[error("{field} '{value}' is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, value: String, reason: String },

    #[error("{field} '{value}' is not a valid number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0}")]
    InvalidLogFormat(String),
}

/// Build a validated configuration for `network` from the deployment file and
/// an environment lookup.
pub fn build_config<E>(file: &DeploymentFile, network: &str, vars: E) -> Result<LedgerConfig, Vec<ValidationError>>
where
    E: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();
    let lookup = |name: &str| vars(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    // Required environment first, so every missing variable is reported.
    let rpc_url = require(&lookup, env::RPC_URL, &mut errors);
    let private_key = require(&lookup, env::PRIVATE_KEY, &mut errors);
    let approval_url = require(&lookup, env::APPROVAL_URL, &mut errors);

    let contract_name = lookup(env::CONTRACT_NAME).unwrap_or_else(|| DEFAULT_CONTRACT_NAME.to_string());

    let entry = file.networks.get(network);
    if entry.is_none() {
        errors.push(ValidationError::UnknownNetwork(network.to_string()));
    }

    let contract_address = entry.and_then(|e| match e.contracts.get(&contract_name).map(|s| s.trim()) {
        Some(raw) if !raw.is_empty() => parse_address(&format!("contracts.{}", contract_name), raw, &mut errors),
        _ => {
            errors.push(ValidationError::MissingContractAddress {
                network: network.to_string(),
                contract: contract_name.clone(),
            });
            None
        }
    });

    let policy_address = entry.and_then(|e| match e.policy_address.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_address("policyAddress", raw, &mut errors),
        _ => {
            errors.push(ValidationError::MissingPolicyAddress(network.to_string()));
            None
        }
    });

    let chain_id = entry.and_then(|e| {
        let id = e.chain_id.or_else(|| known_chain_id(network));
        if id.is_none() {
            errors.push(ValidationError::MissingChainId(network.to_string()));
        }
        id
    });

    if let Some(url) = &rpc_url {
        check_url(env::RPC_URL, url, &mut errors);
    }
    let endpoint = approval_url.as_deref().and_then(|url| check_url(env::APPROVAL_URL, url, &mut errors));

    let failover_urls: Vec<String> = lookup(env::RPC_FAILOVER_URLS)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let approval_timeout = optional_number::<u64, _>(&lookup, env::APPROVAL_TIMEOUT_SECS, &mut errors);
    let retries = optional_number::<u32, _>(&lookup, env::APPROVAL_RETRIES, &mut errors).unwrap_or(0);
    let confirmation_timeout = optional_number::<u64, _>(&lookup, env::CONFIRMATION_TIMEOUT_SECS, &mut errors);

    let log_format = match lookup(env::LOG_FORMAT) {
        Some(v) => v.parse::<LogFormat>().unwrap_or_else(|e| {
            errors.push(ValidationError::InvalidLogFormat(e));
            LogFormat::default()
        }),
        None => LogFormat::default(),
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    // Every Option below is Some once no errors were recorded.
    let (Some(entry), Some(rpc_url), Some(private_key), Some(endpoint), Some(contract_address), Some(policy_address), Some(chain_id)) =
        (entry, rpc_url, private_key, endpoint, contract_address, policy_address, chain_id)
    else {
        return Err(vec![ValidationError::UnknownNetwork(network.to_string())]);
    };

    let defaults = ChainConfig::default();
    Ok(LedgerConfig {
        chain: ChainConfig {
            network: network.to_string(),
            rpc_url,
            failover_urls,
            chain_id,
            rpc_timeout_secs: entry.rpc_timeout_secs.unwrap_or(defaults.rpc_timeout_secs),
            confirmation_blocks: entry.confirmations.unwrap_or(defaults.confirmation_blocks).max(1),
            confirmation_timeout_secs: confirmation_timeout,
            poll_interval_ms: defaults.poll_interval_ms,
        },
        ledger: LedgerSettings {
            contract_name,
            contract_address,
            decimals: LEDGER_DECIMALS,
        },
        approval: ApprovalConfig {
            endpoint,
            policy_address,
            timeout_secs: approval_timeout,
            retries,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
        },
        signer: SignerConfig {
            private_key: SecretString::new(private_key),
        },
        observability: ObservabilityConfig { log_format },
    })
}

fn require<L>(lookup: &L, name: &'static str, errors: &mut Vec<ValidationError>) -> Option<String>
where
    L: Fn(&str) -> Option<String>,
{
    let value = lookup(name);
    if value.is_none() {
        errors.push(ValidationError::MissingEnv(name));
    }
    value
}

fn optional_number<T, L>(lookup: &L, name: &'static str, errors: &mut Vec<ValidationError>) -> Option<T>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ValidationError::InvalidNumber { field: name, value: raw });
            None
        }
    }
}

fn parse_address(field: &str, raw: &str, errors: &mut Vec<ValidationError>) -> Option<Address> {
    match Address::from_str(raw) {
        Ok(addr) if !addr.is_zero() => Some(addr),
        _ => {
            errors.push(ValidationError::InvalidAddress {
                field: field.to_string(),
                value: raw.to_string(),
            });
            None
        }
    }
}

fn check_url(field: &'static str, raw: &str, errors: &mut Vec<ValidationError>) -> Option<url::Url> {
    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            errors.push(ValidationError::InvalidUrl {
                field,
                value: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
            None
        }
        Err(e) => {
            errors.push(ValidationError::InvalidUrl {
                field,
                value: raw.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}
