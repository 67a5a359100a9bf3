//! Configuration loading from disk and environment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::{DeploymentFile, LedgerConfig};
use crate::config::validation::{build_config, env, ValidationError};

/// Deployment file used when `LEDGER_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "ledger.config.json";

/// Network used when `LEDGER_NETWORK` is unset.
pub const DEFAULT_NETWORK: &str = "holesky";

/// Secrets file looked up from the working directory upwards.
pub const ENV_FILE: &str = ".env";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("cannot load {}: {reason}", .path.display())]
    EnvFile { path: PathBuf, reason: String },

    #[error("{}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Parse a deployment file; TOML when the extension says so, JSON otherwise.
pub fn parse_deployment_file(path: &Path, content: &str) -> Result<DeploymentFile, ConfigError> {
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let parsed = if is_toml {
        toml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Load the deployment file at `path`.
pub fn load_deployment_file(path: &Path) -> Result<DeploymentFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_deployment_file(path, &content)
}

/// Merge a `.env` file into the process environment. Variables that are
/// already set keep their value. A missing file is not an error; a malformed
/// one is.
pub fn load_env_file() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::EnvFile {
            path: PathBuf::from(ENV_FILE),
            reason: e.to_string(),
        }),
    }
}

/// Read the variables of an env file without touching the process environment.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_file_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    dotenvy::from_path_iter(path)
        .map_err(env_file_error)?
        .map(|item| item.map_err(env_file_error))
        .collect()
}

/// Load and validate configuration using an arbitrary variable lookup.
pub fn load_config_with<E>(vars: E) -> Result<LedgerConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let path = vars(env::CONFIG_PATH)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let network = vars(env::NETWORK)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NETWORK.to_string());

    let file = load_deployment_file(Path::new(&path))?;
    let config = build_config(&file, network.trim(), &vars).map_err(ConfigError::Validation)?;

    tracing::debug!(
        path = %path,
        network = %config.chain.network,
        chain_id = config.chain.chain_id,
        contract = %config.ledger.contract_address,
        policy = %config.approval.policy_address,
        "Configuration loaded"
    );
    Ok(config)
}

/// Load and validate configuration from the process environment.
pub fn load_config() -> Result<LedgerConfig, ConfigError> {
    load_config_with(|name| std::env::var(name).ok())
}
