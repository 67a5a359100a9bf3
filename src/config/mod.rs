//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! deployment file (JSON/TOML) + environment variables (.env merged in first)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (presence and format checks, all errors collected)
//!     → LedgerConfig (validated, immutable)
//!     → passed by reference to every component
//! ```
//!
//! # Design Decisions
//! - Loaded exactly once at startup, before any command is parsed
//! - Missing contract address, policy address or environment value is fatal

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_with, load_env_file, read_env_file, ConfigError};
pub use schema::{ApprovalConfig, ChainConfig, LedgerConfig, LogFormat};
pub use validation::ValidationError;
