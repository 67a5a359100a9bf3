//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce structured events via `tracing` macros
//!     → logging.rs (subscriber: env filter + pretty or JSON formatter)
//!     → stderr
//! ```
//!
//! Command results are printed to stdout by the dispatcher and never mixed
//! with log output.

pub mod logging;

pub use logging::init_logging;
