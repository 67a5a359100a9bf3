//! Command-line front end.
//!
//! # Data Flow
//! ```text
//! argv → command.rs (clap parse; usage errors never reach the network)
//!      → dispatcher.rs (pipeline call → CommandReport | CommandError → exit code)
//! ```

pub mod command;
pub mod dispatcher;

pub use command::{parse_args, Cli, Command, Parsed, USAGE_EXIT_CODE};
pub use dispatcher::{CommandError, CommandReport, Dispatcher, NOT_FOUND_EXIT_CODE};
