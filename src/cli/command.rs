//! Command-line surface.

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, Subcommand};

/// Exit code for usage errors (matches clap's own).
pub const USAGE_EXIT_CODE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "gated-ledger")]
#[command(about = "Policy-gated key/value ledger client", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Set a key to a decimal value (requires policy approval)
    Set {
        key: String,
        /// Decimal value, up to 18 fractional digits
        value: String,
    },
    /// Print the value stored under a key
    Get { key: String },
    /// Remove a key (owner only, requires policy approval)
    Remove { key: String },
    /// Check whether a key exists
    Has { key: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Remove { .. } => "remove",
            Command::Has { .. } => "has",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Get { key } | Command::Remove { key } | Command::Has { key } => key,
        }
    }

    /// Whether the command goes through approval and signing.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Command::Set { .. } | Command::Remove { .. })
    }
}

/// Result of parsing the argument vector.
#[derive(Debug)]
pub enum Parsed {
    Run(Command),
    /// Help or version was requested; print and exit successfully.
    Info(String),
    /// Unknown command, wrong arity or no command at all.
    Usage(String),
}

/// Parse arguments (including the program name) without exiting the process.
pub fn parse_args<I, T>(args: I) -> Parsed
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Parsed::Run(cli.command),
        Err(e) => match e.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => Parsed::Info(e.to_string()),
            // A bare invocation still prints help, but on stderr with a usage exit.
            _ => Parsed::Usage(e.to_string()),
        },
    }
}
