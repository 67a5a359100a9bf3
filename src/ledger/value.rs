//! Fixed-point decimal values stored in the ledger.
//!
//! Values travel on-chain as `uint256` scaled by `10^decimals`.

use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy::primitives::U256;
use std::str::FromStr;

use crate::ledger::types::RequestError;

/// Fractional digits used by the ledger contract.
pub const LEDGER_DECIMALS: u8 = 18;

/// A non-negative decimal number with a fixed number of fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    raw: U256,
    decimals: u8,
}

impl FixedPoint {
    /// Wrap an already-scaled on-chain value.
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Parse a decimal string such as `100`, `1.5` or `.25`.
    ///
    /// Rejects signs, exponents, whitespace, more than `decimals` fractional
    /// digits, and values that overflow `uint256`.
    pub fn parse(input: &str, decimals: u8) -> Result<Self, RequestError> {
        let invalid = |reason: &str| RequestError::InvalidValueFormat {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        // parse_units accepts a sign and silently truncates extra precision.
        let (whole, fraction) = input.split_once('.').unwrap_or((input, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("empty number"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected digits with an optional decimal point"));
        }
        if fraction.len() > decimals as usize {
            return Err(invalid(&format!("more than {decimals} fractional digits")));
        }

        match parse_units(input, decimals) {
            Ok(ParseUnits::U256(raw)) => Ok(Self { raw, decimals }),
            _ => Err(invalid("value does not fit in uint256")),
        }
    }

    /// The scaled integer sent to the contract.
    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl FromStr for FixedPoint {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, LEDGER_DECIMALS)
    }
}

/// Shortest form: no trailing fractional zeros, no bare decimal point.
impl std::fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match format_units(self.raw, self.decimals) {
            Ok(formatted) if formatted.contains('.') => {
                f.write_str(formatted.trim_end_matches('0').trim_end_matches('.'))
            }
            Ok(formatted) => f.write_str(&formatted),
            // More decimals than a uint256 can scale by.
            Err(_) => write!(f, "{}e-{}", self.raw, self.decimals),
        }
    }
}
