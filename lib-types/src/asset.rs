//! Asset amounts.
//!
//! Amounts are signed 64-bit integers in the smallest unit. All arithmetic on
//! balances goes through the checked helpers here; raw `+`/`-` on amounts is
//! reserved for reward math that has already been bounds-checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Decimal places of the liquid token
pub const WEAVE_PRECISION: u8 = 3;
/// Decimal places of vesting shares
pub const SHARES_PRECISION: u8 = 6;

/// Asset arithmetic / typing error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset symbol mismatch: {0:?} vs {1:?}")]
    SymbolMismatch(Symbol, Symbol),

    #[error("Asset amount overflow")]
    Overflow,

    #[error("Expected {expected:?} asset, got {actual:?}")]
    WrongSymbol { expected: Symbol, actual: Symbol },
}

/// Token symbol. The liquid token and the vesting share are the only two
/// assets in consensus state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Weave,
    Shares,
}

impl Symbol {
    pub const fn precision(&self) -> u8 {
        match self {
            Symbol::Weave => WEAVE_PRECISION,
            Symbol::Shares => SHARES_PRECISION,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Symbol::Weave => "WEAVE",
            Symbol::Shares => "SHARES",
        }
    }
}

/// An amount of one asset.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub const fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    pub const fn weave(amount: i64) -> Self {
        Self::new(amount, Symbol::Weave)
    }

    pub const fn shares(amount: i64) -> Self {
        Self::new(amount, Symbol::Shares)
    }

    pub const fn zero(symbol: Symbol) -> Self {
        Self::new(0, symbol)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    /// Checked same-symbol addition.
    pub fn checked_add(&self, other: Asset) -> Result<Asset, AssetError> {
        if self.symbol != other.symbol {
            return Err(AssetError::SymbolMismatch(self.symbol, other.symbol));
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(amount, self.symbol))
    }

    /// Checked same-symbol subtraction.
    pub fn checked_sub(&self, other: Asset) -> Result<Asset, AssetError> {
        if self.symbol != other.symbol {
            return Err(AssetError::SymbolMismatch(self.symbol, other.symbol));
        }
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(AssetError::Overflow)?;
        Ok(Asset::new(amount, self.symbol))
    }

    /// Require a specific symbol, typically at an evaluator boundary.
    pub fn expect_symbol(&self, expected: Symbol) -> Result<(), AssetError> {
        if self.symbol != expected {
            return Err(AssetError::WrongSymbol {
                expected,
                actual: self.symbol,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.symbol.precision() as u32;
        let scale = 10i64.pow(precision);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        let whole = abs / scale as u64;
        let frac = abs % scale as u64;
        write!(
            f,
            "{sign}{whole}.{frac:0width$} {}",
            self.symbol.name(),
            width = precision as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_math_enforces_symbols() {
        let a = Asset::weave(1_000);
        let b = Asset::shares(1_000);
        assert!(a.checked_add(b).is_err());
        assert_eq!(a.checked_add(Asset::weave(500)).unwrap().amount, 1_500);
    }

    #[test]
    fn display_formats_precision() {
        assert_eq!(Asset::weave(1_234).to_string(), "1.234 WEAVE");
        assert_eq!(Asset::shares(-1_500_000).to_string(), "-1.500000 SHARES");
        assert_eq!(Asset::weave(5).to_string(), "0.005 WEAVE");
    }
}
