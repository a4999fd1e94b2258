//! Fungible assets.
//!
//! An [`Asset`] is an amount tagged with its [`Symbol`]. Amounts are signed
//! so that balances can be reasoned about below zero, but arithmetic between
//! two assets is only defined when their symbols match.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, ShareType, TypesError};

/// Asset symbols known to the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    /// The liquid core token.
    Tsr,
    /// Staked core token.
    Tsp,
}

/// The only symbol budgets may hold.
pub const CORE_SYMBOL: Symbol = Symbol::Tsr;

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Tsr => f.write_str("TSR"),
            Symbol::Tsp => f.write_str("TSP"),
        }
    }
}

/// An amount of a single asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// Amount in the smallest unit.
    pub amount: ShareType,
    /// Which asset the amount is denominated in.
    pub symbol: Symbol,
}

impl Asset {
    /// Create an asset.
    pub const fn new(amount: ShareType, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    /// Create an amount of the core token.
    pub const fn core(amount: ShareType) -> Self {
        Self::new(amount, CORE_SYMBOL)
    }

    /// Zero of the given symbol.
    pub const fn zero(symbol: Symbol) -> Self {
        Self::new(0, symbol)
    }

    /// Whether the amount is strictly greater than zero.
    pub const fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Fail unless `self` is denominated in `symbol`.
    pub fn expect_symbol(&self, symbol: Symbol) -> Result<()> {
        if self.symbol != symbol {
            return Err(TypesError::SymbolMismatch {
                expected: symbol,
                actual: self.symbol,
            });
        }
        Ok(())
    }

    /// Add two assets of the same symbol.
    ///
    /// # Errors
    ///
    /// - [`TypesError::SymbolMismatch`] if the symbols differ
    /// - [`TypesError::Overflow`] on arithmetic overflow
    pub fn checked_add(self, other: Asset) -> Result<Asset> {
        other.expect_symbol(self.symbol)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(TypesError::Overflow)?;
        Ok(Asset::new(amount, self.symbol))
    }

    /// Subtract an asset of the same symbol.
    ///
    /// # Errors
    ///
    /// - [`TypesError::SymbolMismatch`] if the symbols differ
    /// - [`TypesError::Overflow`] on arithmetic overflow
    pub fn checked_sub(self, other: Asset) -> Result<Asset> {
        other.expect_symbol(self.symbol)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(TypesError::Overflow)?;
        Ok(Asset::new(amount, self.symbol))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol)
    }
}
