//! # tessera-types
//!
//! Shared domain types for the Tessera ledger: assets, accounts, consensus
//! timestamps and the budget/schedule entity model.

pub mod account;
pub mod asset;
pub mod budget;
pub mod time;

pub use account::{Account, AccountName, BudgetOwner, RESERVED_ACCOUNT_NAME};
pub use asset::{Asset, Symbol, CORE_SYMBOL};
pub use budget::{
    Budget, BudgetId, BudgetSchedule, BudgetScheduleLink, LinkId, ScheduleAlg, ScheduleId,
    ScheduleRule,
};
pub use time::Timestamp;

/// Block height.
pub type BlockNum = u32;

/// Signed amount in the smallest unit of an asset.
pub type ShareType = i64;

/// Error types for domain value operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// Two assets with different symbols were combined.
    #[error("invalid asset type (symbol): expected {expected}, got {actual}")]
    SymbolMismatch {
        /// Symbol of the left-hand operand.
        expected: Symbol,
        /// Symbol of the right-hand operand.
        actual: Symbol,
    },

    /// Arithmetic overflow on an asset amount.
    #[error("asset amount overflow")]
    Overflow,

    /// A raw schedule algorithm value has no matching variant.
    #[error("invalid algorithm: {0}")]
    UnknownScheduleAlg(u16),
}

/// Convenience result type for domain value operations.
pub type Result<T> = std::result::Result<T, TypesError>;
