//! # tessera-budget
//!
//! Budget allocation and per-block disbursement engine.
//!
//! A budget locks core tokens and pays `per_block` out of them on every
//! block where one of its schedules admits the block time. The engine is
//! part of the state transition: it reads time only from the chain clock
//! and every public operation is atomic against the chain database.
//!
//! ## Modules
//!
//! - [`service`] — [`BudgetService`]: budget lifecycle, balances, lookups
//! - [`schedule`] — schedule input validation and rule construction
//! - [`schedules`] — schedule lifecycle on [`BudgetService`]
//! - [`allocation`] — the per-block allocation algorithm
//! - [`processing`] — block driver running allocation for every budget
//! - [`operations`] — transaction-level operations

pub mod allocation;
#[cfg(test)]
mod fixtures;
pub mod operations;
pub mod processing;
pub mod schedule;
pub mod schedules;
pub mod service;

pub use operations::{BudgetOperation, OperationOutcome, ScheduleParams};
pub use processing::{apply_block, process_block, BlockReport, Disbursement};
pub use schedule::{ScheduleInput, ScheduleShape};
pub use schedules::ScheduleRemoval;
pub use service::BudgetService;

use tessera_store::StoreError;
use tessera_types::{
    Asset, BudgetId, ScheduleAlg, ScheduleId, ShareType, Timestamp, TypesError,
};

/// Error types for budget operations.
///
/// Every variant aborts the enclosing operation; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    /// The operation is only defined for ordinary budgets.
    #[error("not allowed for genesis budget {0}")]
    GenesisBudget(BudgetId),

    /// The reserved system account cannot open an ordinary budget.
    #[error("not allowed for ordinary budget: owner name is reserved")]
    ReservedOwner,

    /// The owner has no budgets.
    #[error("budget not found for owner {0}")]
    NoBudgets(String),

    /// An ordinary budget has no schedule links.
    #[error("schedule not found for budget {0}")]
    NoSchedules(BudgetId),

    /// A schedule is not linked to any budget.
    #[error("schedule link not found for schedule {0}")]
    UnlinkedSchedule(ScheduleId),

    /// A schedule is linked to more than one budget.
    #[error("only one budget per schedule is allowed, schedule {schedule} has {links} links")]
    SharedSchedule {
        /// The offending schedule.
        schedule: ScheduleId,
        /// Number of links found.
        links: usize,
    },

    /// Per-block payout must be positive.
    #[error("invalid per_block: {0}")]
    InvalidPerBlock(ShareType),

    /// Amounts moved in or out of a budget must be positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(Asset),

    /// Schedule input does not fit the requested algorithm.
    #[error("invalid for {alg} algorithm: {reason}")]
    InvalidSchedule {
        /// The requested algorithm.
        alg: ScheduleAlg,
        /// What was wrong with the input.
        reason: &'static str,
    },

    /// A time range that does not move forward.
    #[error("invalid time range: start {start} must precede end {end}")]
    InvalidTimeRange {
        /// Resolved start.
        start: Timestamp,
        /// Resolved end.
        end: Timestamp,
    },

    /// The owner cannot fund the budget.
    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds {
        /// Owner balance.
        available: Asset,
        /// Requested contribution.
        required: Asset,
    },

    /// Asset or algorithm value error.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// Store lookup or mutation error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience result type for budget operations.
pub type Result<T> = std::result::Result<T, BudgetError>;
