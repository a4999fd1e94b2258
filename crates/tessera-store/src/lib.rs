//! # tessera-store
//!
//! Object store, account ledger and consensus clock consumed by the budget
//! engine, plus [`MemoryStore`], an in-memory implementation of all of them.
//!
//! ## Modules
//!
//! - [`memory`] — arena-backed [`MemoryStore`] with secondary indexes
//! - [`table`] — id-keyed table used by the arena
//!
//! Every accessor hands out owned copies. Callers mutate through
//! `modify_*`, which replaces the stored row as a whole, and wrap multi-step
//! work in [`Transactional::transaction`] so a failure discards it all.

pub mod memory;
pub mod table;

pub use memory::{ChainState, MemoryStore};

use tessera_types::{
    Account, AccountName, Asset, BlockNum, Budget, BudgetId, BudgetOwner, BudgetSchedule,
    BudgetScheduleLink, LinkId, ScheduleId, ScheduleRule, Timestamp, TypesError,
};

/// Error types for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No row with the given id.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Object kind ("budget", "schedule", ...).
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// An account with this name already exists.
    #[error("account already exists: {0}")]
    DuplicateAccount(AccountName),

    /// The reserved system name cannot be registered as an account.
    #[error("account name is reserved")]
    ReservedAccount,

    /// An account cannot cover a debit.
    #[error("insufficient balance on {account}: have {available}, need {required}")]
    InsufficientBalance {
        /// The debited account.
        account: AccountName,
        /// Its balance.
        available: Asset,
        /// The requested debit.
        required: Asset,
    },

    /// Block time moved backwards.
    #[error("block time {requested} precedes head block time {head}")]
    TimeRewind {
        /// Current head block time.
        head: Timestamp,
        /// Rejected block time.
        requested: Timestamp,
    },

    /// State could not be encoded for hashing.
    #[error("state serialization failed: {0}")]
    Serialization(String),

    /// Asset arithmetic failed.
    #[error(transparent)]
    Asset(#[from] TypesError),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Indexed storage of budgets, schedules and the links between them.
///
/// Equal-range lookups return rows in insertion order.
pub trait ObjectStore {
    /// Allocate an id and store the budget built from it.
    fn create_budget(&mut self, build: impl FnOnce(BudgetId) -> Budget) -> Budget;
    fn budget(&self, id: BudgetId) -> Result<Budget>;
    /// Replace a budget with the result of `mutate` applied to a copy.
    fn modify_budget(&mut self, id: BudgetId, mutate: impl FnOnce(&mut Budget)) -> Result<Budget>;
    fn remove_budget(&mut self, id: BudgetId) -> Result<()>;
    /// All budget ids in creation order.
    fn budget_ids(&self) -> Vec<BudgetId>;
    fn budgets_by_owner(&self, owner: &BudgetOwner) -> Vec<BudgetId>;

    fn create_schedule(&mut self, rule: ScheduleRule) -> BudgetSchedule;
    fn schedule(&self, id: ScheduleId) -> Result<BudgetSchedule>;
    fn modify_schedule(
        &mut self,
        id: ScheduleId,
        mutate: impl FnOnce(&mut BudgetSchedule),
    ) -> Result<BudgetSchedule>;
    fn remove_schedule(&mut self, id: ScheduleId) -> Result<()>;

    fn create_link(&mut self, budget: BudgetId, schedule: ScheduleId) -> BudgetScheduleLink;
    fn link(&self, id: LinkId) -> Result<BudgetScheduleLink>;
    fn remove_link(&mut self, id: LinkId) -> Result<()>;
    fn links_by_budget(&self, budget: BudgetId) -> Vec<BudgetScheduleLink>;
    fn links_by_schedule(&self, schedule: ScheduleId) -> Vec<BudgetScheduleLink>;
}

/// Liquid account balances.
///
/// Callers check asset symbols before crediting or debiting.
pub trait AccountLedger {
    fn get_account(&self, name: &AccountName) -> Result<Account>;
    fn increase_balance(&mut self, name: &AccountName, amount: Asset) -> Result<()>;
    /// Debit an account. Fails rather than going below zero.
    fn decrease_balance(&mut self, name: &AccountName, amount: Asset) -> Result<()>;
}

/// Consensus-agreed chain clock.
pub trait ChainClock {
    fn head_block_num(&self) -> BlockNum;
    fn head_block_time(&self) -> Timestamp;
    fn genesis_time(&self) -> Timestamp;
}

/// All-or-nothing execution of a unit of work.
pub trait Transactional {
    /// Run `work`; if it returns `Err`, every mutation it made is discarded.
    ///
    /// Transactions nest: an inner failure rolls back only the inner work
    /// unless the error is propagated further.
    fn transaction<T, E>(
        &mut self,
        work: impl FnOnce(&mut Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>;
}

/// Everything the budget engine needs from the chain database.
pub trait ChainDatabase: ObjectStore + AccountLedger + ChainClock + Transactional {}

impl<T: ObjectStore + AccountLedger + ChainClock + Transactional> ChainDatabase for T {}
