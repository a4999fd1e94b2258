//! Transaction-level budget operations.
//!
//! User transactions carry a [`BudgetOperation`]. Schedule algorithms
//! arrive as raw numbers and are checked here; unknown values fail the
//! operation. Every operation executes against the head block time.

use serde::{Deserialize, Serialize};
use tessera_store::ChainDatabase;
use tessera_types::{
    AccountName, Asset, Budget, BudgetId, BudgetSchedule, ScheduleAlg, ScheduleId, ShareType,
    Timestamp,
};

use crate::schedule::ScheduleInput;
use crate::schedules::ScheduleRemoval;
use crate::service::BudgetService;
use crate::Result;

/// Schedule parameters as they appear in a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParams {
    /// Raw algorithm: 0 unconditional, 1 by time range, 2 by period.
    #[serde(default)]
    pub schedule_alg: Option<u16>,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub period: Option<u32>,
}

impl ScheduleParams {
    /// Decode into a schedule input.
    ///
    /// # Errors
    ///
    /// - [`crate::BudgetError::Types`] if `schedule_alg` is not a known algorithm
    pub fn to_input(&self) -> Result<ScheduleInput> {
        let alg = self.schedule_alg.map(ScheduleAlg::try_from).transpose()?;
        Ok(ScheduleInput {
            alg,
            start: self.start_date,
            end: self.end_date,
            period: self.period,
        })
    }
}

/// A budget operation carried by a user transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetOperation {
    CreateBudget {
        owner: AccountName,
        balance: Asset,
        per_block: ShareType,
        #[serde(default)]
        auto_close: bool,
    },
    UpdateBudget {
        budget: BudgetId,
        auto_close: bool,
    },
    CloseBudget {
        budget: BudgetId,
    },
    AppendSchedule {
        budget: BudgetId,
        #[serde(flatten)]
        params: ScheduleParams,
    },
    AdjustSchedule {
        schedule: ScheduleId,
        #[serde(flatten)]
        params: ScheduleParams,
    },
    LockSchedule {
        schedule: ScheduleId,
    },
    UnlockSchedule {
        schedule: ScheduleId,
    },
    RemoveSchedule {
        schedule: ScheduleId,
    },
    ClearSchedules {
        budget: BudgetId,
    },
}

/// Result of applying a [`BudgetOperation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    BudgetCreated { budget: Budget },
    /// The budget after the update, or `None` if the update closed it.
    BudgetUpdated { budget: Option<Budget> },
    BudgetClosed { budget: BudgetId },
    Schedule { schedule: BudgetSchedule },
    ScheduleRemoved { schedule: ScheduleId, removal: ScheduleRemoval },
    SchedulesCleared { budget: BudgetId },
}

impl BudgetOperation {
    /// Apply the operation atomically at the head block.
    ///
    /// # Errors
    ///
    /// Whatever the underlying [`BudgetService`] operation reports; the
    /// database is left unchanged on error.
    pub fn apply<D: ChainDatabase>(&self, db: &mut D) -> Result<OperationOutcome> {
        let mut service = BudgetService::new(db);
        let outcome = match self {
            BudgetOperation::CreateBudget {
                owner,
                balance,
                per_block,
                auto_close,
            } => OperationOutcome::BudgetCreated {
                budget: service.create_budget(owner, *balance, *per_block, *auto_close)?,
            },
            BudgetOperation::UpdateBudget { budget, auto_close } => {
                service.update_budget(*budget, *auto_close)?;
                OperationOutcome::BudgetUpdated {
                    budget: service.get_budget(*budget).ok(),
                }
            }
            BudgetOperation::CloseBudget { budget } => {
                service.close_budget(*budget)?;
                OperationOutcome::BudgetClosed { budget: *budget }
            }
            BudgetOperation::AppendSchedule { budget, params } => OperationOutcome::Schedule {
                schedule: service.append_schedule(*budget, params.to_input()?, None)?,
            },
            BudgetOperation::AdjustSchedule { schedule, params } => OperationOutcome::Schedule {
                schedule: service.adjust_schedule(*schedule, params.to_input()?, None)?,
            },
            BudgetOperation::LockSchedule { schedule } => OperationOutcome::Schedule {
                schedule: service.lock_schedule(*schedule)?,
            },
            BudgetOperation::UnlockSchedule { schedule } => OperationOutcome::Schedule {
                schedule: service.unlock_schedule(*schedule)?,
            },
            BudgetOperation::RemoveSchedule { schedule } => OperationOutcome::ScheduleRemoved {
                schedule: *schedule,
                removal: service.remove_schedule(*schedule)?,
            },
            BudgetOperation::ClearSchedules { budget } => {
                service.clear_schedules(*budget)?;
                OperationOutcome::SchedulesCleared { budget: *budget }
            }
        };
        Ok(outcome)
    }
}
