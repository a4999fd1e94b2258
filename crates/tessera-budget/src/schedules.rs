//! Schedule lifecycle.
//!
//! Schedules attach to ordinary budgets only. A budget always keeps at
//! least one schedule: removing the last one locks it instead, and a locked
//! schedule never grants an allocation.

use serde::{Deserialize, Serialize};
use tessera_store::ChainDatabase;
use tessera_types::{BudgetId, BudgetSchedule, ScheduleAlg, ScheduleId, Timestamp};
use tracing::info;

use crate::schedule::ScheduleInput;
use crate::service::BudgetService;
use crate::{BudgetError, Result};

/// What [`BudgetService::remove_schedule`] did to the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRemoval {
    /// Schedule and link were deleted.
    Removed,
    /// It was the budget's last schedule, so it was locked and kept.
    Locked,
}

impl<D: ChainDatabase> BudgetService<'_, D> {
    /// Attach a new schedule to an ordinary budget.
    ///
    /// An absent algorithm means unconditional. `now` defaults to the head
    /// block time.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::GenesisBudget`] for genesis budgets
    /// - [`BudgetError::InvalidSchedule`] / [`BudgetError::InvalidTimeRange`] on malformed input
    pub fn append_schedule(
        &mut self,
        budget: BudgetId,
        input: ScheduleInput,
        now: Option<Timestamp>,
    ) -> Result<BudgetSchedule> {
        self.atomic(|svc| svc.attach_schedule(budget, input, now))
    }

    fn attach_schedule(
        &mut self,
        id: BudgetId,
        input: ScheduleInput,
        now: Option<Timestamp>,
    ) -> Result<BudgetSchedule> {
        let budget = self.db.budget(id)?;
        if budget.is_genesis() {
            return Err(BudgetError::GenesisBudget(id));
        }
        let shape = input.validate(ScheduleAlg::Unconditional)?;
        let rule = shape.into_rule(self.resolve_now(now));

        let schedule = self.db.create_schedule(rule);
        self.db.create_link(id, schedule.id);

        info!(budget = %id, schedule = %schedule.id, alg = %rule.alg(), "schedule appended");
        Ok(schedule)
    }

    /// Re-validate and rewrite an existing schedule.
    ///
    /// An absent algorithm keeps the schedule's current one. The locked flag
    /// is left as it was.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::InvalidSchedule`] / [`BudgetError::InvalidTimeRange`] on malformed input
    pub fn adjust_schedule(
        &mut self,
        schedule: ScheduleId,
        input: ScheduleInput,
        now: Option<Timestamp>,
    ) -> Result<BudgetSchedule> {
        self.atomic(|svc| {
            let current = svc.db.schedule(schedule)?;
            let shape = input.validate(current.rule.alg())?;
            let rule = shape.into_rule(svc.resolve_now(now));
            let adjusted = svc.db.modify_schedule(schedule, |s| s.rule = rule)?;
            info!(schedule = %schedule, alg = %rule.alg(), "schedule adjusted");
            Ok(adjusted)
        })
    }

    /// Make a schedule inert.
    pub fn lock_schedule(&mut self, schedule: ScheduleId) -> Result<BudgetSchedule> {
        self.set_locked(schedule, true)
    }

    /// Re-activate a locked schedule.
    pub fn unlock_schedule(&mut self, schedule: ScheduleId) -> Result<BudgetSchedule> {
        self.set_locked(schedule, false)
    }

    fn set_locked(&mut self, schedule: ScheduleId, locked: bool) -> Result<BudgetSchedule> {
        let updated = self.db.modify_schedule(schedule, |s| s.locked = locked)?;
        info!(schedule = %schedule, locked, "schedule lock changed");
        Ok(updated)
    }

    /// Remove a schedule from its budget.
    ///
    /// Deletes the schedule and its link when the budget has others;
    /// otherwise locks it so the budget keeps one schedule.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::UnlinkedSchedule`] if no budget references the schedule
    /// - [`BudgetError::SharedSchedule`] if more than one budget does
    pub fn remove_schedule(&mut self, schedule: ScheduleId) -> Result<ScheduleRemoval> {
        self.atomic(|svc| svc.detach_schedule(schedule))
    }

    fn detach_schedule(&mut self, schedule: ScheduleId) -> Result<ScheduleRemoval> {
        let links = self.db.links_by_schedule(schedule);
        let link = match links.as_slice() {
            [] => return Err(BudgetError::UnlinkedSchedule(schedule)),
            [link] => *link,
            _ => {
                return Err(BudgetError::SharedSchedule {
                    schedule,
                    links: links.len(),
                })
            }
        };

        let siblings = self.ordinary_links(link.budget)?;
        if siblings.len() > 1 {
            self.db.remove_schedule(schedule)?;
            self.db.remove_link(link.id)?;
            info!(budget = %link.budget, schedule = %schedule, "schedule removed");
            Ok(ScheduleRemoval::Removed)
        } else {
            self.db.modify_schedule(schedule, |s| s.locked = true)?;
            info!(
                budget = %link.budget,
                schedule = %schedule,
                "last schedule locked instead of removed"
            );
            Ok(ScheduleRemoval::Locked)
        }
    }

    /// Remove every schedule of an ordinary budget.
    ///
    /// All but the last schedule are deleted; the last one is locked, so
    /// the budget is left with a single inert schedule.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::GenesisBudget`] for genesis budgets
    /// - [`BudgetError::NoSchedules`] if the budget has no schedule links
    pub fn clear_schedules(&mut self, budget: BudgetId) -> Result<()> {
        self.atomic(|svc| {
            let links = svc.ordinary_links(budget)?;
            for link in &links {
                svc.detach_schedule(link.schedule)?;
            }
            Ok(())
        })
    }
}
