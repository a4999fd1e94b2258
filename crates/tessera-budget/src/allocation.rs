//! Per-block cash allocation.
//!
//! Once per block the driver asks every budget for its payout:
//!
//! 1. A budget already allocated for the head height pays nothing.
//! 2. Otherwise the head height is recorded and the budget's unlocked
//!    schedules are scanned in link order; the first one admitting `now`
//!    makes the block eligible. Genesis budgets have no schedules and are
//!    always eligible.
//! 3. An eligible block debits `per_block` from the budget, which may
//!    auto-close it.

use tessera_store::ChainDatabase;
use tessera_types::{Asset, BudgetId, BudgetOwner, ScheduleId, Timestamp, CORE_SYMBOL};
use tracing::debug;

use crate::service::BudgetService;
use crate::{BudgetError, Result};

impl<D: ChainDatabase> BudgetService<'_, D> {
    /// Pay out this block's share of a budget.
    ///
    /// Returns the amount debited, which is zero when the budget was already
    /// processed at the head height, when no schedule admits `now`, or when
    /// the balance cannot cover `per_block`. `now` defaults to the head
    /// block time.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::NoSchedules`] if an ordinary budget has no schedule links
    /// - [`BudgetError::InvalidPerBlock`] if the budget's `per_block` is not positive
    pub fn allocate_cash(&mut self, budget: BudgetId, now: Option<Timestamp>) -> Result<Asset> {
        self.atomic(|svc| svc.allocate(budget, now))
    }

    /// [`Self::allocate_cash`] without a transaction of its own. The caller
    /// must discard the work on error.
    pub(crate) fn allocate(&mut self, id: BudgetId, now: Option<Timestamp>) -> Result<Asset> {
        let now = self.resolve_now(now);
        let head = self.db.head_block_num();
        let budget = self.db.budget(id)?;

        if budget.block_last_allocated_for >= head {
            return Ok(Asset::zero(CORE_SYMBOL));
        }
        self.db
            .modify_budget(id, |b| b.block_last_allocated_for = head)?;

        let trapped = match &budget.owner {
            BudgetOwner::Genesis => true,
            BudgetOwner::Account(_) => self.eligible_schedule(id, now)?.is_some(),
        };
        if !trapped {
            debug!(budget = %id, block = head, now = now.secs(), "no eligible schedule");
            return Ok(Asset::zero(CORE_SYMBOL));
        }

        if budget.per_block <= 0 {
            return Err(BudgetError::InvalidPerBlock(budget.per_block));
        }
        let paid = self.debit(id, Asset::core(budget.per_block))?;
        debug!(budget = %id, block = head, %paid, "cash allocated");
        Ok(paid)
    }

    /// First unlocked schedule of the budget admitting `now`.
    fn eligible_schedule(&self, id: BudgetId, now: Timestamp) -> Result<Option<ScheduleId>> {
        let links = self.db.links_by_budget(id);
        if links.is_empty() {
            return Err(BudgetError::NoSchedules(id));
        }
        for link in links {
            let schedule = self.db.schedule(link.schedule)?;
            if schedule.is_eligible(now) {
                return Ok(Some(schedule.id));
            }
        }
        Ok(None)
    }
}
