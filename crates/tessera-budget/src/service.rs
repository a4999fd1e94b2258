//! Budget lifecycle.
//!
//! [`BudgetService`] borrows the chain database for the span of one or more
//! operations. Each public operation runs inside its own transaction, so a
//! failure part-way leaves no trace in the store.

use tessera_store::ChainDatabase;
use tessera_types::{
    AccountName, Asset, Budget, BudgetId, BudgetOwner, BudgetSchedule, BudgetScheduleLink,
    ScheduleId, ScheduleRule, ShareType, Timestamp, CORE_SYMBOL,
};
use tracing::{debug, info, trace};

use crate::{BudgetError, Result};

/// Budget and schedule operations over a chain database.
pub struct BudgetService<'a, D> {
    pub(crate) db: &'a mut D,
}

impl<'a, D: ChainDatabase> BudgetService<'a, D> {
    /// Borrow `db` for budget operations.
    pub fn new(db: &'a mut D) -> Self {
        Self { db }
    }

    /// Read access to the underlying database.
    pub fn db(&self) -> &D {
        &*self.db
    }

    /// Run `work` in a transaction of its own.
    pub(crate) fn atomic<T>(
        &mut self,
        work: impl FnOnce(&mut BudgetService<'_, D>) -> Result<T>,
    ) -> Result<T> {
        self.db.transaction(|db| work(&mut BudgetService::new(db)))
    }

    /// Block time to use when the caller does not pin one.
    pub(crate) fn resolve_now(&self, now: Option<Timestamp>) -> Timestamp {
        now.unwrap_or_else(|| self.db.head_block_time())
    }

    /// Seed a system-owned budget at chain genesis.
    ///
    /// The budget is dated at genesis time, has no schedules and only
    /// starts paying from the block after the current head.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::Types`] if `balance` is not in the core symbol
    /// - [`BudgetError::InvalidPerBlock`] if `per_block` is not positive
    pub fn create_genesis_budget(&mut self, balance: Asset, per_block: ShareType) -> Result<Budget> {
        balance.expect_symbol(CORE_SYMBOL)?;
        if per_block <= 0 {
            return Err(BudgetError::InvalidPerBlock(per_block));
        }

        let created = self.db.genesis_time();
        let head = self.db.head_block_num();
        let budget = self.db.create_budget(|id| Budget {
            id,
            owner: BudgetOwner::Genesis,
            created,
            balance,
            per_block,
            block_last_allocated_for: head,
            auto_close: false,
        });

        info!(budget = %budget.id, %balance, per_block, "genesis budget created");
        Ok(budget)
    }

    /// Open an ordinary budget funded by `owner`.
    ///
    /// Debits `balance` from the owner, creates the budget together with one
    /// unconditional schedule and links them.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::ReservedOwner`] if `owner` is the reserved system account
    /// - [`BudgetError::Types`] if `balance` is not in the core symbol
    /// - [`BudgetError::InvalidAmount`] if `balance` is not positive
    /// - [`BudgetError::InvalidPerBlock`] if `per_block` is not positive
    /// - [`BudgetError::InsufficientFunds`] if the owner cannot cover `balance`
    /// - [`BudgetError::Store`] if the owner account does not exist
    pub fn create_budget(
        &mut self,
        owner: &AccountName,
        balance: Asset,
        per_block: ShareType,
        auto_close: bool,
    ) -> Result<Budget> {
        self.atomic(|svc| svc.open_budget(owner, balance, per_block, auto_close))
    }

    fn open_budget(
        &mut self,
        owner: &AccountName,
        balance: Asset,
        per_block: ShareType,
        auto_close: bool,
    ) -> Result<Budget> {
        let budget_owner = BudgetOwner::from_account(owner);
        if budget_owner.is_genesis() {
            return Err(BudgetError::ReservedOwner);
        }
        balance.expect_symbol(CORE_SYMBOL)?;
        if !balance.is_positive() {
            return Err(BudgetError::InvalidAmount(balance));
        }
        if per_block <= 0 {
            return Err(BudgetError::InvalidPerBlock(per_block));
        }

        let account = self.db.get_account(owner)?;
        if account.balance.amount < balance.amount {
            return Err(BudgetError::InsufficientFunds {
                available: account.balance,
                required: balance,
            });
        }
        self.db.decrease_balance(owner, balance)?;

        let created = self.db.head_block_time();
        let head = self.db.head_block_num();
        let budget = self.db.create_budget(|id| Budget {
            id,
            owner: budget_owner,
            created,
            balance,
            per_block,
            block_last_allocated_for: head,
            auto_close,
        });

        let schedule = self.db.create_schedule(ScheduleRule::Unconditional);
        self.db.create_link(budget.id, schedule.id);

        info!(
            budget = %budget.id,
            owner = %owner,
            %balance,
            per_block,
            auto_close,
            "budget created"
        );
        Ok(budget)
    }

    /// Close an ordinary budget.
    ///
    /// Repays any positive balance to the owner, then deletes every schedule
    /// and link of the budget and the budget itself.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::GenesisBudget`] for genesis budgets
    /// - [`BudgetError::NoSchedules`] if the budget has no schedule links
    pub fn close_budget(&mut self, budget: BudgetId) -> Result<()> {
        self.atomic(|svc| svc.close(budget))
    }

    pub(crate) fn close(&mut self, id: BudgetId) -> Result<()> {
        let budget = self.db.budget(id)?;
        let Some(owner) = budget.owner.account().cloned() else {
            return Err(BudgetError::GenesisBudget(id));
        };

        let links = self.db.links_by_budget(id);
        if links.is_empty() {
            return Err(BudgetError::NoSchedules(id));
        }

        let repayable = budget.balance;
        if repayable.is_positive() {
            self.db.modify_budget(id, |b| b.balance = Asset::zero(CORE_SYMBOL))?;
            self.db.increase_balance(&owner, repayable)?;
        }

        for link in &links {
            self.db.remove_schedule(link.schedule)?;
            self.db.remove_link(link.id)?;
        }
        self.db.remove_budget(id)?;

        info!(
            budget = %id,
            owner = %owner,
            repaid = %repayable,
            schedules = links.len(),
            "budget closed"
        );
        Ok(())
    }

    /// Add funds to a budget.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::Types`] if `amount` is not in the core symbol
    /// - [`BudgetError::InvalidAmount`] if `amount` is negative
    pub fn increase_balance(&mut self, budget: BudgetId, amount: Asset) -> Result<Budget> {
        self.atomic(|svc| svc.credit(budget, amount))
    }

    fn credit(&mut self, id: BudgetId, amount: Asset) -> Result<Budget> {
        amount.expect_symbol(CORE_SYMBOL)?;
        if amount.amount < 0 {
            return Err(BudgetError::InvalidAmount(amount));
        }
        let current = self.db.budget(id)?;
        let balance = current.balance.checked_add(amount)?;
        let budget = self.db.modify_budget(id, |b| b.balance = balance)?;
        trace!(budget = %id, %amount, balance = %budget.balance, "budget credited");
        Ok(budget)
    }

    /// Take funds out of a budget.
    ///
    /// The debit is skipped when the balance is already exhausted or does
    /// not cover `amount`, so a budget never goes below zero through this
    /// path. Auto-close is evaluated afterwards either way. Returns the
    /// amount actually debited.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::Types`] if `amount` is not in the core symbol
    /// - [`BudgetError::InvalidAmount`] if `amount` is negative
    pub fn decrease_balance(&mut self, budget: BudgetId, amount: Asset) -> Result<Asset> {
        self.atomic(|svc| svc.debit(budget, amount))
    }

    pub(crate) fn debit(&mut self, id: BudgetId, amount: Asset) -> Result<Asset> {
        amount.expect_symbol(CORE_SYMBOL)?;
        if amount.amount < 0 {
            return Err(BudgetError::InvalidAmount(amount));
        }

        let current = self.db.budget(id)?;
        let debited = if current.balance.is_positive() && amount.amount <= current.balance.amount {
            let balance = current.balance.checked_sub(amount)?;
            self.db.modify_budget(id, |b| b.balance = balance)?;
            trace!(budget = %id, %amount, %balance, "budget debited");
            amount
        } else {
            debug!(
                budget = %id,
                %amount,
                balance = %current.balance,
                "debit skipped: balance does not cover amount"
            );
            Asset::zero(CORE_SYMBOL)
        };

        self.check_auto_close(id)?;
        Ok(debited)
    }

    /// Close the budget if it opted into auto-close and is exhausted.
    /// Returns whether it was closed.
    fn check_auto_close(&mut self, id: BudgetId) -> Result<bool> {
        let budget = self.db.budget(id)?;
        if budget.auto_close && budget.balance.amount <= 0 {
            debug!(budget = %id, balance = %budget.balance, "auto-closing exhausted budget");
            self.close(id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Change the auto-close policy of an ordinary budget.
    ///
    /// Turning auto-close on for an exhausted budget closes it immediately.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::GenesisBudget`] for genesis budgets
    pub fn update_budget(&mut self, budget: BudgetId, auto_close: bool) -> Result<()> {
        self.atomic(|svc| svc.set_auto_close(budget, auto_close))
    }

    fn set_auto_close(&mut self, id: BudgetId, auto_close: bool) -> Result<()> {
        let budget = self.db.budget(id)?;
        if budget.is_genesis() {
            return Err(BudgetError::GenesisBudget(id));
        }
        let budget = self.db.modify_budget(id, |b| b.auto_close = auto_close)?;
        info!(budget = %id, auto_close, "budget updated");

        if auto_close && budget.balance.amount <= 0 {
            self.close(id)?;
        }
        Ok(())
    }

    /// Fetch a budget.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::Store`] if no budget has this id
    pub fn get_budget(&self, budget: BudgetId) -> Result<Budget> {
        Ok(self.db.budget(budget)?)
    }

    /// All budgets of an owner, oldest first.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::NoBudgets`] if the owner has none
    pub fn get_budgets(&self, owner: &BudgetOwner) -> Result<Vec<Budget>> {
        let ids = self.db.budgets_by_owner(owner);
        if ids.is_empty() {
            return Err(BudgetError::NoBudgets(owner.to_string()));
        }
        ids.into_iter()
            .map(|id| self.db.budget(id).map_err(BudgetError::from))
            .collect()
    }

    /// The oldest budget of an owner.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::NoBudgets`] if the owner has none
    pub fn get_any_budget(&self, owner: &BudgetOwner) -> Result<Budget> {
        match self.db.budgets_by_owner(owner).first() {
            Some(id) => Ok(self.db.budget(*id)?),
            None => Err(BudgetError::NoBudgets(owner.to_string())),
        }
    }

    /// Schedules of an ordinary budget in link order.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::GenesisBudget`] for genesis budgets
    /// - [`BudgetError::NoSchedules`] if the budget has no schedule links
    pub fn get_schedules(&self, budget: BudgetId) -> Result<Vec<BudgetSchedule>> {
        let links = self.ordinary_links(budget)?;
        links
            .iter()
            .map(|link| self.db.schedule(link.schedule).map_err(BudgetError::from))
            .collect()
    }

    /// The first schedule of an ordinary budget.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::GenesisBudget`] for genesis budgets
    /// - [`BudgetError::NoSchedules`] if the budget has no schedule links
    pub fn get_any_schedule(&self, budget: BudgetId) -> Result<BudgetSchedule> {
        let links = self.ordinary_links(budget)?;
        match links.first() {
            Some(link) => Ok(self.db.schedule(link.schedule)?),
            None => Err(BudgetError::NoSchedules(budget)),
        }
    }

    /// Fetch a schedule.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::Store`] if no schedule has this id
    pub fn get_schedule(&self, schedule: ScheduleId) -> Result<BudgetSchedule> {
        Ok(self.db.schedule(schedule)?)
    }

    /// Non-empty link list of an ordinary budget.
    pub(crate) fn ordinary_links(&self, id: BudgetId) -> Result<Vec<BudgetScheduleLink>> {
        let budget = self.db.budget(id)?;
        if budget.is_genesis() {
            return Err(BudgetError::GenesisBudget(id));
        }
        let links = self.db.links_by_budget(id);
        if links.is_empty() {
            return Err(BudgetError::NoSchedules(id));
        }
        Ok(links)
    }
}
