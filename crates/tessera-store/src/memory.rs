//! In-memory chain database.
//!
//! [`MemoryStore`] keeps every table in ordered maps together with the
//! secondary indexes the budget engine queries: budgets by owner, links by
//! budget and links by schedule. Transactions snapshot the whole state and
//! restore it when the unit of work fails.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tessera_types::{
    Account, AccountName, Asset, BlockNum, Budget, BudgetId, BudgetOwner, BudgetSchedule,
    BudgetScheduleLink, LinkId, ScheduleId, ScheduleRule, Timestamp,
};

use crate::table::Table;
use crate::{AccountLedger, ChainClock, ObjectStore, Result, StoreError, Transactional};

/// Head-of-chain properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub head_block_num: BlockNum,
    pub head_block_time: Timestamp,
    pub genesis_time: Timestamp,
}

#[derive(Clone, Debug, Default)]
struct State {
    accounts: BTreeMap<AccountName, Account>,
    budgets: Table<BudgetId, Budget>,
    schedules: Table<ScheduleId, BudgetSchedule>,
    links: Table<LinkId, BudgetScheduleLink>,
    budgets_by_owner: BTreeSet<(BudgetOwner, BudgetId)>,
    links_by_budget: BTreeSet<(BudgetId, LinkId)>,
    links_by_schedule: BTreeSet<(ScheduleId, LinkId)>,
}

/// Serialized form hashed by [`MemoryStore::state_digest`]. Indexes are
/// derived data and stay out of it.
#[derive(Serialize)]
struct DigestView<'a> {
    chain: &'a ChainState,
    accounts: &'a BTreeMap<AccountName, Account>,
    budgets: &'a Table<BudgetId, Budget>,
    schedules: &'a Table<ScheduleId, BudgetSchedule>,
    links: &'a Table<LinkId, BudgetScheduleLink>,
}

/// In-memory implementation of every collaborator the engine consumes.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    chain: ChainState,
    state: State,
}

impl MemoryStore {
    /// Create an empty chain whose head is block 0 at `genesis_time`.
    pub fn new(genesis_time: Timestamp) -> Self {
        Self {
            chain: ChainState {
                head_block_num: 0,
                head_block_time: genesis_time,
                genesis_time,
            },
            state: State::default(),
        }
    }

    /// Current head-of-chain properties.
    pub fn chain_state(&self) -> ChainState {
        self.chain
    }

    /// Move the head to the next block at `time`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TimeRewind`] if `time` precedes the current head time
    pub fn advance_block(&mut self, time: Timestamp) -> Result<BlockNum> {
        if time < self.chain.head_block_time {
            return Err(StoreError::TimeRewind {
                head: self.chain.head_block_time,
                requested: time,
            });
        }
        self.chain.head_block_num += 1;
        self.chain.head_block_time = time;
        tracing::trace!(
            block = self.chain.head_block_num,
            time = time.secs(),
            "head advanced"
        );
        Ok(self.chain.head_block_num)
    }

    /// Register an account with an opening balance.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ReservedAccount`] for the reserved system name
    /// - [`StoreError::DuplicateAccount`] if the name is taken
    pub fn create_account(&mut self, name: AccountName, balance: Asset) -> Result<Account> {
        if name.is_reserved() {
            return Err(StoreError::ReservedAccount);
        }
        if self.state.accounts.contains_key(&name) {
            return Err(StoreError::DuplicateAccount(name));
        }
        let account = Account {
            name: name.clone(),
            balance,
        };
        self.state.accounts.insert(name, account.clone());
        Ok(account)
    }

    pub fn account_count(&self) -> usize {
        self.state.accounts.len()
    }

    pub fn schedule_count(&self) -> usize {
        self.state.schedules.len()
    }

    pub fn link_count(&self) -> usize {
        self.state.links.len()
    }

    /// BLAKE3 digest of the chain state and every table.
    ///
    /// Two stores that applied the same blocks and operations produce the
    /// same digest.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Serialization`] if the state cannot be encoded
    pub fn state_digest(&self) -> Result<[u8; 32]> {
        let view = DigestView {
            chain: &self.chain,
            accounts: &self.state.accounts,
            budgets: &self.state.budgets,
            schedules: &self.state.schedules,
            links: &self.state.links,
        };
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &view)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(*hasher.finalize().as_bytes())
    }
}

impl ObjectStore for MemoryStore {
    fn create_budget(&mut self, build: impl FnOnce(BudgetId) -> Budget) -> Budget {
        let id = BudgetId(self.state.budgets.allocate_id());
        let mut budget = build(id);
        budget.id = id;
        self.state
            .budgets_by_owner
            .insert((budget.owner.clone(), id));
        self.state.budgets.insert(id, budget.clone());
        budget
    }

    fn budget(&self, id: BudgetId) -> Result<Budget> {
        self.state
            .budgets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("budget", id))
    }

    fn modify_budget(&mut self, id: BudgetId, mutate: impl FnOnce(&mut Budget)) -> Result<Budget> {
        let mut updated = self.budget(id)?;
        let previous_owner = updated.owner.clone();
        mutate(&mut updated);
        updated.id = id;
        if updated.owner != previous_owner {
            self.state.budgets_by_owner.remove(&(previous_owner, id));
            self.state
                .budgets_by_owner
                .insert((updated.owner.clone(), id));
        }
        if let Some(row) = self.state.budgets.get_mut(&id) {
            *row = updated.clone();
        }
        Ok(updated)
    }

    fn remove_budget(&mut self, id: BudgetId) -> Result<()> {
        let budget = self
            .state
            .budgets
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("budget", id))?;
        self.state.budgets_by_owner.remove(&(budget.owner, id));
        Ok(())
    }

    fn budget_ids(&self) -> Vec<BudgetId> {
        self.state.budgets.keys().collect()
    }

    fn budgets_by_owner(&self, owner: &BudgetOwner) -> Vec<BudgetId> {
        let from = (owner.clone(), BudgetId(u64::MIN));
        let to = (owner.clone(), BudgetId(u64::MAX));
        self.state
            .budgets_by_owner
            .range(from..=to)
            .map(|(_, id)| *id)
            .collect()
    }

    fn create_schedule(&mut self, rule: ScheduleRule) -> BudgetSchedule {
        let id = ScheduleId(self.state.schedules.allocate_id());
        let schedule = BudgetSchedule {
            id,
            rule,
            locked: false,
        };
        self.state.schedules.insert(id, schedule.clone());
        schedule
    }

    fn schedule(&self, id: ScheduleId) -> Result<BudgetSchedule> {
        self.state
            .schedules
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    fn modify_schedule(
        &mut self,
        id: ScheduleId,
        mutate: impl FnOnce(&mut BudgetSchedule),
    ) -> Result<BudgetSchedule> {
        let mut updated = self.schedule(id)?;
        mutate(&mut updated);
        updated.id = id;
        if let Some(row) = self.state.schedules.get_mut(&id) {
            *row = updated.clone();
        }
        Ok(updated)
    }

    fn remove_schedule(&mut self, id: ScheduleId) -> Result<()> {
        self.state
            .schedules
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    fn create_link(&mut self, budget: BudgetId, schedule: ScheduleId) -> BudgetScheduleLink {
        let id = LinkId(self.state.links.allocate_id());
        let link = BudgetScheduleLink {
            id,
            budget,
            schedule,
        };
        self.state.links_by_budget.insert((budget, id));
        self.state.links_by_schedule.insert((schedule, id));
        self.state.links.insert(id, link);
        link
    }

    fn link(&self, id: LinkId) -> Result<BudgetScheduleLink> {
        self.state
            .links
            .get(&id)
            .copied()
            .ok_or_else(|| StoreError::not_found("budget schedule link", id))
    }

    fn remove_link(&mut self, id: LinkId) -> Result<()> {
        let link = self
            .state
            .links
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("budget schedule link", id))?;
        self.state.links_by_budget.remove(&(link.budget, id));
        self.state.links_by_schedule.remove(&(link.schedule, id));
        Ok(())
    }

    fn links_by_budget(&self, budget: BudgetId) -> Vec<BudgetScheduleLink> {
        self.state
            .links_by_budget
            .range((budget, LinkId(u64::MIN))..=(budget, LinkId(u64::MAX)))
            .filter_map(|(_, id)| self.state.links.get(id).copied())
            .collect()
    }

    fn links_by_schedule(&self, schedule: ScheduleId) -> Vec<BudgetScheduleLink> {
        self.state
            .links_by_schedule
            .range((schedule, LinkId(u64::MIN))..=(schedule, LinkId(u64::MAX)))
            .filter_map(|(_, id)| self.state.links.get(id).copied())
            .collect()
    }
}

impl AccountLedger for MemoryStore {
    fn get_account(&self, name: &AccountName) -> Result<Account> {
        self.state
            .accounts
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found("account", name))
    }

    fn increase_balance(&mut self, name: &AccountName, amount: Asset) -> Result<()> {
        let account = self
            .state
            .accounts
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found("account", name))?;
        account.balance = account.balance.checked_add(amount)?;
        tracing::trace!(account = %name, %amount, balance = %account.balance, "account credited");
        Ok(())
    }

    fn decrease_balance(&mut self, name: &AccountName, amount: Asset) -> Result<()> {
        let account = self
            .state
            .accounts
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found("account", name))?;
        let remaining = account.balance.checked_sub(amount)?;
        if remaining.amount < 0 {
            return Err(StoreError::InsufficientBalance {
                account: name.clone(),
                available: account.balance,
                required: amount,
            });
        }
        account.balance = remaining;
        tracing::trace!(account = %name, %amount, balance = %account.balance, "account debited");
        Ok(())
    }
}

impl ChainClock for MemoryStore {
    fn head_block_num(&self) -> BlockNum {
        self.chain.head_block_num
    }

    fn head_block_time(&self) -> Timestamp {
        self.chain.head_block_time
    }

    fn genesis_time(&self) -> Timestamp {
        self.chain.genesis_time
    }
}

impl Transactional for MemoryStore {
    fn transaction<T, E>(
        &mut self,
        work: impl FnOnce(&mut Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let chain = self.chain;
        let state = self.state.clone();
        let result = work(self);
        if result.is_err() {
            self.chain = chain;
            self.state = state;
            tracing::debug!(block = chain.head_block_num, "transaction rolled back");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{ScheduleRule, CORE_SYMBOL};

    const GENESIS: Timestamp = Timestamp::from_secs(1_700_000_000);

    fn sample_budget(owner: BudgetOwner) -> impl FnOnce(BudgetId) -> Budget {
        move |id| Budget {
            id,
            owner,
            created: GENESIS,
            balance: Asset::core(1_000),
            per_block: 10,
            block_last_allocated_for: 0,
            auto_close: false,
        }
    }

    fn alice() -> AccountName {
        AccountName::from("alice")
    }

    #[test]
    fn test_budget_crud_and_owner_index() {
        let mut store = MemoryStore::new(GENESIS);
        let a = store.create_budget(sample_budget(BudgetOwner::Account(alice())));
        let b = store.create_budget(sample_budget(BudgetOwner::Genesis));
        let c = store.create_budget(sample_budget(BudgetOwner::Account(alice())));

        assert_eq!(
            store.budgets_by_owner(&BudgetOwner::Account(alice())),
            vec![a.id, c.id]
        );
        assert_eq!(store.budgets_by_owner(&BudgetOwner::Genesis), vec![b.id]);

        store.remove_budget(a.id).expect("remove");
        assert_eq!(
            store.budgets_by_owner(&BudgetOwner::Account(alice())),
            vec![c.id]
        );
        assert!(matches!(
            store.budget(a.id),
            Err(StoreError::NotFound { kind: "budget", .. })
        ));
        assert_eq!(store.budget_ids(), vec![b.id, c.id]);
    }

    #[test]
    fn test_modify_replaces_whole_row() {
        let mut store = MemoryStore::new(GENESIS);
        let budget = store.create_budget(sample_budget(BudgetOwner::Genesis));
        let updated = store
            .modify_budget(budget.id, |b| {
                b.balance = Asset::core(5);
                b.id = BudgetId(999);
            })
            .expect("modify");
        assert_eq!(updated.id, budget.id);
        assert_eq!(store.budget(budget.id).expect("get").balance, Asset::core(5));
    }

    #[test]
    fn test_link_indexes_both_sides() {
        let mut store = MemoryStore::new(GENESIS);
        let budget = store.create_budget(sample_budget(BudgetOwner::Account(alice())));
        let s1 = store.create_schedule(ScheduleRule::Unconditional);
        let s2 = store.create_schedule(ScheduleRule::Unconditional);
        let l1 = store.create_link(budget.id, s1.id);
        let l2 = store.create_link(budget.id, s2.id);

        assert_eq!(store.links_by_budget(budget.id), vec![l1, l2]);
        assert_eq!(store.links_by_schedule(s2.id), vec![l2]);

        store.remove_link(l1.id).expect("remove link");
        assert_eq!(store.links_by_budget(budget.id), vec![l2]);
        assert!(store.links_by_schedule(s1.id).is_empty());
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_account_balance_primitives() {
        let mut store = MemoryStore::new(GENESIS);
        store
            .create_account(alice(), Asset::core(100))
            .expect("create");
        store
            .increase_balance(&alice(), Asset::core(50))
            .expect("increase");
        store
            .decrease_balance(&alice(), Asset::core(120))
            .expect("decrease");
        assert_eq!(
            store.get_account(&alice()).expect("get").balance,
            Asset::core(30)
        );

        let overdraw = store.decrease_balance(&alice(), Asset::core(31));
        assert!(matches!(
            overdraw,
            Err(StoreError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_reserved_and_duplicate_accounts_rejected() {
        let mut store = MemoryStore::new(GENESIS);
        assert_eq!(
            store.create_account(AccountName::new(""), Asset::core(1)),
            Err(StoreError::ReservedAccount)
        );
        store
            .create_account(alice(), Asset::core(1))
            .expect("create");
        assert_eq!(
            store.create_account(alice(), Asset::core(1)),
            Err(StoreError::DuplicateAccount(alice()))
        );
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut store = MemoryStore::new(GENESIS);
        store
            .create_account(alice(), Asset::zero(CORE_SYMBOL))
            .expect("create");
        let before = store.state_digest().expect("digest");

        let result: std::result::Result<(), StoreError> = store.transaction(|db| {
            db.increase_balance(&alice(), Asset::core(10))?;
            db.create_budget(sample_budget(BudgetOwner::Genesis));
            db.advance_block(GENESIS.saturating_add_secs(3))?;
            Err(StoreError::ReservedAccount)
        });

        assert!(result.is_err());
        assert_eq!(store.state_digest().expect("digest"), before);
        assert!(store.budget_ids().is_empty());
        assert_eq!(store.head_block_num(), 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let mut store = MemoryStore::new(GENESIS);
        let id = store
            .transaction(|db| Ok::<_, StoreError>(db.create_budget(sample_budget(BudgetOwner::Genesis)).id))
            .expect("commit");
        assert!(store.budget(id).is_ok());
    }

    #[test]
    fn test_advance_block_rejects_rewind() {
        let mut store = MemoryStore::new(GENESIS);
        assert_eq!(
            store
                .advance_block(GENESIS.saturating_add_secs(3))
                .expect("advance"),
            1
        );
        let rewind = store.advance_block(GENESIS);
        assert!(matches!(rewind, Err(StoreError::TimeRewind { .. })));
        assert_eq!(store.head_block_time(), GENESIS.saturating_add_secs(3));
        assert_eq!(store.genesis_time(), GENESIS);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let build = || {
            let mut store = MemoryStore::new(GENESIS);
            store
                .create_account(alice(), Asset::core(7))
                .expect("create");
            store.create_budget(sample_budget(BudgetOwner::Account(alice())));
            store
        };
        let digest = |store: &MemoryStore| store.state_digest().expect("digest");
        assert_eq!(digest(&build()), digest(&build()));

        let mut changed = build();
        changed
            .increase_balance(&alice(), Asset::core(1))
            .expect("increase");
        assert_ne!(digest(&changed), digest(&build()));
    }

    #[test]
    fn test_digest_covers_schedules_and_links() {
        let mut store = MemoryStore::new(GENESIS);
        let budget = store.create_budget(sample_budget(BudgetOwner::Genesis));
        let empty = store.state_digest().expect("digest");

        let schedule = store.create_schedule(ScheduleRule::Unconditional);
        let with_schedule = store.state_digest().expect("digest");
        assert_ne!(with_schedule, empty);

        store.create_link(budget.id, schedule.id);
        assert_ne!(store.state_digest().expect("digest"), with_schedule);
    }
}
