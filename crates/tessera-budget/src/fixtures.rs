//! Shared setup for unit tests.

use tessera_store::{ChainClock, MemoryStore};
use tessera_types::{AccountName, Asset, Budget, Timestamp};

use crate::BudgetService;

pub(crate) const GENESIS_TIME: Timestamp = Timestamp::from_secs(1_700_000_000);
pub(crate) const BLOCK_INTERVAL: u32 = 3;

pub(crate) fn alice() -> AccountName {
    AccountName::from("alice")
}

pub(crate) fn bob() -> AccountName {
    AccountName::from("bob")
}

/// Chain at block 0 with `alice` and `bob` funded.
pub(crate) fn chain(alice_balance: i64) -> MemoryStore {
    let mut store = MemoryStore::new(GENESIS_TIME);
    store
        .create_account(alice(), Asset::core(alice_balance))
        .expect("create alice");
    store
        .create_account(bob(), Asset::core(0))
        .expect("create bob");
    store
}

/// Advance the head by one block interval and return the new block time.
pub(crate) fn next_block(store: &mut MemoryStore) -> Timestamp {
    let time = store.head_block_time().saturating_add_secs(BLOCK_INTERVAL);
    store.advance_block(time).expect("advance block");
    time
}

/// Open a budget for alice.
pub(crate) fn open(
    store: &mut MemoryStore,
    balance: i64,
    per_block: i64,
    auto_close: bool,
) -> Budget {
    BudgetService::new(store)
        .create_budget(&alice(), Asset::core(balance), per_block, auto_close)
        .expect("create budget")
}
