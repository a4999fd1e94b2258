//! Integration test: multi-block allocation across many budgets.
//!
//! Exercises the block driver over a realistic chain:
//! 1. Drain an auto-close budget block by block until it disappears
//! 2. Mix genesis, time-gated and locked budgets in one chain
//! 3. Replay the same history on two stores and compare digests
//! 4. Verify total supply is conserved across payouts and repayments

use tessera_budget::{
    apply_block, BlockReport, BudgetOperation, BudgetService, ScheduleInput, ScheduleParams,
};
use tessera_store::{AccountLedger, ChainClock, MemoryStore, ObjectStore};
use tessera_types::{AccountName, Asset, BudgetOwner, Timestamp};

const GENESIS: Timestamp = Timestamp::from_secs(1_700_000_000);
const INTERVAL: u32 = 3;

fn account(name: &str) -> AccountName {
    AccountName::from(name)
}

fn run_blocks(store: &mut MemoryStore, count: u32) -> Vec<BlockReport> {
    (0..count)
        .map(|_| {
            let time = store.head_block_time().saturating_add_secs(INTERVAL);
            apply_block(store, time).expect("apply block")
        })
        .collect()
}

/// Sum of every account balance and budget balance.
fn supply(store: &MemoryStore, accounts: &[&str]) -> i64 {
    let held: i64 = accounts
        .iter()
        .map(|name| {
            store
                .get_account(&account(name))
                .expect("account")
                .balance
                .amount
        })
        .sum();
    let locked: i64 = store
        .budget_ids()
        .into_iter()
        .map(|id| store.budget(id).expect("budget").balance.amount)
        .sum();
    held + locked
}

#[test]
fn test_auto_close_budget_drains_over_ten_blocks() {
    let mut store = MemoryStore::new(GENESIS);
    store
        .create_account(account("alice"), Asset::core(5_000))
        .expect("alice");
    let budget = BudgetService::new(&mut store)
        .create_budget(&account("alice"), Asset::core(1_000), 100, true)
        .expect("budget");

    let reports = run_blocks(&mut store, 12);
    let paid: Vec<i64> = reports.iter().map(|r| r.total.amount).collect();
    assert_eq!(paid, [vec![100; 10], vec![0, 0]].concat());

    let closed_at: Vec<u32> = reports
        .iter()
        .filter(|r| r.closed.contains(&budget.id))
        .map(|r| r.block_num)
        .collect();
    assert_eq!(closed_at, vec![10]);

    assert!(store.budget(budget.id).is_err());
    assert_eq!(store.schedule_count(), 0);
    assert_eq!(store.link_count(), 0);
    // Nothing left to repay once the balance is spent.
    assert_eq!(
        store.get_account(&account("alice")).expect("alice").balance,
        Asset::core(4_000)
    );
}

/// Chain with a genesis budget, a time-gated budget and a locked budget.
fn mixed_chain() -> MemoryStore {
    let mut store = MemoryStore::new(GENESIS);
    for (name, balance) in [("alice", 20_000), ("bob", 20_000), ("carol", 0)] {
        store
            .create_account(account(name), Asset::core(balance))
            .expect("account");
    }

    let mut svc = BudgetService::new(&mut store);
    svc.create_genesis_budget(Asset::core(500), 50)
        .expect("genesis budget");

    let gated = svc
        .create_budget(&account("alice"), Asset::core(2_000), 40, false)
        .expect("gated");
    let schedule = svc.get_any_schedule(gated.id).expect("gated schedule");
    svc.adjust_schedule(
        schedule.id,
        ScheduleInput::time_range(
            Some(GENESIS.saturating_add_secs(9)),
            Some(GENESIS.saturating_add_secs(18)),
        ),
        None,
    )
    .expect("gate");

    let locked = svc
        .create_budget(&account("bob"), Asset::core(3_000), 25, true)
        .expect("locked");
    svc.clear_schedules(locked.id).expect("clear");

    BudgetOperation::CreateBudget {
        owner: account("bob"),
        balance: Asset::core(300),
        per_block: 120,
        auto_close: true,
    }
    .apply(&mut store)
    .expect("short budget");
    store
}

#[test]
fn test_mixed_budgets_pay_per_their_schedules() {
    let mut store = mixed_chain();
    let reports = run_blocks(&mut store, 8);

    let genesis: Vec<i64> = reports
        .iter()
        .map(|r| {
            r.disbursements
                .iter()
                .filter(|d| d.owner == BudgetOwner::Genesis)
                .map(|d| d.amount.amount)
                .sum()
        })
        .collect();
    assert_eq!(genesis, vec![50, 50, 50, 50, 50, 50, 50, 50]);

    // Gated budget pays only for blocks 3..=6 (times +9..=+18).
    let gated: Vec<u32> = reports
        .iter()
        .filter(|r| r.disbursements.iter().any(|d| d.amount.amount == 40))
        .map(|r| r.block_num)
        .collect();
    assert_eq!(gated, vec![3, 4, 5, 6]);

    // Locked budget never pays.
    assert!(reports
        .iter()
        .all(|r| r.disbursements.iter().all(|d| d.amount.amount != 25)));

    // Short budget pays twice; the 60 remainder cannot cover a block and
    // a non-zero balance does not trigger auto-close.
    let short: Vec<usize> = reports
        .iter()
        .map(|r| {
            r.disbursements
                .iter()
                .filter(|d| d.amount.amount == 120)
                .count()
        })
        .collect();
    assert_eq!(short, vec![1, 1, 0, 0, 0, 0, 0, 0]);
    assert!(reports.iter().all(|r| r.closed.is_empty()));
}

#[test]
fn test_supply_is_conserved() {
    let accounts = ["alice", "bob", "carol"];
    let mut store = mixed_chain();
    let before = supply(&store, &accounts);

    let reports = run_blocks(&mut store, 6);
    let paid: i64 = reports.iter().map(|r| r.total.amount).sum();
    assert_eq!(supply(&store, &accounts), before - paid);

    // Closing repays the owner; nothing is created or destroyed.
    let bob_budgets = BudgetService::new(&mut store)
        .get_budgets(&BudgetOwner::Account(account("bob")))
        .expect("bob budgets");
    let after_blocks = supply(&store, &accounts);
    for budget in bob_budgets {
        BudgetOperation::CloseBudget { budget: budget.id }
            .apply(&mut store)
            .expect("close");
    }
    assert_eq!(supply(&store, &accounts), after_blocks);
}

#[test]
fn test_replicas_agree_on_state() {
    let history = |store: &mut MemoryStore| {
        run_blocks(store, 5);
        let budget = BudgetService::new(store)
            .get_any_budget(&BudgetOwner::Account(account("alice")))
            .expect("alice budget");
        BudgetOperation::AppendSchedule {
            budget: budget.id,
            params: ScheduleParams {
                schedule_alg: Some(2),
                period: Some(30),
                ..ScheduleParams::default()
            },
        }
        .apply(store)
        .expect("append");
        run_blocks(store, 5)
    };

    let mut first = mixed_chain();
    let mut second = mixed_chain();
    let first_reports = history(&mut first);
    let second_reports = history(&mut second);

    assert_eq!(first_reports, second_reports);
    assert_eq!(
        hex::encode(first.state_digest().expect("digest")),
        hex::encode(second.state_digest().expect("digest"))
    );
    assert_eq!(first.head_block_num(), 10);
}

#[test]
fn test_block_report_exports_as_json() {
    let mut store = mixed_chain();
    let report = run_blocks(&mut store, 3).pop().expect("block 3");

    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["block_num"], 3);
    assert_eq!(json["block_time"], 1_700_000_009);
    assert_eq!(json["total"]["symbol"], "TSR");
    assert_eq!(json["disbursements"][0]["owner"], "genesis");
    assert_eq!(json["disbursements"][0]["amount"]["amount"], 50);
    assert_eq!(json["disbursements"][1]["owner"]["account"], "alice");

    let parsed: BlockReport = serde_json::from_value(json).expect("parse report");
    assert_eq!(parsed, report);
}
