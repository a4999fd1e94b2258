//! Block driver.
//!
//! [`process_block`] runs the allocation for every budget at the current
//! head, in budget id order, as one transaction. [`apply_block`] also
//! moves a [`MemoryStore`] head to the new block first.
//!
//! Payouts are debited from budgets and listed in
//! [`BlockReport::disbursements`]; crediting them is up to the caller.

use serde::{Deserialize, Serialize};
use tessera_store::{ChainDatabase, MemoryStore, Transactional};
use tessera_types::{Asset, BlockNum, BudgetId, BudgetOwner, Timestamp, CORE_SYMBOL};
use tracing::info;

use crate::service::BudgetService;
use crate::Result;

/// A payout made by one budget in one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    pub budget: BudgetId,
    pub owner: BudgetOwner,
    pub amount: Asset,
}

/// Outcome of allocating one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReport {
    pub block_num: BlockNum,
    pub block_time: Timestamp,
    /// Non-zero payouts in budget id order.
    pub disbursements: Vec<Disbursement>,
    /// Sum of all payouts.
    pub total: Asset,
    /// Budgets that auto-closed during this block.
    pub closed: Vec<BudgetId>,
}

/// Produce the next block at `time` and allocate cash for it.
///
/// # Errors
///
/// - [`crate::BudgetError::Store`] if `time` precedes the head block time
/// - any error of [`process_block`]; the head is not moved in that case
pub fn apply_block(store: &mut MemoryStore, time: Timestamp) -> Result<BlockReport> {
    store.transaction(|store| -> Result<BlockReport> {
        store.advance_block(time)?;
        process_block(store)
    })
}

/// Allocate cash from every budget for the head block.
///
/// # Errors
///
/// Any allocation failure aborts the whole block; no budget is touched.
pub fn process_block<D: ChainDatabase>(db: &mut D) -> Result<BlockReport> {
    db.transaction(|db| -> Result<BlockReport> {
        let block_num = db.head_block_num();
        let block_time = db.head_block_time();
        let mut report = BlockReport {
            block_num,
            block_time,
            disbursements: Vec::new(),
            total: Asset::zero(CORE_SYMBOL),
            closed: Vec::new(),
        };

        for id in db.budget_ids() {
            let owner = db.budget(id)?.owner;
            let amount = BudgetService::new(db).allocate(id, Some(block_time))?;
            if amount.is_positive() {
                report.total = report.total.checked_add(amount)?;
                report.disbursements.push(Disbursement {
                    budget: id,
                    owner,
                    amount,
                });
            }
            if db.budget(id).is_err() {
                report.closed.push(id);
            }
        }

        info!(
            block = block_num,
            payouts = report.disbursements.len(),
            total = %report.total,
            closed = report.closed.len(),
            "block allocated"
        );
        Ok(report)
    })
}
