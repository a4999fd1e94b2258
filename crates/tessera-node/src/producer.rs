//! Block production.
//!
//! Block `n` is stamped `genesis_time + n * interval` on the chain clock,
//! independent of when the node actually produces it.

use serde::Serialize;
use tessera_budget::{apply_block, BlockReport, BudgetError};
use tessera_store::{ChainClock, MemoryStore, ObjectStore};
use tessera_types::{BlockNum, Budget, Timestamp};
use tracing::{debug, info};

/// Snapshot printed when the node stops.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub head_block_num: BlockNum,
    pub head_block_time: Timestamp,
    pub budgets: Vec<Budget>,
    /// Hex BLAKE3 digest of the store.
    pub state_digest: String,
}

/// Drives a [`MemoryStore`] forward one block at a time.
pub struct BlockProducer {
    store: MemoryStore,
    interval_secs: u32,
}

impl BlockProducer {
    pub fn new(store: MemoryStore, interval_secs: u32) -> Self {
        Self {
            store,
            interval_secs,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Chain time of the next block.
    pub fn next_block_time(&self) -> Timestamp {
        let next = self.store.head_block_num().saturating_add(1);
        let offset = next.saturating_mul(self.interval_secs);
        self.store.genesis_time().saturating_add_secs(offset)
    }

    /// Produce the next block and allocate cash for it.
    pub fn produce(&mut self) -> Result<BlockReport, BudgetError> {
        let time = self.next_block_time();
        let report = apply_block(&mut self.store, time)?;
        for payout in &report.disbursements {
            debug!(
                block = report.block_num,
                budget = %payout.budget,
                owner = %payout.owner,
                amount = %payout.amount,
                "disbursement"
            );
        }
        info!(
            block = report.block_num,
            time = report.block_time.secs(),
            total = %report.total,
            closed = report.closed.len(),
            "block produced"
        );
        Ok(report)
    }

    /// Current head, remaining budgets and state digest.
    pub fn summary(&self) -> Result<ChainSummary, BudgetError> {
        let budgets = self
            .store
            .budget_ids()
            .into_iter()
            .map(|id| self.store.budget(id).map_err(BudgetError::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ChainSummary {
            head_block_num: self.store.head_block_num(),
            head_block_time: self.store.head_block_time(),
            budgets,
            state_digest: hex::encode(self.store.state_digest()?),
        })
    }
}
