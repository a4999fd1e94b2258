//! Genesis state loading.
//!
//! The genesis document is JSON:
//!
//! ```json
//! {
//!   "genesis_time": 1700000000,
//!   "accounts": [{ "name": "alice", "balance": { "amount": 5000, "symbol": "TSR" } }],
//!   "genesis_budgets": [{ "balance": { "amount": 100000, "symbol": "TSR" }, "per_block": 10 }],
//!   "operations": [{ "type": "create_budget", "owner": "alice",
//!                    "balance": { "amount": 1000, "symbol": "TSR" }, "per_block": 100 }]
//! }
//! ```
//!
//! Accounts are registered first, then genesis budgets, then the listed
//! operations run at block 0 in order.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tessera_budget::{BudgetError, BudgetOperation, BudgetService};
use tessera_store::{MemoryStore, StoreError};
use tessera_types::{AccountName, Asset, ShareType, Timestamp, CORE_SYMBOL};
use tracing::info;

/// Error types for genesis loading.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    /// The file could not be read.
    #[error("failed to read genesis file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid genesis JSON.
    #[error("malformed genesis document: {0}")]
    Parse(#[from] serde_json::Error),

    /// An account opens with a negative or non-core balance.
    #[error("invalid opening balance for {account}: {balance}")]
    InvalidBalance {
        account: AccountName,
        balance: Asset,
    },

    /// Account registration failed (duplicate or reserved name).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A genesis budget was rejected.
    #[error(transparent)]
    Budget(#[from] BudgetError),

    /// A genesis operation failed.
    #[error("genesis operation {index} failed: {source}")]
    Operation {
        index: usize,
        #[source]
        source: BudgetError,
    },
}

/// Convenience result type for genesis loading.
pub type Result<T> = std::result::Result<T, GenesisError>;

/// An account funded at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub name: AccountName,
    pub balance: Asset,
}

/// A system-owned budget seeded at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBudget {
    pub balance: Asset,
    pub per_block: ShareType,
}

/// Initial chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub genesis_time: Timestamp,
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,
    #[serde(default)]
    pub genesis_budgets: Vec<GenesisBudget>,
    #[serde(default)]
    pub operations: Vec<BudgetOperation>,
}

impl GenesisState {
    /// Genesis with no accounts or budgets.
    pub fn empty(genesis_time: Timestamp) -> Self {
        Self {
            genesis_time,
            accounts: Vec::new(),
            genesis_budgets: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Parse a genesis document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a genesis file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build the block-0 store.
    pub fn build(&self) -> Result<MemoryStore> {
        let mut store = MemoryStore::new(self.genesis_time);

        for account in &self.accounts {
            if account.balance.symbol != CORE_SYMBOL || account.balance.amount < 0 {
                return Err(GenesisError::InvalidBalance {
                    account: account.name.clone(),
                    balance: account.balance,
                });
            }
            store.create_account(account.name.clone(), account.balance)?;
        }

        let mut service = BudgetService::new(&mut store);
        for budget in &self.genesis_budgets {
            service.create_genesis_budget(budget.balance, budget.per_block)?;
        }

        for (index, operation) in self.operations.iter().enumerate() {
            operation
                .apply(&mut store)
                .map_err(|source| GenesisError::Operation { index, source })?;
        }

        info!(
            genesis_time = self.genesis_time.secs(),
            accounts = self.accounts.len(),
            genesis_budgets = self.genesis_budgets.len(),
            operations = self.operations.len(),
            "genesis state built"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::{AccountLedger, ObjectStore};
    use tessera_types::{BudgetOwner, Symbol};

    const DOCUMENT: &str = r#"{
        "genesis_time": 1700000000,
        "accounts": [
            { "name": "alice", "balance": { "amount": 5000, "symbol": "TSR" } },
            { "name": "bob", "balance": { "amount": 0, "symbol": "TSR" } }
        ],
        "genesis_budgets": [
            { "balance": { "amount": 100000, "symbol": "TSR" }, "per_block": 10 }
        ],
        "operations": [
            { "type": "create_budget", "owner": "alice",
              "balance": { "amount": 1000, "symbol": "TSR" }, "per_block": 100,
              "auto_close": true }
        ]
    }"#;

    #[test]
    fn test_build_from_document() {
        let genesis = GenesisState::from_json(DOCUMENT).expect("parse");
        let store = genesis.build().expect("build");

        assert_eq!(store.account_count(), 2);
        assert_eq!(
            store
                .get_account(&AccountName::from("alice"))
                .expect("alice")
                .balance,
            Asset::core(4_000)
        );

        let ids = store.budget_ids();
        assert_eq!(ids.len(), 2);
        let genesis_budget = store.budget(ids[0]).expect("genesis budget");
        assert_eq!(genesis_budget.owner, BudgetOwner::Genesis);
        assert_eq!(genesis_budget.per_block, 10);
        let user_budget = store.budget(ids[1]).expect("user budget");
        assert!(user_budget.auto_close);
        assert_eq!(store.schedule_count(), 1);
    }

    #[test]
    fn test_sections_default_to_empty() {
        let genesis = GenesisState::from_json(r#"{"genesis_time": 42}"#).expect("parse");
        assert_eq!(genesis, GenesisState::empty(Timestamp::from_secs(42)));
        let store = genesis.build().expect("build");
        assert_eq!(store.account_count(), 0);
        assert!(store.budget_ids().is_empty());
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let mut genesis = GenesisState::empty(Timestamp::from_secs(1));
        for _ in 0..2 {
            genesis.accounts.push(GenesisAccount {
                name: AccountName::from("alice"),
                balance: Asset::core(10),
            });
        }
        assert!(matches!(
            genesis.build(),
            Err(GenesisError::Store(StoreError::DuplicateAccount(_)))
        ));
    }

    #[test]
    fn test_reserved_account_rejected() {
        let mut genesis = GenesisState::empty(Timestamp::from_secs(1));
        genesis.accounts.push(GenesisAccount {
            name: AccountName::from(""),
            balance: Asset::core(10),
        });
        assert!(matches!(
            genesis.build(),
            Err(GenesisError::Store(StoreError::ReservedAccount))
        ));
    }

    #[test]
    fn test_non_core_balance_rejected() {
        let mut genesis = GenesisState::empty(Timestamp::from_secs(1));
        genesis.accounts.push(GenesisAccount {
            name: AccountName::from("alice"),
            balance: Asset::new(10, Symbol::Tsp),
        });
        assert!(matches!(
            genesis.build(),
            Err(GenesisError::InvalidBalance { .. })
        ));
    }

    #[test]
    fn test_bad_genesis_budget_rejected() {
        let mut genesis = GenesisState::empty(Timestamp::from_secs(1));
        genesis.genesis_budgets.push(GenesisBudget {
            balance: Asset::core(100),
            per_block: 0,
        });
        assert!(matches!(
            genesis.build(),
            Err(GenesisError::Budget(BudgetError::InvalidPerBlock(0)))
        ));
    }

    #[test]
    fn test_failing_operation_reports_index() {
        let mut genesis = GenesisState::from_json(DOCUMENT).expect("parse");
        genesis.operations.push(BudgetOperation::CreateBudget {
            owner: AccountName::from("bob"),
            balance: Asset::core(1),
            per_block: 1,
            auto_close: false,
        });
        assert!(matches!(
            genesis.build(),
            Err(GenesisError::Operation { index: 1, .. })
        ));
    }
}
