//! Accounts and budget ownership.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Asset;

/// Name reserved for the system account that owns genesis budgets.
///
/// No real account can be registered under this name.
pub const RESERVED_ACCOUNT_NAME: &str = "";

/// An account name.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Wrap a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the reserved system account.
    pub fn is_reserved(&self) -> bool {
        self.0 == RESERVED_ACCOUNT_NAME
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A ledger account with a liquid balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: AccountName,
    pub balance: Asset,
}

/// Who a budget belongs to.
///
/// Genesis budgets are owned by the system and carry no schedules; every
/// other budget is owned by a regular account.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetOwner {
    /// Seeded at chain start, owned by the reserved system account.
    Genesis,
    /// Funded by and repaid to a regular account.
    Account(AccountName),
}

impl BudgetOwner {
    /// Classify an account name, mapping the reserved name to [`BudgetOwner::Genesis`].
    pub fn from_account(name: &AccountName) -> Self {
        if name.is_reserved() {
            BudgetOwner::Genesis
        } else {
            BudgetOwner::Account(name.clone())
        }
    }

    /// The owning account, if this is not a genesis budget.
    pub fn account(&self) -> Option<&AccountName> {
        match self {
            BudgetOwner::Genesis => None,
            BudgetOwner::Account(name) => Some(name),
        }
    }

    /// Whether this is the system owner.
    pub fn is_genesis(&self) -> bool {
        matches!(self, BudgetOwner::Genesis)
    }
}

impl fmt::Display for BudgetOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetOwner::Genesis => f.write_str("<genesis>"),
            BudgetOwner::Account(name) => write!(f, "{name}"),
        }
    }
}
