//! Budget and schedule entities.
//!
//! A [`Budget`] pays `per_block` out of its balance on every block where one
//! of its [`BudgetSchedule`]s admits the block time. Budgets and schedules
//! are joined by [`BudgetScheduleLink`] rows so either side can be looked up
//! by the other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Asset, BlockNum, BudgetOwner, ShareType, Timestamp, TypesError};

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

object_id!(
    /// Budget identifier.
    BudgetId
);
object_id!(
    /// Schedule identifier.
    ScheduleId
);
object_id!(
    /// Budget-to-schedule link identifier.
    LinkId
);

/// A locked pool of core tokens paying out per block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub owner: BudgetOwner,
    pub created: Timestamp,
    /// Remaining funds. Always denominated in the core symbol.
    pub balance: Asset,
    /// Amount paid on each eligible block.
    pub per_block: ShareType,
    /// Last height an allocation was attempted for.
    pub block_last_allocated_for: BlockNum,
    /// Close the budget once the balance is exhausted. Always false for genesis budgets.
    pub auto_close: bool,
}

impl Budget {
    /// Whether this budget was seeded at genesis.
    pub fn is_genesis(&self) -> bool {
        self.owner.is_genesis()
    }
}

/// Schedule algorithm tag, as carried by operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ScheduleAlg {
    Unconditional = 0,
    ByTimeRange = 1,
    ByPeriod = 2,
}

impl TryFrom<u16> for ScheduleAlg {
    type Error = TypesError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(ScheduleAlg::Unconditional),
            1 => Ok(ScheduleAlg::ByTimeRange),
            2 => Ok(ScheduleAlg::ByPeriod),
            other => Err(TypesError::UnknownScheduleAlg(other)),
        }
    }
}

impl From<ScheduleAlg> for u16 {
    fn from(alg: ScheduleAlg) -> Self {
        alg as u16
    }
}

impl fmt::Display for ScheduleAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleAlg::Unconditional => f.write_str("unconditional"),
            ScheduleAlg::ByTimeRange => f.write_str("by_time_range"),
            ScheduleAlg::ByPeriod => f.write_str("by_period"),
        }
    }
}

/// When a schedule admits an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alg", rename_all = "snake_case")]
pub enum ScheduleRule {
    /// Every block.
    Unconditional,
    /// Blocks with time in `[start, end]`.
    ByTimeRange { start: Timestamp, end: Timestamp },
    /// Blocks with time in `[start, start + period]`.
    ByPeriod { start: Timestamp, period: u32 },
}

impl ScheduleRule {
    /// The algorithm tag of this rule.
    pub fn alg(&self) -> ScheduleAlg {
        match self {
            ScheduleRule::Unconditional => ScheduleAlg::Unconditional,
            ScheduleRule::ByTimeRange { .. } => ScheduleAlg::ByTimeRange,
            ScheduleRule::ByPeriod { .. } => ScheduleAlg::ByPeriod,
        }
    }

    /// Whether a block at time `now` falls inside this rule. Both bounds are inclusive.
    pub fn admits(&self, now: Timestamp) -> bool {
        match *self {
            ScheduleRule::Unconditional => true,
            ScheduleRule::ByTimeRange { start, end } => now >= start && now <= end,
            ScheduleRule::ByPeriod { start, period } => {
                now >= start && now <= start.saturating_add_secs(period)
            }
        }
    }
}

/// A time-eligibility rule attached to a budget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSchedule {
    pub id: ScheduleId,
    pub rule: ScheduleRule,
    /// A locked schedule never admits an allocation.
    pub locked: bool,
}

impl BudgetSchedule {
    /// Whether this schedule grants an allocation at `now`.
    pub fn is_eligible(&self, now: Timestamp) -> bool {
        !self.locked && self.rule.admits(now)
    }
}

/// Association row between a budget and one of its schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetScheduleLink {
    pub id: LinkId,
    pub budget: BudgetId,
    pub schedule: ScheduleId,
}
