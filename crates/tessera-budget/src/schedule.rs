//! Schedule input validation and rule construction.
//!
//! Schedule operations arrive with an optional algorithm and optional
//! start, end and period values. [`ScheduleInput::validate`] checks the
//! combination against the algorithm before anything is written:
//!
//! | algorithm       | required                  | forbidden             |
//! |-----------------|---------------------------|-----------------------|
//! | `unconditional` | nothing                   | start, end, period    |
//! | `by_time_range` | start or end (or both)    | period                |
//! | `by_period`     | period                    | nothing               |
//!
//! A time range must also move forward once a missing start is read as
//! [`Timestamp::MIN`] and a missing end as [`Timestamp::MAX`].
//!
//! The validated [`ScheduleShape`] is then turned into a [`ScheduleRule`]
//! at the block time the operation executes in.

use serde::{Deserialize, Serialize};
use tessera_types::{ScheduleAlg, ScheduleRule, Timestamp};

use crate::{BudgetError, Result};

/// Raw schedule parameters supplied by an operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleInput {
    #[serde(default)]
    pub alg: Option<ScheduleAlg>,
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(default)]
    pub end: Option<Timestamp>,
    /// Window length in seconds.
    #[serde(default)]
    pub period: Option<u32>,
}

/// A schedule input that passed validation, one variant per algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleShape {
    Unconditional,
    ByTimeRange {
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    },
    ByPeriod {
        period: u32,
    },
}

impl ScheduleInput {
    /// Input for an unconditional schedule.
    pub fn unconditional() -> Self {
        Self {
            alg: Some(ScheduleAlg::Unconditional),
            ..Self::default()
        }
    }

    /// Input for a time-range schedule.
    pub fn time_range(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        Self {
            alg: Some(ScheduleAlg::ByTimeRange),
            start,
            end,
            period: None,
        }
    }

    /// Input for a periodic schedule.
    pub fn periodic(period: u32) -> Self {
        Self {
            alg: Some(ScheduleAlg::ByPeriod),
            period: Some(period),
            ..Self::default()
        }
    }

    /// Check the input against its algorithm, using `fallback` when no
    /// algorithm was supplied.
    ///
    /// # Errors
    ///
    /// - [`BudgetError::InvalidSchedule`] if a required value is missing or a forbidden one is present
    /// - [`BudgetError::InvalidTimeRange`] if the resolved range does not move forward
    pub fn validate(&self, fallback: ScheduleAlg) -> Result<ScheduleShape> {
        let alg = self.alg.unwrap_or(fallback);
        match alg {
            ScheduleAlg::Unconditional => {
                if self.start.is_some() || self.end.is_some() || self.period.is_some() {
                    return Err(BudgetError::InvalidSchedule {
                        alg,
                        reason: "start, end and period must be absent",
                    });
                }
                Ok(ScheduleShape::Unconditional)
            }
            ScheduleAlg::ByTimeRange => {
                if self.start.is_none() && self.end.is_none() {
                    return Err(BudgetError::InvalidSchedule {
                        alg,
                        reason: "start or end is required",
                    });
                }
                if self.period.is_some() {
                    return Err(BudgetError::InvalidSchedule {
                        alg,
                        reason: "period must be absent",
                    });
                }
                let start = self.start.unwrap_or(Timestamp::MIN);
                let end = self.end.unwrap_or(Timestamp::MAX);
                if start >= end {
                    return Err(BudgetError::InvalidTimeRange { start, end });
                }
                Ok(ScheduleShape::ByTimeRange {
                    start: self.start,
                    end: self.end,
                })
            }
            ScheduleAlg::ByPeriod => match self.period {
                Some(period) => Ok(ScheduleShape::ByPeriod { period }),
                None => Err(BudgetError::InvalidSchedule {
                    alg,
                    reason: "period is required",
                }),
            },
        }
    }
}

impl ScheduleShape {
    /// Build the stored rule for a schedule set up at block time `now`.
    ///
    /// A time range without a start opens at `now`; without an end it never
    /// closes. A periodic window always opens at `now`.
    pub fn into_rule(self, now: Timestamp) -> ScheduleRule {
        match self {
            ScheduleShape::Unconditional => ScheduleRule::Unconditional,
            ScheduleShape::ByTimeRange { start, end } => ScheduleRule::ByTimeRange {
                start: start.unwrap_or(now),
                end: end.unwrap_or(Timestamp::MAX),
            },
            ScheduleShape::ByPeriod { period } => ScheduleRule::ByPeriod { start: now, period },
        }
    }
}
