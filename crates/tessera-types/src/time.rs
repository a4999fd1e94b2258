//! Consensus timestamps.
//!
//! Block time is whole seconds since the Unix epoch, agreed by consensus.
//! The engine never reads the host clock; every timestamp it sees comes
//! from a block header or from genesis.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch, as carried in block headers.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Earliest representable time; used as the open lower bound of a range.
    pub const MIN: Self = Self(0);

    /// Latest representable time; used as the open upper bound of a range.
    pub const MAX: Self = Self(u32::MAX);

    /// Build a timestamp from seconds since the epoch.
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch.
    pub const fn secs(self) -> u32 {
        self.0
    }

    /// Add a duration, pinning at [`Timestamp::MAX`].
    pub const fn saturating_add_secs(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Timestamp {
    fn from(secs: u32) -> Self {
        Self(secs)
    }
}
