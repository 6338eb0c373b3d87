use serde::{Deserialize, Serialize};

/// Wire value reserved for "no cap".
pub const UNLIMITED: i64 = -1;

/// Per-resource quota for one billing period.
///
/// Stored and transmitted as a plain integer: `-1` is unlimited, `0` is no
/// access, any positive value is a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum UsageLimit {
    Unlimited,
    Capped(u32),
}

impl UsageLimit {
    pub const NONE: UsageLimit = UsageLimit::Capped(0);

    pub fn as_i64(&self) -> i64 {
        match self {
            UsageLimit::Unlimited => UNLIMITED,
            UsageLimit::Capped(n) => i64::from(*n),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, UsageLimit::Unlimited)
    }

    /// False only for a zero cap.
    pub fn grants_access(&self) -> bool {
        !matches!(self, UsageLimit::Capped(0))
    }

    /// Units left in the period; `-1` when unlimited, never negative otherwise.
    pub fn remaining(&self, current: i64) -> i64 {
        match self {
            UsageLimit::Unlimited => UNLIMITED,
            UsageLimit::Capped(n) => (i64::from(*n) - current).max(0),
        }
    }

    /// Share of the cap already used, clamped to 0..=100. Unlimited and zero
    /// caps report 0.
    pub fn percent_used(&self, current: i64) -> f64 {
        match self {
            UsageLimit::Capped(n) if *n > 0 => {
                let pct = current.max(0) as f64 / f64::from(*n) * 100.0;
                pct.min(100.0)
            }
            _ => 0.0,
        }
    }

    pub fn allows_one_more(&self, current: i64) -> bool {
        match self {
            UsageLimit::Unlimited => true,
            UsageLimit::Capped(_) => self.remaining(current) > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid usage limit {0}: must be -1 (unlimited) or a non-negative count")]
pub struct InvalidUsageLimit(pub i64);

impl TryFrom<i64> for UsageLimit {
    type Error = InvalidUsageLimit;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            UNLIMITED => Ok(UsageLimit::Unlimited),
            n if n >= 0 => u32::try_from(n)
                .map(UsageLimit::Capped)
                .map_err(|_| InvalidUsageLimit(value)),
            _ => Err(InvalidUsageLimit(value)),
        }
    }
}

impl From<UsageLimit> for i64 {
    fn from(limit: UsageLimit) -> Self {
        limit.as_i64()
    }
}
