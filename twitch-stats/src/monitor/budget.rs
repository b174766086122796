//! Per-cycle request budget.
//!
//! The budget is seeded from the quota the server reports on the streams
//! call and decremented locally for every further request in the cycle.
//! It is never re-queried mid-cycle.

use thiserror::Error;

/// Default number of requests left untouched by low-priority spending.
pub const DEFAULT_QUOTA_FLOOR: u32 = 5;

/// The budget cannot cover another request at the requested priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("quota exhausted: {remaining} remaining, floor {floor}")]
pub struct QuotaExhausted {
    pub remaining: u32,
    pub floor: u32,
}

/// Depleting request budget for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaBudget {
    reported: u32,
    remaining: u32,
    floor: u32,
}

impl QuotaBudget {
    pub fn new(reported: u32, floor: u32) -> Self {
        Self {
            reported,
            remaining: reported,
            floor,
        }
    }

    /// Quota reported by the server when the cycle started.
    pub fn reported(&self) -> u32 {
        self.reported
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spend one unit as long as any budget is left.
    pub fn try_spend(&mut self) -> Result<u32, QuotaExhausted> {
        if self.remaining == 0 {
            return Err(self.exhausted());
        }
        self.remaining -= 1;
        Ok(self.remaining)
    }

    /// Spend one unit only while the budget stays at or above the floor.
    pub fn try_spend_above_floor(&mut self) -> Result<u32, QuotaExhausted> {
        if self.remaining <= self.floor {
            return Err(self.exhausted());
        }
        self.remaining -= 1;
        Ok(self.remaining)
    }

    fn exhausted(&self) -> QuotaExhausted {
        QuotaExhausted {
            remaining: self.remaining,
            floor: self.floor,
        }
    }
}
