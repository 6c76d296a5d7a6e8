use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily budget, in the same unit space as action costs.
pub const FULL_ENERGY: u32 = 100;

/// Persisted energy budget for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyState {
    pub date: NaiveDate,
    pub current: u32,
}

impl EnergyState {
    pub fn full(date: NaiveDate) -> Self {
        Self {
            date,
            current: FULL_ENERGY,
        }
    }

    /// Remaining budget as seen on `today`: a state from any other day counts
    /// as a full recharge.
    pub fn remaining_on(&self, today: NaiveDate) -> u32 {
        if self.date == today {
            self.current.min(FULL_ENERGY)
        } else {
            FULL_ENERGY
        }
    }
}
