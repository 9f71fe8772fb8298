//! In-game clock value — day, hour, minute.

use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY:    u8 = 24;
pub const MINUTES_PER_HOUR: u8 = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorldTime {
    pub day:    u32,
    pub hour:   u8,
    pub minute: u8,
}

impl WorldTime {
    /// Returns None when hour or minute is out of range.
    pub fn new(day: u32, hour: u8, minute: u8) -> Option<Self> {
        if hour >= HOURS_PER_DAY || minute >= MINUTES_PER_HOUR {
            return None;
        }
        Some(Self { day, hour, minute })
    }

    pub fn total_minutes(&self) -> u64 {
        (self.day as u64 * HOURS_PER_DAY as u64 + self.hour as u64) * MINUTES_PER_HOUR as u64
            + self.minute as u64
    }

    /// Advance by `minutes`, rolling over hours and days.
    pub fn advance(&mut self, minutes: u32) {
        let total = self.total_minutes() + minutes as u64;
        let per_day = HOURS_PER_DAY as u64 * MINUTES_PER_HOUR as u64;
        self.day    = (total / per_day) as u32;
        self.hour   = ((total % per_day) / MINUTES_PER_HOUR as u64) as u8;
        self.minute = (total % MINUTES_PER_HOUR as u64) as u8;
    }

    pub fn phase(&self) -> DayPhase {
        match self.hour {
            5..=7   => DayPhase::Dawn,
            8..=17  => DayPhase::Day,
            18..=20 => DayPhase::Dusk,
            _       => DayPhase::Night,
        }
    }
}

/// Lighting bucket the clock's recompute hook derives from the hour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    Dawn,
    Day,
    Dusk,
    Night,
}
