use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonthState {
    Open,
    Finalized,
}

/// One accounting period. `month` is the calendar month number, 1 through 12.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Month {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub state: MonthState,
}

impl Month {
    pub fn name(&self) -> &'static str {
        month_name(self.month)
    }

    pub fn is_finalized(&self) -> bool {
        self.state == MonthState::Finalized
    }

    pub fn can_transition_to(&self, next: MonthState) -> bool {
        matches!((self.state, next), (MonthState::Open, MonthState::Finalized))
    }

    pub fn transition_to(&mut self, next: MonthState) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.state = next;
            return Ok(());
        }

        Err(DomainError::InvalidMonthTransition { from: self.state, to: next })
    }

    /// The `(year, month)` pair the carried-forward successor period lives in.
    pub fn successor(&self) -> (i32, u32) {
        next_period(self.year, self.month)
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

pub fn next_period(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
