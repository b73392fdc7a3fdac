use std::sync::Mutex;

use chrono::{Local, NaiveDate};

/// Source of the calendar date used for the daily counter.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Date set by hand.
#[derive(Debug)]
pub struct ManualClock {
    date: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        if let Ok(mut current) = self.date.lock() {
            *current = date;
        }
    }

    /// Move forward one day.
    pub fn advance_day(&self) {
        if let Ok(mut current) = self.date.lock() {
            if let Some(next) = current.succ_opt() {
                *current = next;
            }
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        match self.date.lock() {
            Ok(date) => *date,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
