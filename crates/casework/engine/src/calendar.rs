//! Business calendar and clock
//!
//! Deadlines are counted in business days: Saturdays, Sundays and
//! configured holidays do not count. All instants are UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::BTreeSet;
use std::sync::Mutex;

// ── Business Calendar ────────────────────────────────────────────────

/// Converts a start instant and a number of business days into a due instant
#[derive(Clone, Debug, Default)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Advance `business_days` business days from `start`, keeping the
    /// time of day. Zero days returns `start` unchanged.
    pub fn due_date(&self, start: DateTime<Utc>, business_days: u32) -> DateTime<Utc> {
        let mut due = start;
        let mut remaining = business_days;
        while remaining > 0 {
            due += Duration::days(1);
            if self.is_business_day(due.date_naive()) {
                remaining -= 1;
            }
        }
        due
    }

    /// Business days strictly after `from` up to and including `to`
    pub fn business_days_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
        let mut day = from.date_naive();
        let end = to.date_naive();
        let mut count = 0;
        while day < end {
            day = day.succ_opt().unwrap_or(end);
            if self.is_business_day(day) {
                count += 1;
            }
        }
        count
    }
}

// ── Clock ────────────────────────────────────────────────────────────

/// Source of "now" for the engine
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
