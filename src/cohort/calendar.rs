use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

/// An absolute calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month containing an ISO `YYYY-MM-DD` cohort start.
    pub fn of_cohort_start(cohort_start: &str) -> Option<Self> {
        let date = parse_cohort_date(cohort_start)?;
        Self::new(date.year(), date.month())
    }

    /// Whole months later. The day of month plays no part, so a cohort
    /// starting on the 31st still lands in the next calendar month.
    pub fn advance(self, months: u32) -> Self {
        let base = i64::from(self.year) * 12 + i64::from(self.month) - 1;
        let target = base + i64::from(months);
        Self {
            year: target.div_euclid(12) as i32,
            month: target.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn days(self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if is_leap_year(self.year) => 29,
            2 => 28,
            _ => 31,
        }
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for CalendarMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn parse_cohort_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Calendar month a cohort-relative row falls in.
pub fn calendar_month(cohort_start: &str, month_index: u32) -> Option<CalendarMonth> {
    CalendarMonth::of_cohort_start(cohort_start).map(|m| m.advance(month_index))
}

/// `Jan '24` for a parseable cohort start, the raw string otherwise.
pub fn cohort_label(cohort_start: &str) -> String {
    match parse_cohort_date(cohort_start) {
        Some(date) => date.format("%b '%y").to_string(),
        None => cohort_start.to_string(),
    }
}
