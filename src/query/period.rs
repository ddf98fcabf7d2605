use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::date_util::{last_day_of_month, month_abbrev, months_before};
use crate::error::{Error, Result};

static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_PERIOD_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(seat|revenue)_(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\d{4}$").unwrap()
});

/// Number of trailing months covered by the trend, issue and escalation queries.
pub const TRAILING_MONTHS: u32 = 6;

/// The calendar month a report is built for. Selects which of the per-month
/// seat/revenue columns the portfolio queries read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::PeriodParse(format!("month out of range: {month}")));
        }
        if !(1000..=9999).contains(&year) {
            return Err(Error::PeriodParse(format!("year must have four digits: {year}")));
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The period containing today's local date.
    pub fn current() -> Self {
        Self::containing(chrono::Local::now().date_naive())
    }

    /// Parse `YYYY-MM` or `current`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("current") {
            return Ok(Self::current());
        }
        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let month: u32 = caps[2].parse().unwrap();
            return Self::new(year, month);
        }
        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month_abbrev(&self) -> &'static str {
        // month is validated on construction
        month_abbrev(self.month).unwrap_or("jan")
    }

    /// Column holding this month's seat count, e.g. `seat_oct2026`.
    pub fn seat_column(&self) -> Result<String> {
        validated_column(format!("seat_{}{}", self.month_abbrev(), self.year))
    }

    /// Column holding this month's revenue, e.g. `revenue_oct2026`.
    pub fn revenue_column(&self) -> Result<String> {
        validated_column(format!("revenue_{}{}", self.month_abbrev(), self.year))
    }

    /// First and last day of the month (inclusive).
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap(),
            last_day_of_month(self.year, self.month),
        )
    }

    /// First day of the following month (exclusive upper bound).
    pub fn next_month_start(&self) -> NaiveDate {
        self.date_range().1.succ_opt().unwrap()
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Canonical key, e.g. `2026-10`.
    pub fn to_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    /// Human label, e.g. `October 2026`.
    pub fn label(&self) -> String {
        let (start, _) = self.date_range();
        start.format("%B %Y").to_string()
    }
}

/// Start of the trailing window ending on `today`.
pub fn trailing_window_start(today: NaiveDate) -> NaiveDate {
    months_before(today, TRAILING_MONTHS)
}

/// Period column names cannot go through placeholders, so every name is checked
/// against the allow-list before it reaches SQL text.
pub fn validated_column(name: String) -> Result<String> {
    if RE_PERIOD_COLUMN.is_match(&name) {
        Ok(name)
    } else {
        Err(Error::InvalidColumn(name))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}
