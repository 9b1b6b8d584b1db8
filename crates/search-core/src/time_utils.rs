use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

/// Date format used by the query service and in all output documents.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Parsing / formatting ──────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` date string.
///
/// Anything else (including an empty string) is an
/// [`AuditError::InvalidDateFormat`].
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| AuditError::InvalidDateFormat(s.to_string()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// ISO-8601 week key for `date`, e.g. `"2024-W01"`.
///
/// The year is the ISO week-numbering year, which differs from the calendar
/// year for a few days around New Year.
pub fn iso_week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

// ── DateWindow ────────────────────────────────────────────────────────────────

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(with = "date_format")]
    pub start: NaiveDate,
    #[serde(with = "date_format")]
    pub end: NaiveDate,
}

impl DateWindow {
    /// The window of `days` days whose last day is `end`.
    ///
    /// A zero length is treated as a single day. A window reaching past the
    /// earliest representable date is a [`AuditError::Config`] error.
    pub fn ending_at(end: NaiveDate, days: u32) -> Result<Self> {
        let span = u64::from(days.max(1)) - 1;
        let start = days_before(end, span)?;
        Ok(Self { start, end })
    }

    /// The window of the same length that ends the day before this one starts.
    pub fn preceding(&self) -> Result<Self> {
        Self::ending_at(days_before(self.start, 1)?, self.days())
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> u32 {
        let span = (self.end - self.start).num_days() + 1;
        u32::try_from(span.max(0)).unwrap_or(u32::MAX)
    }

    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Human-readable label, e.g. `"2024-01-01 to 2024-01-30"`.
    pub fn label(&self) -> String {
        format!("{} to {}", format_date(self.start), format_date(self.end))
    }
}

/// The window of `days` days ending `lag_days` before `today`.
///
/// Search Console data lags by a few days, so the most recent days are
/// excluded from collection.
pub fn collection_window(today: NaiveDate, days: u32, lag_days: u32) -> Result<DateWindow> {
    DateWindow::ending_at(days_before(today, u64::from(lag_days))?, days)
}

fn days_before(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days)).ok_or_else(|| {
        AuditError::Config(format!(
            "{days} days before {} is outside the supported date range",
            format_date(date)
        ))
    })
}

/// Serde adapter writing dates as `YYYY-MM-DD`.
pub mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_date(&s).map_err(serde::de::Error::custom)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
