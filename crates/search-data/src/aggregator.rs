//! Daily-to-weekly trend aggregation.

use std::collections::BTreeMap;

use search_core::error::{AuditError, Result};
use search_core::formatting::round_to;
use search_core::models::QueryRow;
use search_core::time_utils::{iso_week_key, parse_date};
use serde::{Deserialize, Serialize};

// ── WeekBucket ────────────────────────────────────────────────────────────────

/// Totals for one ISO week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekBucket {
    /// ISO week key, e.g. `"2024-W01"`.
    pub week: String,
    pub clicks: u64,
    pub impressions: u64,
    /// Mean of the daily CTR values, 4 decimal places.
    pub ctr: f64,
    /// Mean of the daily positions, 1 decimal place.
    pub avg_position: f64,
    /// Number of daily rows folded into the bucket.
    pub days: u32,
}

/// Running totals for a week while the fold is in progress.
#[derive(Debug, Clone, Default)]
struct WeekAccumulator {
    clicks: u64,
    impressions: u64,
    ctr_sum: f64,
    position_sum: f64,
    days: u32,
}

impl WeekAccumulator {
    fn add_row(&mut self, row: &QueryRow) {
        self.clicks += row.clicks;
        self.impressions += row.impressions;
        self.ctr_sum += row.ctr;
        self.position_sum += row.position;
        self.days += 1;
    }

    fn finish(self, week: String) -> WeekBucket {
        let (ctr, avg_position) = if self.days == 0 {
            (0.0, 0.0)
        } else {
            let days = f64::from(self.days);
            (
                round_to(self.ctr_sum / days, 4),
                round_to(self.position_sum / days, 1),
            )
        };
        WeekBucket {
            week,
            clicks: self.clicks,
            impressions: self.impressions,
            ctr,
            avg_position,
            days: self.days,
        }
    }
}

// ── WeeklyAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that rolls daily totals into ISO weeks.
pub struct WeeklyAggregator;

impl WeeklyAggregator {
    /// Aggregate daily rows (each carrying a `YYYY-MM-DD` `date`) by ISO week.
    ///
    /// Returns buckets sorted by week key (ascending). A missing or malformed
    /// date fails the whole aggregation with
    /// [`AuditError::InvalidDateFormat`].
    pub fn aggregate(daily_rows: &[QueryRow]) -> Result<Vec<WeekBucket>> {
        let weeks = daily_rows.iter().try_fold(
            BTreeMap::<String, WeekAccumulator>::new(),
            |mut weeks, row| {
                let date = row
                    .date
                    .as_deref()
                    .ok_or_else(|| AuditError::InvalidDateFormat(String::new()))
                    .and_then(parse_date)?;
                weeks.entry(iso_week_key(date)).or_default().add_row(row);
                Ok::<_, AuditError>(weeks)
            },
        )?;

        Ok(weeks
            .into_iter()
            .map(|(week, acc)| acc.finish(week))
            .collect())
    }

    /// Sum clicks and impressions over all buckets.
    pub fn calculate_totals(weeks: &[WeekBucket]) -> (u64, u64) {
        weeks.iter().fold((0, 0), |(clicks, impressions), w| {
            (clicks + w.clicks, impressions + w.impressions)
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
