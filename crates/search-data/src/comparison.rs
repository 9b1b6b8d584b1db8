//! Period-over-period comparison with rising / declining query movers.

use std::collections::HashMap;

use chrono::NaiveDate;
use search_core::error::Result;
use search_core::models::{Dimension, QueryRequest, QueryRow, RowTotals};
use search_core::time_utils::DateWindow;
use serde::{Deserialize, Serialize};

use crate::source::{fetch, SearchAnalyticsSource};

pub const DEFAULT_COMPARISON_DAYS: u32 = 30;
/// Click change a query must exceed to count as a mover.
pub const DEFAULT_MOVER_THRESHOLD: i64 = 5;
pub const DEFAULT_MAX_MOVERS: usize = 20;
/// Rows requested per window.
pub const COMPARISON_ROW_LIMIT: usize = 500;

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub clicks: u64,
    pub impressions: u64,
    /// e.g. `"2024-01-01 to 2024-01-30"`.
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mover {
    pub query: String,
    pub click_delta: i64,
    pub impression_delta: i64,
    pub current_clicks: u64,
    pub previous_clicks: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movers {
    /// Largest click gains first.
    pub rising: Vec<Mover>,
    /// Largest click losses first.
    pub declining: Vec<Mover>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodTotals,
    pub previous: PeriodTotals,
    pub movers: Movers,
}

// ── PeriodComparator ──────────────────────────────────────────────────────────

/// Compares two adjacent, equal-length windows of per-query data.
#[derive(Debug, Clone, Copy)]
pub struct PeriodComparator {
    days: u32,
    threshold: i64,
    max_movers: usize,
}

impl Default for PeriodComparator {
    fn default() -> Self {
        Self::new(DEFAULT_COMPARISON_DAYS)
    }
}

impl PeriodComparator {
    pub fn new(days: u32) -> Self {
        Self {
            days,
            threshold: DEFAULT_MOVER_THRESHOLD,
            max_movers: DEFAULT_MAX_MOVERS,
        }
    }

    /// `(current, previous)` windows for an anchor `end` date.
    pub fn windows(&self, end: NaiveDate) -> Result<(DateWindow, DateWindow)> {
        let current = DateWindow::ending_at(end, self.days)?;
        let previous = current.preceding()?;
        Ok((current, previous))
    }

    /// Fetch both windows from `source` and compare them.
    pub fn compare<S>(&self, source: &S, site: &str, end: NaiveDate) -> Result<PeriodComparison>
    where
        S: SearchAnalyticsSource + ?Sized,
    {
        let (current, previous) = self.windows(end)?;
        let dims = [Dimension::Query];
        let current_rows = fetch(
            source,
            &QueryRequest::new(site, current, &dims, COMPARISON_ROW_LIMIT),
        )?;
        let previous_rows = fetch(
            source,
            &QueryRequest::new(site, previous, &dims, COMPARISON_ROW_LIMIT),
        )?;
        Ok(self.compare_rows(current, previous, &current_rows, &previous_rows))
    }

    /// Compare already-fetched per-query rows for two windows.
    pub fn compare_rows(
        &self,
        current: DateWindow,
        previous: DateWindow,
        current_rows: &[QueryRow],
        previous_rows: &[QueryRow],
    ) -> PeriodComparison {
        let current_map = QueryLookup::build(current_rows);
        let previous_map = QueryLookup::build(previous_rows);

        let mut rising = Vec::new();
        let mut declining = Vec::new();

        for query in current_map.union_queries(&previous_map) {
            let cur = current_map.get(query);
            let prev = previous_map.get(query);
            let click_delta = cur.clicks as i64 - prev.clicks as i64;
            let mover = Mover {
                query: query.to_string(),
                click_delta,
                impression_delta: cur.impressions as i64 - prev.impressions as i64,
                current_clicks: cur.clicks,
                previous_clicks: prev.clicks,
            };
            if click_delta > self.threshold {
                rising.push(mover);
            } else if click_delta < -self.threshold {
                declining.push(mover);
            }
        }

        rising.sort_by(|a, b| {
            b.click_delta
                .cmp(&a.click_delta)
                .then_with(|| a.query.cmp(&b.query))
        });
        declining.sort_by(|a, b| {
            a.click_delta
                .cmp(&b.click_delta)
                .then_with(|| a.query.cmp(&b.query))
        });
        rising.truncate(self.max_movers);
        declining.truncate(self.max_movers);

        PeriodComparison {
            current: period_totals(current, current_rows),
            previous: period_totals(previous, previous_rows),
            movers: Movers { rising, declining },
        }
    }
}

fn period_totals(window: DateWindow, rows: &[QueryRow]) -> PeriodTotals {
    let totals = RowTotals::from_rows(rows);
    PeriodTotals {
        clicks: totals.clicks,
        impressions: totals.impressions,
        period: window.label(),
    }
}

/// Query -> totals for one window, remembering first-seen order.
struct QueryLookup<'a> {
    order: Vec<&'a str>,
    totals: HashMap<&'a str, RowTotals>,
}

impl<'a> QueryLookup<'a> {
    fn build(rows: &'a [QueryRow]) -> Self {
        let mut order = Vec::new();
        let mut totals: HashMap<&'a str, RowTotals> = HashMap::new();
        for row in rows {
            let query = row.query_or_empty();
            let entry = totals.entry(query).or_insert_with(|| {
                order.push(query);
                RowTotals::default()
            });
            entry.clicks += row.clicks;
            entry.impressions += row.impressions;
        }
        Self { order, totals }
    }

    /// Totals for `query`; zero when the window never saw it.
    fn get(&self, query: &str) -> RowTotals {
        self.totals.get(query).copied().unwrap_or_default()
    }

    /// Queries seen in either window, this window's first.
    fn union_queries<'b>(&'b self, other: &'b QueryLookup<'a>) -> impl Iterator<Item = &'a str> + 'b {
        self.order.iter().copied().chain(
            other
                .order
                .iter()
                .copied()
                .filter(move |q| !self.totals.contains_key(q)),
        )
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
