//! Keyword cannibalization: several pages of one site competing for a query.

use std::collections::HashMap;

use search_core::formatting::{round_to, safe_ratio};
use search_core::models::QueryRow;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pages with fewer impressions than this are ignored by default.
pub const DEFAULT_MIN_IMPRESSIONS: u64 = 10;

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Exactly two competing pages.
    Medium,
    /// Three or more competing pages.
    High,
}

impl Severity {
    pub fn from_page_count(page_count: usize) -> Self {
        if page_count >= 3 {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

/// One page ranking for a cannibalized query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetingPage {
    pub page: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// A query that lands on two or more pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannibalizationEntry {
    pub query: String,
    pub page_count: usize,
    pub severity: Severity,
    /// Competing pages, most impressions first.
    pub pages: Vec<CompetingPage>,
}

// ── Grouping fold ─────────────────────────────────────────────────────────────

struct PageSlot {
    page: CompetingPage,
    weighted_position: f64,
}

impl PageSlot {
    fn new(page: &str, row: &QueryRow) -> Self {
        Self {
            page: CompetingPage {
                page: page.to_string(),
                clicks: row.clicks,
                impressions: row.impressions,
                ctr: row.ctr,
                position: row.position,
            },
            weighted_position: row.position * row.impressions as f64,
        }
    }

    /// Fold a repeated (query, page) row into this slot.
    fn merge(&mut self, row: &QueryRow) {
        let p = &mut self.page;
        p.clicks += row.clicks;
        p.impressions += row.impressions;
        self.weighted_position += row.position * row.impressions as f64;
        p.ctr = round_to(safe_ratio(p.clicks as f64, p.impressions as f64), 4);
        p.position = round_to(safe_ratio(self.weighted_position, p.impressions as f64), 1);
    }
}

/// Pages per query, in first-seen query order.
#[derive(Default)]
struct QueryGroups {
    order: Vec<String>,
    pages: HashMap<String, Vec<PageSlot>>,
}

impl QueryGroups {
    fn with_row(mut self, query: &str, page: &str, row: &QueryRow) -> Self {
        let slots = self.pages.entry(query.to_string()).or_insert_with(|| {
            self.order.push(query.to_string());
            Vec::new()
        });
        match slots.iter_mut().find(|s| s.page.page == page) {
            Some(slot) => slot.merge(row),
            None => slots.push(PageSlot::new(page, row)),
        }
        self
    }

    fn into_entries(mut self) -> Vec<CannibalizationEntry> {
        self.order
            .iter()
            .filter_map(|query| {
                let slots = self.pages.remove(query)?;
                if slots.len() < 2 {
                    return None;
                }
                let mut pages: Vec<CompetingPage> = slots.into_iter().map(|s| s.page).collect();
                pages.sort_by(|a, b| b.impressions.cmp(&a.impressions));
                Some(CannibalizationEntry {
                    query: query.clone(),
                    page_count: pages.len(),
                    severity: Severity::from_page_count(pages.len()),
                    pages,
                })
            })
            .collect()
    }
}

// ── CannibalizationDetector ───────────────────────────────────────────────────

/// Finds queries that map to multiple pages with meaningful impressions.
#[derive(Debug, Clone, Copy)]
pub struct CannibalizationDetector {
    min_impressions: u64,
}

impl Default for CannibalizationDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_IMPRESSIONS)
    }
}

impl CannibalizationDetector {
    pub fn new(min_impressions: u64) -> Self {
        Self { min_impressions }
    }

    pub fn min_impressions(&self) -> u64 {
        self.min_impressions
    }

    /// Detect cannibalized queries in query x page rows.
    ///
    /// Rows under the impression threshold, or missing `query` or `page`, are
    /// dropped before grouping. Entries are ordered by page count
    /// (descending); equal counts keep first-seen query order.
    pub fn detect(&self, rows: &[QueryRow]) -> Vec<CannibalizationEntry> {
        let groups = rows
            .iter()
            .filter(|row| row.impressions >= self.min_impressions)
            .fold(QueryGroups::default(), |groups, row| {
                match (row.query.as_deref(), row.page.as_deref()) {
                    (Some(query), Some(page)) => groups.with_row(query, page, row),
                    _ => {
                        debug!("Skipping row without query/page: {:?}", row);
                        groups
                    }
                }
            });

        let mut entries = groups.into_entries();
        entries.sort_by(|a, b| b.page_count.cmp(&a.page_count));
        entries
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
