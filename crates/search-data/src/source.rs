//! The search analytics query service seam.
//!
//! Aggregation code only ever talks to a [`SearchAnalyticsSource`]. The
//! workspace ships [`ExportSource`], which answers requests from local JSONL
//! exports; tests use plain closures.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use search_core::error::{AuditError, Result};
use search_core::models::{Dimension, QueryRequest, QueryRow};
use tracing::debug;

use crate::reader::{load_export_records, ExportRecord};

// ── Trait ─────────────────────────────────────────────────────────────────────

/// Anything that can answer a search analytics query.
///
/// Implementations return rows with `ctr` rounded to 4 and `position` to 1
/// decimal place, at most `request.row_limit` of them.
pub trait SearchAnalyticsSource {
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryRow>>;
}

impl<F> SearchAnalyticsSource for F
where
    F: Fn(&QueryRequest) -> Result<Vec<QueryRow>>,
{
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryRow>> {
        self(request)
    }
}

/// Run `request` against `source`, wrapping any failure as
/// [`AuditError::UpstreamFetch`].
pub fn fetch<S>(source: &S, request: &QueryRequest) -> Result<Vec<QueryRow>>
where
    S: SearchAnalyticsSource + ?Sized,
{
    let rows = source
        .query(request)
        .map_err(|e| AuditError::UpstreamFetch {
            request: request.to_string(),
            source: Box::new(e),
        })?;
    debug!("Query {} returned {} rows", request, rows.len());
    Ok(rows)
}

// ── ExportSource ──────────────────────────────────────────────────────────────

/// Query service backed by JSONL exports on disk.
#[derive(Debug, Clone)]
pub struct ExportSource {
    data_path: PathBuf,
    records: Vec<ExportRecord>,
}

#[derive(Default)]
struct RowAccumulator {
    clicks: u64,
    impressions: u64,
    weighted_position: f64,
    position_sum: f64,
    count: u64,
}

impl RowAccumulator {
    fn add(&mut self, record: &ExportRecord) {
        self.clicks += record.clicks;
        self.impressions += record.impressions;
        self.weighted_position += record.position * record.impressions as f64;
        self.position_sum += record.position;
        self.count += 1;
    }

    /// Impression-weighted position, or the plain mean when nothing was shown.
    fn position(&self) -> f64 {
        if self.impressions > 0 {
            self.weighted_position / self.impressions as f64
        } else if self.count > 0 {
            self.position_sum / self.count as f64
        } else {
            0.0
        }
    }
}

impl ExportSource {
    /// Load every export under `data_path`.
    pub fn open(data_path: &Path) -> Result<Self> {
        let records = load_export_records(data_path)?;
        Ok(Self {
            data_path: data_path.to_path_buf(),
            records,
        })
    }

    /// Build a source over in-memory records.
    pub fn from_records(records: Vec<ExportRecord>) -> Self {
        Self {
            data_path: PathBuf::new(),
            records,
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct property identifiers present in the exports, sorted.
    pub fn sites(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.site.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl SearchAnalyticsSource for ExportSource {
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryRow>> {
        if request.row_limit == 0 {
            return Err(AuditError::Config("row limit must be positive".to_string()));
        }
        let window = request.window();

        // Insertion-ordered grouping by the requested dimension values.
        let mut keys: Vec<Vec<String>> = Vec::new();
        let mut groups: HashMap<Vec<String>, RowAccumulator> = HashMap::new();

        for record in self
            .records
            .iter()
            .filter(|r| r.matches_site(&request.site) && window.contains(r.date))
        {
            let Some(key) = request
                .dimensions
                .iter()
                .map(|d| record.dimension(*d))
                .collect::<Option<Vec<String>>>()
            else {
                continue;
            };

            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    keys.push(key);
                    RowAccumulator::default()
                })
                .add(record);
        }

        let mut rows: Vec<QueryRow> = keys
            .into_iter()
            .filter_map(|key| {
                let acc = groups.remove(&key)?;
                let mut row = QueryRow::from_totals(acc.clicks, acc.impressions, acc.position());
                for (dimension, value) in request.dimensions.iter().zip(key) {
                    row.set_dimension(*dimension, value);
                }
                Some(row)
            })
            .collect();

        if request.dimensions.contains(&Dimension::Date) {
            rows.sort_by(|a, b| a.date.cmp(&b.date).then(b.clicks.cmp(&a.clicks)));
        } else {
            rows.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        }
        rows.truncate(request.row_limit);

        Ok(rows)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
