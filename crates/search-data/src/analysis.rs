//! Main audit collection pipeline.
//!
//! Runs every query the audit needs against a [`SearchAnalyticsSource`],
//! post-processes the rows, and assembles an [`AuditReport`].

use std::path::Path;

use chrono::NaiveDate;
use search_core::error::Result;
use search_core::formatting::{round_to, safe_ratio};
use search_core::models::{Dimension, QueryRequest, QueryRow, RowTotals};
use search_core::time_utils::{collection_window, date_format, DateWindow};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::{WeekBucket, WeeklyAggregator};
use crate::brand::BrandAnalysis;
use crate::cannibalization::{CannibalizationDetector, CannibalizationEntry, DEFAULT_MIN_IMPRESSIONS};
use crate::comparison::{PeriodComparator, PeriodComparison, DEFAULT_COMPARISON_DAYS};
use crate::source::{fetch, SearchAnalyticsSource};

/// Search Console data is typically complete only up to this many days ago.
pub const DATA_LAG_DAYS: u32 = 3;
pub const DEFAULT_COLLECTION_DAYS: u32 = 90;

// ── AuditConfig ───────────────────────────────────────────────────────────────

/// Inputs for one collection run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub site_url: String,
    /// Day the run happens; recorded as `collection_date`.
    pub collection_date: NaiveDate,
    /// Range of days to collect.
    pub window: DateWindow,
    /// Comma-separated brand terms, if any.
    pub brand_terms: Option<String>,
    pub comparison_days: u32,
    pub min_impressions: u64,
}

impl AuditConfig {
    /// Collect `days` days ending [`DATA_LAG_DAYS`] before `today`.
    ///
    /// Fails when the window would start before the earliest representable
    /// date.
    pub fn new(site_url: impl Into<String>, today: NaiveDate, days: u32) -> Result<Self> {
        Ok(Self {
            site_url: site_url.into(),
            collection_date: today,
            window: collection_window(today, days, DATA_LAG_DAYS)?,
            brand_terms: None,
            comparison_days: DEFAULT_COMPARISON_DAYS,
            min_impressions: DEFAULT_MIN_IMPRESSIONS,
        })
    }

    /// Collect the same number of days, ending exactly on `end`.
    pub fn ending_on(mut self, end: NaiveDate) -> Result<Self> {
        self.window = DateWindow::ending_at(end, self.window.days())?;
        Ok(self)
    }

    pub fn with_brand_terms(mut self, terms: Option<String>) -> Self {
        self.brand_terms = terms;
        self
    }

    pub fn with_comparison_days(mut self, days: u32) -> Self {
        self.comparison_days = days;
        self
    }

    pub fn with_min_impressions(mut self, min_impressions: u64) -> Self {
        self.min_impressions = min_impressions;
        self
    }

    fn request(&self, dimensions: &[Dimension], row_limit: usize) -> QueryRequest {
        QueryRequest::new(self.site_url.clone(), self.window, dimensions, row_limit)
    }
}

// ── AuditReport ───────────────────────────────────────────────────────────────

/// Headline numbers over the top queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub average_ctr: f64,
    /// Impression-weighted average position.
    pub average_position: f64,
    pub total_queries: usize,
}

impl AuditSummary {
    pub fn from_rows(rows: &[QueryRow]) -> Self {
        let totals = RowTotals::from_rows(rows);
        let weighted: f64 = rows
            .iter()
            .map(|r| r.position * r.impressions as f64)
            .sum();
        Self {
            total_clicks: totals.clicks,
            total_impressions: totals.impressions,
            average_ctr: round_to(totals.ctr(), 4),
            average_position: round_to(safe_ratio(weighted, totals.impressions as f64), 1),
            total_queries: rows.len(),
        }
    }
}

/// The complete audit document written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub site_url: String,
    #[serde(with = "date_format")]
    pub collection_date: NaiveDate,
    pub date_range: DateWindow,
    pub top_queries: Vec<QueryRow>,
    pub summary: AuditSummary,
    pub brand_analysis: BrandAnalysis,
    pub landing_pages: Vec<QueryRow>,
    pub cannibalization: Vec<CannibalizationEntry>,
    pub devices: Vec<QueryRow>,
    pub countries: Vec<QueryRow>,
    pub daily_data: Vec<QueryRow>,
    pub weekly_trends: Vec<WeekBucket>,
    pub search_appearance: Vec<QueryRow>,
    pub page_device: Vec<QueryRow>,
    pub period_comparison: PeriodComparison,
}

impl AuditReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Atomically write the report to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Collect all audit data for `config.site_url` from `source`.
///
/// Any query failure aborts the run.
pub fn collect_audit<S>(source: &S, config: &AuditConfig) -> Result<AuditReport>
where
    S: SearchAnalyticsSource + ?Sized,
{
    info!(
        "Collecting data for {} ({})",
        config.site_url,
        config.window.label()
    );

    info!("Collecting top queries...");
    let top_queries = fetch(source, &config.request(&[Dimension::Query], 1000))?;
    let summary = AuditSummary::from_rows(&top_queries);

    info!("Analyzing brand vs non-brand...");
    let brand_analysis = BrandAnalysis::build(
        &top_queries,
        config.brand_terms.as_deref(),
        summary.total_clicks,
    )?;

    info!("Collecting top landing pages...");
    let landing_pages = fetch(source, &config.request(&[Dimension::Page], 500))?;

    info!("Collecting query x page data...");
    let query_page = fetch(
        source,
        &config.request(&[Dimension::Query, Dimension::Page], 2000),
    )?;
    let cannibalization = CannibalizationDetector::new(config.min_impressions).detect(&query_page);

    info!("Collecting device breakdown...");
    let devices = fetch(source, &config.request(&[Dimension::Device], 3))?;

    info!("Collecting country breakdown...");
    let countries = fetch(source, &config.request(&[Dimension::Country], 30))?;

    info!("Collecting daily trends...");
    let daily_data = fetch(
        source,
        &config.request(&[Dimension::Date], config.window.days() as usize),
    )?;
    let weekly_trends = WeeklyAggregator::aggregate(&daily_data)?;
    let (week_clicks, week_impressions) = WeeklyAggregator::calculate_totals(&weekly_trends);
    info!(
        "Rolled {} days into {} weeks ({} clicks, {} impressions)",
        daily_data.len(),
        weekly_trends.len(),
        week_clicks,
        week_impressions
    );

    info!("Collecting search appearance data...");
    let search_appearance = fetch(source, &config.request(&[Dimension::SearchAppearance], 20))?;

    info!("Collecting page x device data...");
    let page_device = fetch(
        source,
        &config.request(&[Dimension::Page, Dimension::Device], 500),
    )?;

    info!("Computing {}-day period comparison...", config.comparison_days);
    let period_comparison = PeriodComparator::new(config.comparison_days).compare(
        source,
        &config.site_url,
        config.window.end,
    )?;

    Ok(AuditReport {
        site_url: config.site_url.clone(),
        collection_date: config.collection_date,
        date_range: config.window,
        top_queries,
        summary,
        brand_analysis,
        landing_pages,
        cannibalization,
        devices,
        countries,
        daily_data,
        weekly_trends,
        search_appearance,
        page_device,
        period_comparison,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ExportRecord;
    use crate::source::ExportSource;
    use chrono::Duration;
    use search_core::error::AuditError;
    use search_core::time_utils::parse_date;
    use tempfile::TempDir;

    const SITE: &str = "sc-domain:acme.com";

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn rec(
        date: NaiveDate,
        query: &str,
        page: &str,
        device: &str,
        clicks: u64,
        impressions: u64,
        position: f64,
    ) -> ExportRecord {
        let mut r = ExportRecord::new(date, clicks, impressions, position);
        r.site = Some(SITE.to_string());
        r.query = Some(query.to_string());
        r.page = Some(page.to_string());
        r.device = Some(device.to_string());
        r.country = Some("usa".to_string());
        r
    }

    /// Sixty days of traffic ending 2024-03-31: the collection window plus
    /// the preceding comparison window.
    fn fixture() -> ExportSource {
        let end = d("2024-03-31");
        let mut records = Vec::new();
        for offset in 0..60 {
            let day = end - Duration::days(offset);
            let recent = offset < 30;
            records.push(rec(day, "acme login", "/login", "DESKTOP", 2, 20, 1.0));
            records.push(rec(day, "widgets", "/widgets", "MOBILE", if recent { 3 } else { 1 }, 100, 4.0));
            records.push(rec(day, "widgets", "/blog/widgets", "MOBILE", 0, 30, 12.0));
            records.push(rec(day, "cheap widgets", "/widgets", "DESKTOP", 0, 5, 20.0));
        }
        ExportSource::from_records(records)
    }

    fn config() -> AuditConfig {
        AuditConfig::new(SITE, d("2024-04-03"), 30)
            .unwrap()
            .with_brand_terms(Some("acme".to_string()))
    }

    #[test]
    fn test_config_window_applies_lag() {
        let c = config();
        assert_eq!(c.window.end, d("2024-03-31"));
        assert_eq!(c.window.start, d("2024-03-02"));

        let explicit = c.ending_on(d("2024-02-29")).unwrap();
        assert_eq!(explicit.window.end, d("2024-02-29"));
        assert_eq!(explicit.window.days(), 30);
    }

    #[test]
    fn test_config_rejects_window_past_min_date() {
        let err = AuditConfig::new(SITE, d("2024-04-03"), 200_000_000).unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[test]
    fn test_summary_weighted_position_and_zero_guard() {
        let rows = vec![
            QueryRow::from_totals(10, 100, 2.0),
            QueryRow::from_totals(0, 300, 6.0),
        ];
        let s = AuditSummary::from_rows(&rows);
        assert_eq!(s.total_clicks, 10);
        assert_eq!(s.total_impressions, 400);
        assert_eq!(s.average_ctr, 0.025);
        assert_eq!(s.average_position, 5.0);
        assert_eq!(s.total_queries, 2);

        let empty = AuditSummary::from_rows(&[]);
        assert_eq!(empty.average_ctr, 0.0);
        assert_eq!(empty.average_position, 0.0);
    }

    #[test]
    fn test_collect_audit_end_to_end() {
        let report = collect_audit(&fixture(), &config()).unwrap();

        assert_eq!(report.site_url, SITE);
        assert_eq!(report.date_range.start, d("2024-03-02"));

        // 30 days x (2 + 3 + 0 + 0) clicks.
        assert_eq!(report.summary.total_clicks, 150);
        assert_eq!(report.summary.total_queries, 3);
        assert_eq!(report.top_queries[0].query.as_deref(), Some("widgets"));

        match &report.brand_analysis {
            BrandAnalysis::Split(b) => {
                assert_eq!(b.brand_clicks, 60);
                assert_eq!(b.non_brand_clicks, 90);
                assert_eq!(b.brand_click_share, 0.4);
            }
            other => panic!("expected split, got {other:?}"),
        }

        assert_eq!(report.cannibalization.len(), 1);
        assert_eq!(report.cannibalization[0].query, "widgets");
        assert_eq!(report.cannibalization[0].pages[0].page, "/widgets");

        assert_eq!(report.devices.len(), 2);
        assert_eq!(report.countries.len(), 1);
        assert_eq!(report.daily_data.len(), 30);
        assert_eq!(
            report.weekly_trends.iter().map(|w| w.days).sum::<u32>(),
            30
        );
        assert!(report.search_appearance.is_empty());
        assert_eq!(report.page_device.len(), 4);

        let cmp = &report.period_comparison;
        assert_eq!(cmp.current.period, "2024-03-02 to 2024-03-31");
        assert_eq!(cmp.current.clicks, 150);
        assert_eq!(cmp.previous.clicks, 90);
        assert_eq!(cmp.movers.rising.len(), 1);
        assert_eq!(cmp.movers.rising[0].query, "widgets");
        assert_eq!(cmp.movers.rising[0].click_delta, 60);
    }

    #[test]
    fn test_report_json_top_level_keys() {
        let report = collect_audit(&fixture(), &config()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        for key in [
            "site_url",
            "collection_date",
            "date_range",
            "top_queries",
            "summary",
            "brand_analysis",
            "landing_pages",
            "cannibalization",
            "devices",
            "countries",
            "daily_data",
            "weekly_trends",
            "search_appearance",
            "page_device",
            "period_comparison",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["collection_date"], "2024-04-03");
        assert_eq!(value["date_range"]["end"], "2024-03-31");
        assert_eq!(value["cannibalization"][0]["severity"], "medium");
    }

    #[test]
    fn test_collect_without_brand_terms_records_note() {
        let config = AuditConfig::new(SITE, d("2024-04-03"), 30).unwrap();
        let report = collect_audit(&fixture(), &config).unwrap();
        assert_eq!(report.brand_analysis, BrandAnalysis::skipped());
    }

    #[test]
    fn test_collect_fails_on_fetch_error() {
        let source = |req: &QueryRequest| -> Result<Vec<QueryRow>> {
            if req.dimensions == [Dimension::Country] {
                Err(AuditError::Config("quota".to_string()))
            } else {
                Ok(Vec::new())
            }
        };
        let err = collect_audit(&source, &config()).unwrap_err();
        match err {
            AuditError::UpstreamFetch { request, .. } => assert!(request.contains("[country]")),
            other => panic!("expected UpstreamFetch, got {other:?}"),
        }
    }

    #[test]
    fn test_collect_from_empty_source_yields_empty_report() {
        let source = |_: &QueryRequest| -> Result<Vec<QueryRow>> { Ok(Vec::new()) };
        let report = collect_audit(&source, &config()).unwrap();
        assert_eq!(report.summary.total_clicks, 0);
        assert_eq!(report.summary.average_ctr, 0.0);
        assert!(report.cannibalization.is_empty());
        assert!(report.weekly_trends.is_empty());
        assert!(report.period_comparison.movers.rising.is_empty());
    }

    #[test]
    fn test_save_to_creates_parents_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("audit.json");
        let report = collect_audit(&fixture(), &config()).unwrap();

        report.save_to(&path).unwrap();

        let loaded: AuditReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.cannibalization, report.cannibalization);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
