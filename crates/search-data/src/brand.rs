//! Brand / non-brand query classification.

use regex::{Regex, RegexBuilder};
use search_core::error::Result;
use search_core::formatting::{round_to, safe_ratio};
use search_core::models::{QueryRow, RowTotals};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of brand and non-brand example queries kept in the report.
pub const BRAND_QUERY_SAMPLE: usize = 50;

const SKIPPED_NOTE: &str =
    "No brand terms provided. Use --brand-terms to enable brand/non-brand split.";

// ── BrandClassifier ───────────────────────────────────────────────────────────

/// Case-insensitive substring matcher over a set of literal brand terms.
#[derive(Debug, Clone)]
pub struct BrandClassifier {
    pattern: Regex,
    terms: Vec<String>,
}

/// Rows partitioned by [`BrandClassifier::classify`], input order preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrandSplit {
    pub brand: Vec<QueryRow>,
    pub non_brand: Vec<QueryRow>,
}

impl BrandClassifier {
    /// Build a classifier from `terms`.
    ///
    /// Terms are trimmed and lower-cased; blank ones are dropped. Returns
    /// `Ok(None)` when no usable term remains.
    pub fn new<I, S>(terms: I) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Ok(None);
        }

        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()?;

        Ok(Some(Self { pattern, terms }))
    }

    /// Build a classifier from a comma-separated term list.
    pub fn from_csv(terms: &str) -> Result<Option<Self>> {
        Self::new(terms.split(','))
    }

    /// The normalized terms the pattern was built from.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Whether `query` contains any brand term.
    pub fn is_brand(&self, query: &str) -> bool {
        self.pattern.is_match(&query.to_lowercase())
    }

    /// Partition `rows` into brand and non-brand sets.
    pub fn classify(&self, rows: &[QueryRow]) -> BrandSplit {
        let (brand, non_brand): (Vec<QueryRow>, Vec<QueryRow>) = rows
            .iter()
            .cloned()
            .partition(|row| self.is_brand(row.query_or_empty()));
        BrandSplit { brand, non_brand }
    }
}

// ── BrandAnalysis ─────────────────────────────────────────────────────────────

/// Brand vs non-brand traffic breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandBreakdown {
    pub brand_terms_used: String,
    pub brand_clicks: u64,
    pub non_brand_clicks: u64,
    pub brand_impressions: u64,
    pub non_brand_impressions: u64,
    /// Brand clicks as a share of all clicks, 4 decimal places.
    pub brand_click_share: f64,
    pub brand_queries: Vec<QueryRow>,
    pub top_non_brand_queries: Vec<QueryRow>,
}

/// The `brand_analysis` section of the audit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrandAnalysis {
    Split(BrandBreakdown),
    /// No brand terms were configured.
    Skipped {
        brand_terms_used: Option<String>,
        note: String,
    },
}

impl BrandAnalysis {
    /// Analyse `rows` using the comma-separated `brand_terms`.
    ///
    /// `total_clicks` is the denominator for the brand click share.
    pub fn build(rows: &[QueryRow], brand_terms: Option<&str>, total_clicks: u64) -> Result<Self> {
        let classifier = match brand_terms {
            Some(terms) => BrandClassifier::from_csv(terms)?,
            None => None,
        };
        let (Some(classifier), Some(terms)) = (classifier, brand_terms) else {
            return Ok(Self::skipped());
        };

        debug!("Brand pattern built from terms {:?}", classifier.terms());
        let split = classifier.classify(rows);
        let brand = RowTotals::from_rows(&split.brand);
        let non_brand = RowTotals::from_rows(&split.non_brand);

        let mut top_non_brand = split.non_brand;
        top_non_brand.sort_by(|a, b| b.clicks.cmp(&a.clicks));
        top_non_brand.truncate(BRAND_QUERY_SAMPLE);

        let mut brand_queries = split.brand;
        brand_queries.truncate(BRAND_QUERY_SAMPLE);

        Ok(Self::Split(BrandBreakdown {
            brand_terms_used: terms.to_string(),
            brand_clicks: brand.clicks,
            non_brand_clicks: non_brand.clicks,
            brand_impressions: brand.impressions,
            non_brand_impressions: non_brand.impressions,
            brand_click_share: round_to(safe_ratio(brand.clicks as f64, total_clicks as f64), 4),
            brand_queries,
            top_non_brand_queries: top_non_brand,
        }))
    }

    pub fn skipped() -> Self {
        Self::Skipped {
            brand_terms_used: None,
            note: SKIPPED_NOTE.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
