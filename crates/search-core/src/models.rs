use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::formatting::{round_to, safe_ratio};
use crate::time_utils::DateWindow;

/// A dimension the query service can group rows by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Query,
    Page,
    Date,
    Device,
    Country,
    SearchAppearance,
}

impl Dimension {
    /// Wire name used by the query service and in output JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Query => "query",
            Dimension::Page => "page",
            Dimension::Date => "date",
            Dimension::Device => "device",
            Dimension::Country => "country",
            Dimension::SearchAppearance => "searchAppearance",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row returned by the search analytics query service.
///
/// Dimension values are only present for the dimensions the row was grouped
/// by; absent ones are omitted from serialized output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Calendar day in `YYYY-MM-DD` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(
        default,
        rename = "searchAppearance",
        skip_serializing_if = "Option::is_none"
    )]
    pub search_appearance: Option<String>,
    pub clicks: u64,
    pub impressions: u64,
    /// Click-through rate in `[0, 1]`, rounded to 4 decimal places.
    pub ctr: f64,
    /// Average ranking position (1 = top), rounded to 1 decimal place.
    pub position: f64,
}

impl QueryRow {
    /// Build a row from raw totals, deriving `ctr` from clicks and impressions.
    ///
    /// `ctr` is 0 when there are no impressions.
    pub fn from_totals(clicks: u64, impressions: u64, position: f64) -> Self {
        Self {
            clicks,
            impressions,
            ctr: round_to(safe_ratio(clicks as f64, impressions as f64), 4),
            position: round_to(position, 1),
            ..Default::default()
        }
    }

    /// The `query` dimension, or `""` when the row has none.
    pub fn query_or_empty(&self) -> &str {
        self.query.as_deref().unwrap_or("")
    }

    /// Value of `dimension` on this row, if set.
    pub fn dimension(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Query => self.query.as_deref(),
            Dimension::Page => self.page.as_deref(),
            Dimension::Date => self.date.as_deref(),
            Dimension::Device => self.device.as_deref(),
            Dimension::Country => self.country.as_deref(),
            Dimension::SearchAppearance => self.search_appearance.as_deref(),
        }
    }

    /// Set the value of `dimension` on this row.
    pub fn set_dimension(&mut self, dimension: Dimension, value: impl Into<String>) {
        let value = Some(value.into());
        match dimension {
            Dimension::Query => self.query = value,
            Dimension::Page => self.page = value,
            Dimension::Date => self.date = value,
            Dimension::Device => self.device = value,
            Dimension::Country => self.country = value,
            Dimension::SearchAppearance => self.search_appearance = value,
        }
    }

    /// Builder-style variant of [`set_dimension`](Self::set_dimension).
    pub fn with_dimension(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.set_dimension(dimension, value);
        self
    }
}

/// Click and impression sums over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTotals {
    pub clicks: u64,
    pub impressions: u64,
}

impl RowTotals {
    /// Sum clicks and impressions across `rows`.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a QueryRow>) -> Self {
        rows.into_iter().fold(Self::default(), |acc, row| Self {
            clicks: acc.clicks + row.clicks,
            impressions: acc.impressions + row.impressions,
        })
    }

    /// Overall click-through rate; 0 when there are no impressions.
    pub fn ctr(&self) -> f64 {
        safe_ratio(self.clicks as f64, self.impressions as f64)
    }
}

/// A single request to the search analytics query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Property identifier, e.g. `sc-domain:example.com`.
    pub site: String,
    /// First day of the range (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the range (inclusive).
    pub end_date: NaiveDate,
    /// Dimensions to group by, in key order.
    pub dimensions: Vec<Dimension>,
    /// Maximum number of rows to return.
    pub row_limit: usize,
}

impl QueryRequest {
    pub fn new(
        site: impl Into<String>,
        window: DateWindow,
        dimensions: &[Dimension],
        row_limit: usize,
    ) -> Self {
        Self {
            site: site.into(),
            start_date: window.start,
            end_date: window.end,
            dimensions: dimensions.to_vec(),
            row_limit,
        }
    }

    /// The inclusive date range covered by this request.
    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

impl fmt::Display for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<&str> = self.dimensions.iter().map(Dimension::as_str).collect();
        write!(
            f,
            "{} [{}] {}..{} limit {}",
            self.site,
            dims.join(","),
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d"),
            self.row_limit
        )
    }
}
