//! JSONL export discovery and loading.
//!
//! Exports are line-delimited JSON dumps of raw Search Console rows, one row
//! per (day, query, page, device, country, search appearance) combination.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use search_core::error::{AuditError, Result};
use search_core::models::Dimension;
use search_core::time_utils::{format_date, parse_date};
use serde::Deserialize;
use tracing::{debug, warn};

// ── ExportRecord ──────────────────────────────────────────────────────────────

/// One raw row as it appears in an export file.
#[derive(Debug, Deserialize)]
struct RawExportRecord {
    #[serde(default)]
    site: Option<String>,
    #[serde(default)]
    date: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default, rename = "searchAppearance")]
    search_appearance: Option<String>,
    #[serde(default)]
    clicks: u64,
    #[serde(default)]
    impressions: u64,
    /// Required; Search Console never reports a position below 1.
    position: f64,
}

/// A validated export row with its date parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    /// Property the row belongs to; `None` matches every property.
    pub site: Option<String>,
    pub date: NaiveDate,
    pub query: Option<String>,
    pub page: Option<String>,
    pub device: Option<String>,
    pub country: Option<String>,
    pub search_appearance: Option<String>,
    pub clicks: u64,
    pub impressions: u64,
    pub position: f64,
}

impl ExportRecord {
    /// A record for `date` with every dimension unset.
    pub fn new(date: NaiveDate, clicks: u64, impressions: u64, position: f64) -> Self {
        Self {
            site: None,
            date,
            query: None,
            page: None,
            device: None,
            country: None,
            search_appearance: None,
            clicks,
            impressions,
            position,
        }
    }

    /// Value of `dimension` for this record, if the export carries it.
    pub fn dimension(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Date => Some(format_date(self.date)),
            Dimension::Query => self.query.clone(),
            Dimension::Page => self.page.clone(),
            Dimension::Device => self.device.clone(),
            Dimension::Country => self.country.clone(),
            Dimension::SearchAppearance => self.search_appearance.clone(),
        }
    }

    /// Whether the record belongs to `site`.
    pub fn matches_site(&self, site: &str) -> bool {
        self.site.as_deref().map_or(true, |s| s == site)
    }
}

impl TryFrom<RawExportRecord> for ExportRecord {
    type Error = AuditError;

    fn try_from(raw: RawExportRecord) -> Result<Self> {
        Ok(Self {
            site: raw.site,
            date: parse_date(&raw.date)?,
            query: raw.query,
            page: raw.page,
            device: raw.device,
            country: raw.country,
            search_appearance: raw.search_appearance,
            clicks: raw.clicks,
            impressions: raw.impressions,
            position: raw.position,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.jsonl` files recursively under `data_path`, sorted by path.
///
/// A missing directory yields no files. An entry that cannot be walked, such
/// as a dangling symlink, is an [`AuditError::FileRead`].
pub fn find_export_files(data_path: &Path) -> Result<Vec<PathBuf>> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(data_path).follow_links(true) {
        let entry = entry.map_err(|err| AuditError::FileRead {
            path: err
                .path()
                .map_or_else(|| data_path.to_path_buf(), Path::to_path_buf),
            source: err.into(),
        })?;
        let is_export = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .map(|ext| ext == "jsonl")
                .unwrap_or(false);
        if is_export {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Load every export record under `data_path`.
///
/// Blank lines, lines that are not valid JSON and records without a
/// `position` are skipped. A file that cannot be opened or read aborts the
/// load with [`AuditError::FileRead`]; a record whose `date` is not
/// `YYYY-MM-DD` aborts it with [`AuditError::InvalidDateFormat`].
pub fn load_export_records(data_path: &Path) -> Result<Vec<ExportRecord>> {
    if !data_path.exists() {
        return Err(AuditError::DataPathNotFound(data_path.to_path_buf()));
    }

    let files = find_export_files(data_path)?;
    if files.is_empty() {
        return Err(AuditError::NoDataFiles(data_path.to_path_buf()));
    }

    let mut records = Vec::new();
    for file_path in &files {
        records.extend(read_export_file(file_path)?);
    }

    debug!(
        "Loaded {} export records from {} files",
        records.len(),
        files.len()
    );
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_export_file(file_path: &Path) -> Result<Vec<ExportRecord>> {
    let file = std::fs::File::open(file_path).map_err(|source| AuditError::FileRead {
        path: file_path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    let mut skipped = 0u64;

    for line_result in reader.lines() {
        let line = line_result.map_err(|source| AuditError::FileRead {
            path: file_path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let raw: RawExportRecord = match serde_json::from_str(trimmed) {
            Ok(r) => r,
            Err(e) => {
                debug!(
                    "Failed to parse JSON line in {}: {}",
                    file_path.display(),
                    e
                );
                skipped += 1;
                continue;
            }
        };

        records.push(ExportRecord::try_from(raw)?);
    }

    debug!(
        "File {}: {} records, {} skipped",
        file_path.display(),
        records.len(),
        skipped
    );
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn test_find_export_files_recursive_and_sorted() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "b.jsonl", &[]);
        write_file(tmp.path(), "nested/a.jsonl", &[]);
        write_file(tmp.path(), "notes.txt", &[]);

        let files = find_export_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.jsonl"));
        assert!(files[1].ends_with("nested/a.jsonl"));
    }

    #[test]
    fn test_find_export_files_missing_dir() {
        assert!(find_export_files(Path::new("/definitely/not/here"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_missing_dir_is_error() {
        let err = load_export_records(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, AuditError::DataPathNotFound(_)));
    }

    #[test]
    fn test_load_empty_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_export_records(tmp.path()).unwrap_err();
        assert!(matches!(err, AuditError::NoDataFiles(_)));
    }

    #[test]
    fn test_load_skips_blank_and_malformed_lines() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "rows.jsonl",
            &[
                r#"{"site":"sc-domain:a.com","date":"2024-01-01","query":"acme","page":"/","clicks":3,"impressions":40,"position":2.5}"#,
                "",
                "{broken",
                r#"{"date":"2024-01-02","device":"MOBILE","clicks":1,"impressions":10,"position":7.0}"#,
            ],
        );

        let records = load_export_records(tmp.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].site.as_deref(), Some("sc-domain:a.com"));
        assert_eq!(records[0].query.as_deref(), Some("acme"));
        assert_eq!(records[1].device.as_deref(), Some("MOBILE"));
        assert_eq!(
            records[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_load_malformed_date_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "rows.jsonl",
            &[r#"{"date":"01/02/2024","clicks":1,"impressions":10,"position":7.0}"#],
        );
        let err = load_export_records(tmp.path()).unwrap_err();
        assert!(matches!(err, AuditError::InvalidDateFormat(s) if s == "01/02/2024"));
    }

    #[test]
    fn test_record_dimension_and_site_matching() {
        let mut record = ExportRecord::new(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(), 1, 2, 3.0);
        assert_eq!(record.dimension(Dimension::Date).as_deref(), Some("2024-05-06"));
        assert_eq!(record.dimension(Dimension::Page), None);
        assert!(record.matches_site("anything"));

        record.site = Some("sc-domain:a.com".to_string());
        assert!(record.matches_site("sc-domain:a.com"));
        assert!(!record.matches_site("sc-domain:b.com"));
    }

    #[test]
    fn test_unopenable_export_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("vanished.jsonl");
        match read_export_file(&missing) {
            Err(AuditError::FileRead { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_export_is_file_read_error() {
        let tmp = TempDir::new().unwrap();
        // A directory opens on unix but fails on the first line read.
        let dir = tmp.path().join("b.jsonl");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            read_export_file(&dir),
            Err(AuditError::FileRead { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_export_symlink_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "a.jsonl",
            &[r#"{"date":"2024-01-01","clicks":1,"impressions":10,"position":2.0}"#],
        );
        let link = tmp.path().join("b.jsonl");
        std::os::unix::fs::symlink(tmp.path().join("gone.jsonl"), &link).unwrap();

        match load_export_records(tmp.path()) {
            Err(AuditError::FileRead { path, .. }) => assert_eq!(path, link),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }

    #[test]
    fn test_record_without_position_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "rows.jsonl",
            &[
                r#"{"date":"2024-01-01","query":"no position","clicks":1,"impressions":10}"#,
                r#"{"date":"2024-01-01","query":"ranked","clicks":1,"impressions":10,"position":1.0}"#,
            ],
        );
        let records = load_export_records(tmp.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query.as_deref(), Some("ranked"));
        assert!(records.iter().all(|r| r.position >= 1.0));
    }
}
