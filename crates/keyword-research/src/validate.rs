//! Structural validation of keyword research JSON files.

use std::fmt;
use std::path::Path;

use search_core::error::{AuditError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::output::{Difficulty, ResearchMode, SearchIntent, VolumeBucket};

const REQUIRED_KEYS: [&str; 5] = [
    "meta",
    "keywords",
    "questions",
    "content_opportunities",
    "competitive_insights",
];

/// Outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub keywords: usize,
    pub questions: usize,
    pub content_opportunities: usize,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(
                f,
                "Valid: {} keywords, {} questions, {} content opportunities",
                self.keywords, self.questions, self.content_opportunities
            )
        } else {
            writeln!(f, "Validation errors:")?;
            for err in &self.errors {
                writeln!(f, "  - {err}")?;
            }
            Ok(())
        }
    }
}

fn parses_as<T: DeserializeOwned>(value: Option<&Value>) -> bool {
    value.is_some_and(|v| serde_json::from_value::<T>(v.clone()).is_ok())
}

fn array_len(doc: &Map<String, Value>, key: &str) -> usize {
    doc.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value.and_then(Value::as_str).is_some_and(|s| !s.is_empty())
}

fn validate_keyword(index: usize, kw: &Value, errors: &mut Vec<String>) {
    let prefix = format!("keywords[{index}]");
    if !non_empty_str(kw.get("keyword")) {
        errors.push(format!("{prefix}: missing keyword"));
    }
    if !parses_as::<SearchIntent>(kw.get("search_intent")) {
        errors.push(format!(
            "{prefix}: invalid search_intent {}",
            kw.get("search_intent").unwrap_or(&Value::Null)
        ));
    }
    if !parses_as::<VolumeBucket>(kw.get("volume_bucket")) {
        errors.push(format!(
            "{prefix}: invalid volume_bucket {}",
            kw.get("volume_bucket").unwrap_or(&Value::Null)
        ));
    }
    if !parses_as::<Difficulty>(kw.get("difficulty")) {
        errors.push(format!(
            "{prefix}: invalid difficulty {}",
            kw.get("difficulty").unwrap_or(&Value::Null)
        ));
    }
}

/// Check an already-parsed document. Every problem found is reported.
pub fn validate_value(data: &Value) -> ValidationReport {
    let empty = Map::new();
    let doc = data.as_object().unwrap_or(&empty);
    let mut errors = Vec::new();

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !doc.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        errors.push(format!("Missing top-level keys: {}", missing.join(", ")));
    }

    let meta = doc.get("meta");
    if !non_empty_str(meta.and_then(|m| m.get("seed_keyword"))) {
        errors.push("meta.seed_keyword is required".to_string());
    }

    let mode = meta.and_then(|m| m.get("mode"));
    match mode.and_then(|m| serde_json::from_value::<ResearchMode>(m.clone()).ok()) {
        Some(ResearchMode::TopicalAuthority) if !doc.contains_key("topical_authority") => {
            errors.push("topical-authority mode requires 'topical_authority' section".to_string());
        }
        Some(_) => {}
        None => errors.push(format!(
            "meta.mode must be 'standard' or 'topical-authority', got {}",
            mode.unwrap_or(&Value::Null)
        )),
    }

    if let Some(keywords) = doc.get("keywords").and_then(Value::as_array) {
        for (index, kw) in keywords.iter().enumerate() {
            validate_keyword(index, kw, &mut errors);
        }
    }

    ValidationReport {
        errors,
        keywords: array_len(doc, "keywords"),
        questions: array_len(doc, "questions"),
        content_opportunities: array_len(doc, "content_opportunities"),
    }
}

/// Read and validate a JSON file.
///
/// An unreadable file or invalid JSON is an error; structural problems land
/// in the returned report.
pub fn validate_file(path: &Path) -> Result<ValidationReport> {
    let content = std::fs::read_to_string(path).map_err(|source| AuditError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value = serde_json::from_str(&content)?;
    Ok(validate_value(&data))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
