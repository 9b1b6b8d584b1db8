use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the search audit crates.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date string was not in `YYYY-MM-DD` form.
    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    /// The query service failed to answer a request.
    #[error("Search analytics query failed ({request}): {source}")]
    UpstreamFetch {
        request: String,
        #[source]
        source: Box<AuditError>,
    },

    /// The brand-term pattern could not be compiled.
    #[error("Invalid brand pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The expected export directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No JSONL export files were found under the given directory.
    #[error("No JSONL files found in {0}")]
    NoDataFiles(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the audit crates.
pub type Result<T> = std::result::Result<T, AuditError>;
