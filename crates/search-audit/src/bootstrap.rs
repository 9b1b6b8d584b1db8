use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use search_core::settings::app_dir;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the standard `~/.search-audit/` directory hierarchy exists.
///
/// Creates `~/.search-audit/`, `~/.search-audit/logs/` and
/// `~/.search-audit/exports/` if absent.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = app_dir();
    std::fs::create_dir_all(&dir)?;
    std::fs::create_dir_all(dir.join("logs"))?;
    std::fs::create_dir_all(dir.join("exports"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map the CLI's level names onto `tracing` filter directives.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialise the global `tracing` subscriber.
///
/// Output always goes to stderr. When `log_file` is set the same events are
/// appended to that file without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");

        let dir = tmp.path().join(".search-audit");
        assert!(dir.is_dir(), ".search-audit dir must exist");
        assert!(dir.join("logs").is_dir(), "logs subdir must exist");
        assert!(dir.join("exports").is_dir(), "exports subdir must exist");
    }

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("Trace"), "trace");
    }

    #[test]
    fn test_open_log_file_creates_parents_and_appends() {
        use std::io::Write;

        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("logs").join("nested").join("audit.log");

        open_log_file(&path)
            .and_then(|mut f| Ok(writeln!(f, "first")?))
            .expect("first write");
        open_log_file(&path)
            .and_then(|mut f| Ok(writeln!(f, "second")?))
            .expect("second write");

        let content = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(content, "first\nsecond\n");
    }
}
