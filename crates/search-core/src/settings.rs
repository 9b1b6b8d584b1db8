use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Name of the per-user state directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".search-audit";

/// `~/.search-audit`, or `./.search-audit` when no home directory exists.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Default location of exported Search Console rows.
pub fn default_data_path() -> PathBuf {
    app_dir().join("exports")
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Search Console audit data collector
#[derive(Parser, Debug, Clone)]
#[command(
    name = "search-audit",
    about = "Search Console audit data collector",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Directory containing exported Search Console rows (*.jsonl)
    #[arg(long, global = true)]
    pub data_path: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Collect audit data for a property and write it as JSON
    Collect(CollectArgs),
    /// List the properties present in the exports
    Discover,
    /// Keyword research document tools
    Keywords {
        #[command(subcommand)]
        action: KeywordsAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Property identifier (e.g. sc-domain:example.com)
    pub site_url: String,

    /// Output JSON file path
    pub output_file: PathBuf,

    /// Days of data to collect
    #[arg(long, default_value = "90", value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Comma-separated brand terms for the brand/non-brand split
    #[arg(long)]
    pub brand_terms: Option<String>,

    /// Last day to collect (YYYY-MM-DD); defaults to three days ago
    #[arg(long)]
    pub end_date: Option<String>,

    /// Window length for the period-over-period comparison
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..))]
    pub comparison_days: u32,

    /// Minimum impressions for a page to count towards cannibalization
    #[arg(long, default_value = "10")]
    pub min_impressions: u64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum KeywordsAction {
    /// Validate a keyword research JSON file
    Validate {
        /// Path to the keyword research JSON file
        path: PathBuf,
    },
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.search-audit/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    /// Brand terms remembered per property.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub brand_terms: BTreeMap<String, String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Record the values used by `settings` on top of the existing params.
    pub fn remember(&mut self, settings: &Settings) {
        if settings.data_path.is_some() {
            self.data_path = settings.data_path.clone();
        }
        if let Command::Collect(args) = &settings.command {
            self.days = Some(args.days);
            if let Some(terms) = &args.brand_terms {
                self.brand_terms
                    .insert(args.site_url.clone(), terms.clone());
            }
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let mut last = LastUsedParams::load_from(config_path);

        if settings.data_path.is_none() {
            settings.data_path = last.data_path.clone();
        }

        if let Command::Collect(args) = &mut settings.command {
            let explicit_days = matches
                .subcommand_matches("collect")
                .map(|sub| is_arg_explicitly_set(sub, "days"))
                .unwrap_or(false);
            if !explicit_days {
                if let Some(days) = last.days {
                    args.days = days;
                }
            }
            if args.brand_terms.is_none() {
                args.brand_terms = last.brand_terms.get(&args.site_url).cloned();
            }
        }

        settings = Self::apply_debug(settings);

        last.remember(&settings);
        if let Err(e) = last.save_to(config_path) {
            tracing::debug!("Could not persist last-used params: {}", e);
        }

        settings
    }

    /// The export directory to read from.
    pub fn resolved_data_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(default_data_path)
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
