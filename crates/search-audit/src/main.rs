mod bootstrap;

use anyhow::Result;
use search_core::formatting::{format_count, format_percent};
use search_core::settings::{CollectArgs, Command, KeywordsAction, Settings};
use search_core::time_utils::parse_date;
use search_data::analysis::{collect_audit, AuditConfig, AuditReport};
use search_data::source::ExportSource;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Search Audit v{} starting", env!("CARGO_PKG_VERSION"));

    match &settings.command {
        Command::Collect(args) => run_collect(&settings, args),
        Command::Discover => run_discover(&settings),
        Command::Keywords {
            action: KeywordsAction::Validate { path },
        } => {
            let report = keyword_research::validate_file(path)?;
            println!("{report}");
            if !report.is_valid() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn run_collect(settings: &Settings, args: &CollectArgs) -> Result<()> {
    let source = ExportSource::open(&settings.resolved_data_path())?;
    if source.is_empty() {
        tracing::warn!(
            "No export records in {}; the report will be empty",
            source.data_path().display()
        );
    } else {
        tracing::info!(
            "Loaded {} export records from {}",
            source.len(),
            source.data_path().display()
        );
    }

    let today = chrono::Local::now().date_naive();
    let mut config = AuditConfig::new(args.site_url.clone(), today, args.days)?
        .with_brand_terms(args.brand_terms.clone())
        .with_comparison_days(args.comparison_days)
        .with_min_impressions(args.min_impressions);
    if let Some(end) = &args.end_date {
        config = config.ending_on(parse_date(end)?)?;
    }

    let report = collect_audit(&source, &config)?;
    report.save_to(&args.output_file)?;

    println!("Data saved to {}", args.output_file.display());
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &AuditReport) {
    let s = &report.summary;
    println!();
    println!("Summary for {} ({})", report.site_url, report.date_range.label());
    println!("  Queries:          {}", format_count(s.total_queries as u64));
    println!("  Clicks:           {}", format_count(s.total_clicks));
    println!("  Impressions:      {}", format_count(s.total_impressions));
    println!("  Avg CTR:          {}", format_percent(s.average_ctr));
    println!("  Avg position:     {:.1}", s.average_position);
    println!("  Cannibalization:  {} queries", report.cannibalization.len());
}

fn run_discover(settings: &Settings) -> Result<()> {
    let source = ExportSource::open(&settings.resolved_data_path())?;
    let sites = source.sites();
    if sites.is_empty() {
        println!("No properties found in {}", source.data_path().display());
        return Ok(());
    }
    println!("Properties in {}:", source.data_path().display());
    for site in sites {
        println!("  {site}");
    }
    Ok(())
}
