//! `pricewise run` / `pricewise validate`: config-driven listing comparison.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use pricewise_recon::ingest::load_csv_listings;
use pricewise_recon::{ComparisonConfig, ComparisonReport, PipelineInput};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_UNMATCHED};
use crate::CliError;

pub struct RunOptions {
    pub config_path: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub sequential: bool,
    pub allow_unmatched: bool,
}

#[derive(Serialize)]
struct RunMeta<'a> {
    config_name: &'a str,
    engine_version: &'static str,
    run_at: DateTime<Utc>,
}

/// JSON document written by `run`: run metadata plus the engine report.
#[derive(Serialize)]
struct ReportEnvelope<'a> {
    meta: RunMeta<'a>,
    #[serde(flatten)]
    report: &'a ComparisonReport,
}

fn read_config(config_path: &Path) -> Result<ComparisonConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(EXIT_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ComparisonConfig::from_toml(&config_str).map_err(|e| CliError::new(EXIT_INVALID_CONFIG, e.to_string()))
}

fn read_source(base_dir: &Path, file: &str) -> Result<String, CliError> {
    let csv_path = base_dir.join(file);
    std::fs::read_to_string(&csv_path)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot read {}: {e}", csv_path.display())))
}

/// Load every CSV the config names. Paths resolve against the config's directory.
fn load_input(
    config: &ComparisonConfig,
    base_dir: &Path,
    observed_at: DateTime<Utc>,
) -> Result<PipelineInput, CliError> {
    let runtime = |e: pricewise_recon::CompareError| CliError::new(EXIT_RUNTIME, e.to_string());

    let reference = load_csv_listings(
        config.reference_id(),
        &read_source(base_dir, &config.reference.file)?,
        &config.reference.columns,
        observed_at,
    )
    .map_err(runtime)?;

    let mut sources = BTreeMap::new();
    for (source_id, source) in &config.sources {
        let rows = load_csv_listings(
            source_id,
            &read_source(base_dir, &source.file)?,
            &source.columns,
            observed_at,
        )
        .map_err(runtime)?;
        sources.insert(source_id.clone(), rows);
    }

    Ok(PipelineInput { reference, sources })
}

pub fn cmd_run(opts: RunOptions) -> Result<(), CliError> {
    let mut config = read_config(&opts.config_path)?;
    if opts.sequential {
        config.matching.parallel = false;
    }

    let base_dir = opts
        .config_path
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let run_at = Utc::now();
    let input = load_input(&config, base_dir, run_at)?;

    let report = pricewise_recon::run(&config, &input)
        .map_err(|e| CliError::new(EXIT_RUNTIME, e.to_string()))?;

    let envelope = ReportEnvelope {
        meta: RunMeta {
            config_name: &config.name,
            engine_version: env!("CARGO_PKG_VERSION"),
            run_at,
        },
        report: &report,
    };
    let json_str = serde_json::to_string_pretty(&envelope)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = opts.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if opts.json {
        println!("{json_str}");
    }

    print_summary(&config, &report);

    let unmatched = report.summary.unmatched;
    if unmatched > 0 && !opts.allow_unmatched {
        return Err(CliError::new(
            EXIT_UNMATCHED,
            format!("{unmatched} reference listing(s) had no match"),
        )
        .with_hint("lower matching.threshold or pass --allow-unmatched"));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(config: &ComparisonConfig, report: &ComparisonReport) {
    let s = &report.summary;
    eprintln!(
        "'{}': {} reference listings vs {} candidates from {} source(s): {} matched, {} unmatched",
        config.name, s.reference_listings, s.candidate_listings, s.sources.len(), s.matched, s.unmatched,
    );

    let stats = &report.statistics;
    if stats.total_matches > 0 {
        eprintln!(
            "{} cheaper on {} of {} matches ({:.1}%), mean difference {:+.2}%, median {:+.2}%",
            config.reference_id(),
            stats.reference_cheaper_count,
            stats.total_matches,
            stats.reference_cheaper_percentage,
            stats.average_percentage_difference,
            stats.median_percentage_difference,
        );
    }
    if let Some(ref source) = report.analysis.most_competitive_source {
        eprintln!("most undercut source: {source}");
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' comparing reference '{}' against {} source(s) at threshold {}",
        config.name,
        config.reference_id(),
        config.sources.len(),
        config.matching.threshold,
    );
    log::debug!("sources: {:?}", config.sources.keys().collect::<Vec<_>>());
    Ok(())
}
