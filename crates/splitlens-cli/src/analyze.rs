//! `splitlens analyze`: one experiment in, one report out.
//!
//! Sequence:
//! 1. Resolve the experiment (local file or Amplitude)
//! 2. Pick a credential (caller key first, then the server pool)
//! 3. Run the analysis through the completion provider
//! 4. Save the report and print the summary
//!
//! A failure at any step leaves no report behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use splitlens_core::config::Config;
use splitlens_core::{save_report, ExperimentRecord, Report};
use splitlens_providers::{
    select_credential, AmplitudeClient, AnalysisProvider, AnalyzeError, CompletionClient,
    CompletionError, FetchError, KeyPool,
};

use crate::helpers;

/// Where the experiment data comes from.
#[derive(Debug, Clone)]
pub enum ExperimentSource {
    Amplitude(String),
    File(PathBuf),
}

/// Load the experiment from its source. Both paths validate the variant map.
pub async fn load_experiment(
    config: &Config,
    source: &ExperimentSource,
) -> Result<ExperimentRecord, AnalyzeError> {
    match source {
        ExperimentSource::File(path) => {
            info!(path = %path.display(), "Loading experiment from file");
            let record = ExperimentRecord::from_file(path).map_err(FetchError::from)?;
            Ok(record)
        }
        ExperimentSource::Amplitude(id) => {
            let client = AmplitudeClient::new(&config.amplitude).map_err(FetchError::from)?;
            Ok(client.fetch_experiment(id).await?)
        }
    }
}

/// Resolve, select, analyse. Returns the report without touching the disk.
pub async fn execute(
    config: &Config,
    source: &ExperimentSource,
    api_key: Option<&str>,
) -> Result<Report, AnalyzeError> {
    let experiment = load_experiment(config, source).await?;

    let pool = KeyPool::from_settings(&config.provider);
    let credential = select_credential(api_key, &pool)?;

    let client = CompletionClient::new(&config.provider)
        .map_err(|e| CompletionError::Connection(e.to_string()))?;

    info!(
        experiment = %experiment.experiment_name,
        provider = client.display_name(),
        model = client.model(),
        "Analysing experiment"
    );
    let analysis = client.analyze(&experiment, &credential).await?;

    Ok(Report::new(
        experiment,
        analysis,
        format!("{} ({})", client.display_name(), client.model()),
    ))
}

/// Run the analysis and persist the report only when it succeeded.
pub async fn execute_and_save(
    config: &Config,
    source: &ExperimentSource,
    api_key: Option<&str>,
    output: &Path,
) -> Result<Report> {
    let report = execute(config, source, api_key).await?;
    save_report(&report, output)
        .with_context(|| format!("failed to write report: {}", output.display()))?;
    Ok(report)
}

/// CLI entry for the analyze command.
pub async fn run(
    config: &Config,
    source: ExperimentSource,
    api_key: Option<String>,
    output: &Path,
) -> Result<()> {
    match execute_and_save(config, &source, api_key.as_deref(), output).await {
        Ok(report) => {
            helpers::print_summary(&report.analysis);
            println!("\n✅ Report saved to {}\n", output.display());
            Ok(())
        }
        Err(err) => match report_failure(err) {
            Some(err) => Err(err),
            None => std::process::exit(1),
        },
    }
}

/// Print an analysis failure once, with its hint. Returns the error back only
/// when it is not an analysis failure and still needs reporting by the caller.
fn report_failure(err: anyhow::Error) -> Option<anyhow::Error> {
    match err.downcast_ref::<AnalyzeError>() {
        Some(analyze_err) => {
            helpers::print_analyze_error(analyze_err);
            None
        }
        None => Some(err),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
