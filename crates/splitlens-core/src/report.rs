//! Persisted report artifact: experiment + analysis + generation tags.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::experiment::ExperimentRecord;

/// Version tag written into every report.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The single output artifact of an analysis run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub experiment: ExperimentRecord,
    pub analysis: AnalysisResult,
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub ai_provider: String,
}

impl Report {
    /// Bundle an experiment with its analysis, stamped with the current time.
    pub fn new(
        experiment: ExperimentRecord,
        analysis: AnalysisResult,
        ai_provider: impl Into<String>,
    ) -> Self {
        Self {
            experiment,
            analysis,
            generated_at: Utc::now(),
            tool_version: TOOL_VERSION.to_string(),
            ai_provider: ai_provider.into(),
        }
    }
}

/// Write a report as pretty-printed JSON, creating parent directories.
pub fn save_report(report: &Report, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    std::fs::write(path, json)?;
    debug!("Report saved to {}", path.display());
    Ok(())
}

/// Read a report back from disk.
pub fn load_report(path: &Path) -> std::io::Result<Report> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
