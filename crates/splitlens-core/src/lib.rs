//! Core types, configuration, and the persisted report for Splitlens.
//!
//! - [`experiment`]: canonical experiment record fed to the analyst
//! - [`analysis`]: the structured analysis returned by the model
//! - [`report`]: the JSON artifact bundling both
//! - [`types`]: OpenAI-compatible chat completion wire types
//! - [`config`]: `~/.splitlens/config.json` + environment overrides

pub mod analysis;
pub mod config;
pub mod experiment;
pub mod report;
pub mod types;
pub mod utils;

pub use analysis::{AnalysisResult, SecondaryMetric, StatisticalResults};
pub use experiment::{ExperimentError, ExperimentMetadata, ExperimentRecord, VariantStats};
pub use report::{load_report, save_report, Report};
