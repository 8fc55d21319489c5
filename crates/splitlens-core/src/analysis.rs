//! Structured analysis returned by the completion provider.
//!
//! The field names are the JSON schema the prompt asks the model to follow,
//! so they double as the wire format of the persisted report.

use serde::{Deserialize, Serialize};

use crate::utils::string_or_number;

/// The model's verdict on one experiment. Never mutated after parsing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub executive_summary: String,
    pub statistical_results: StatisticalResults,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub secondary_metrics: Vec<SecondaryMetric>,
    #[serde(default)]
    pub risks_and_caveats: Vec<String>,
    pub recommended_action: String,
    #[serde(default)]
    pub next_experiments: Vec<String>,
    #[serde(default)]
    pub report_narrative: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatisticalResults {
    #[serde(default = "default_primary_metric")]
    pub primary_metric: String,
    /// `control`, a variant key, or `inconclusive`.
    pub winner: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub lift: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub confidence_level: String,
    #[serde(default)]
    pub is_significant: bool,
    #[serde(default)]
    pub sample_size_adequate: bool,
}

fn default_primary_metric() -> String {
    "conversion_rate".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SecondaryMetric {
    pub metric: String,
    /// `positive`, `negative` or `neutral`.
    #[serde(default)]
    pub impact: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub change: String,
    #[serde(default)]
    pub note: String,
}

impl AnalysisResult {
    /// Whether the model declared a winner at all.
    pub fn is_conclusive(&self) -> bool {
        !self
            .statistical_results
            .winner
            .eq_ignore_ascii_case("inconclusive")
    }
}
