//! Amplitude experiment fetcher.
//!
//! Pulls one experiment from the Amplitude REST API and reshapes the variant
//! list into the keyed map of [`ExperimentRecord`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info};

use splitlens_core::config::AmplitudeSettings;
use splitlens_core::experiment::CONTROL_KEY;
use splitlens_core::utils::{opt_string_or_number, truncate_string};
use splitlens_core::{ExperimentMetadata, ExperimentRecord, VariantStats};

use crate::error::FetchError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ─────────────────────────────────────────────
// Provider-native payload
// ─────────────────────────────────────────────

/// Experiment as Amplitude returns it.
#[derive(Debug, Deserialize)]
pub struct AmplitudeExperiment {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub hypothesis: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub traffic_source: Option<String>,
    pub segment: Option<String>,
    pub platform: Option<String>,
    #[serde(default)]
    pub variants: Vec<AmplitudeVariant>,
}

#[derive(Debug, Deserialize)]
pub struct AmplitudeVariant {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub is_control: bool,
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub conversions: u64,
    #[serde(default)]
    pub conversion_rate: f64,
    pub avg_session_duration: Option<f64>,
    pub bounce_rate: Option<f64>,
    pub revenue_per_user: Option<f64>,
}

impl From<AmplitudeExperiment> for ExperimentRecord {
    fn from(exp: AmplitudeExperiment) -> Self {
        let mut variants = BTreeMap::new();

        for (index, variant) in exp.variants.into_iter().enumerate() {
            // The control flag decides the key, not the name. Only the first
            // flagged arm gets `control`.
            let mut key = if variant.is_control && !variants.contains_key(CONTROL_KEY) {
                CONTROL_KEY.to_string()
            } else {
                let id = variant.id.clone().unwrap_or_else(|| index.to_string());
                format!("variant_{id}")
            };
            if variants.contains_key(&key) {
                key = format!("{key}_{index}");
            }

            variants.insert(
                key,
                VariantStats {
                    name: variant.name.unwrap_or_else(|| "Unknown".to_string()),
                    users: variant.users,
                    conversions: variant.conversions,
                    conversion_rate: variant.conversion_rate,
                    avg_session_duration: variant.avg_session_duration,
                    bounce_rate: variant.bounce_rate,
                    revenue_per_user: variant.revenue_per_user,
                },
            );
        }

        let defaults = ExperimentMetadata::default();
        ExperimentRecord {
            experiment_name: exp.name.unwrap_or_else(|| "Unknown Experiment".to_string()),
            hypothesis: exp.hypothesis.unwrap_or_default(),
            start_date: exp.start_date.unwrap_or_default(),
            end_date: exp.end_date.unwrap_or_default(),
            variants,
            metadata: ExperimentMetadata {
                experiment_id: exp.id,
                traffic_source: exp.traffic_source.unwrap_or(defaults.traffic_source),
                segment: exp.segment.unwrap_or(defaults.segment),
                platform: exp.platform.unwrap_or(defaults.platform),
            },
        }
    }
}

// ─────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────

pub struct AmplitudeClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    secret_key: String,
}

impl std::fmt::Debug for AmplitudeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmplitudeClient")
            .field("api_base", &self.api_base)
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl AmplitudeClient {
    pub fn new(settings: &AmplitudeSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: settings.api_base.clone(),
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }

    /// The id is pushed as a single path segment, so `/`, `?` and `#` in it
    /// are percent-encoded instead of changing the request target.
    fn experiment_url(&self, experiment_id: &str) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .push("experiments")
            .push(experiment_id);
        Ok(url)
    }

    /// Fetch one experiment and normalize it.
    pub async fn fetch_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord, FetchError> {
        if !self.is_configured() {
            return Err(FetchError::MissingCredentials);
        }

        info!(experiment_id, "Fetching experiment from Amplitude");

        let response = self
            .client
            .get(self.experiment_url(experiment_id)?)
            .basic_auth(&self.api_key, Some(&self.secret_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(experiment_id, status = %status, "Amplitude request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_string(&body, 300),
            });
        }

        let payload: AmplitudeExperiment = response.json().await?;
        let record = ExperimentRecord::from(payload);
        record.validate()?;

        debug!(
            experiment_id,
            variants = record.variants.len(),
            "Fetched experiment"
        );
        Ok(record)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
