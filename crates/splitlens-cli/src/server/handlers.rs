//! Route handlers for the analysis service.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use splitlens_core::utils::timestamp;
use splitlens_core::{AnalysisResult, ExperimentRecord};
use splitlens_providers::{select_credential, CredentialSource, FetchError};

use super::error::ApiError;
use super::state::AppState;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub experiment_data: Option<serde_json::Value>,
    /// Caller's own completion key; takes precedence over the server pool.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Successful analysis: the result's fields at the top level plus `_meta`.
#[derive(Debug, Serialize)]
pub struct AnalysisEnvelope {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    #[serde(rename = "_meta")]
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub key_source: CredentialSource,
    pub timestamp: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub server_key_available: bool,
    pub server_key_count: usize,
    pub hybrid_mode: bool,
    pub features: Features,
}

#[derive(Debug, Serialize)]
pub struct Features {
    pub use_server_key: bool,
    pub use_own_key: bool,
    pub key_rotation: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub server_keys_configured: usize,
    pub hybrid_mode: bool,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ProviderTestResponse {
    pub status: &'static str,
    pub message: String,
    pub keys_available: usize,
    pub reply: String,
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

/// `POST /api/analyze`
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisEnvelope>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(format!("No data provided: {e}")))?;

    let data = request
        .experiment_data
        .ok_or_else(|| ApiError::bad_request("No experiment data provided"))?;
    let experiment = ExperimentRecord::from_value(data).map_err(FetchError::from)?;

    let credential = select_credential(request.api_key.as_deref(), &state.pool)?;

    info!(
        experiment = %experiment.experiment_name,
        variants = ?experiment.variant_keys(),
        key_source = %credential.source(),
        "Analysis requested"
    );

    let analysis = state
        .analyst
        .analyze(&experiment, &credential)
        .await
        .map_err(|e| {
            warn!(kind = e.kind(), key_source = %credential.source(), "Analysis failed: {e}");
            e
        })?;

    Ok(Json(AnalysisEnvelope {
        analysis,
        meta: ResponseMeta {
            key_source: credential.source(),
            timestamp: timestamp(),
            provider: state.analyst.display_name().to_string(),
            model: state.analyst.model().to_string(),
        },
    }))
}

/// `GET /api/config`
pub async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let available = state.pool.available();
    Json(ConfigResponse {
        server_key_available: available,
        server_key_count: state.pool.size(),
        hybrid_mode: true,
        features: Features {
            use_server_key: available,
            use_own_key: true,
            key_rotation: state.pool.rotation_enabled(),
        },
    })
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        server_keys_configured: state.pool.size(),
        hybrid_mode: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: timestamp(),
    })
}

/// `GET /api/test-provider`: one cheap call with the next server credential.
pub async fn test_provider(
    State(state): State<AppState>,
) -> Result<Json<ProviderTestResponse>, ApiError> {
    let credential = state
        .pool
        .next()
        .ok_or_else(ApiError::no_server_keys)?;

    info!(provider = state.analyst.display_name(), "Testing provider connection");
    let reply = state.analyst.ping(credential).await?;

    Ok(Json(ProviderTestResponse {
        status: "success",
        message: format!(
            "{} is working! ({} keys configured)",
            state.analyst.display_name(),
            state.pool.size()
        ),
        keys_available: state.pool.size(),
        reply,
    }))
}
