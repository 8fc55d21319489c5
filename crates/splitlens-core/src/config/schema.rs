//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProviderSettings`, `AmplitudeSettings`,
//! `ServerSettings`, `ReportSettings`.
//!
//! JSON on disk uses **camelCase** keys; every section defaults field by field,
//! so a partial file is always valid.

use serde::{Deserialize, Serialize};

/// Root configuration: loaded from `~/.splitlens/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub provider: ProviderSettings,
    pub amplitude: AmplitudeSettings,
    pub server: ServerSettings,
    pub report: ReportSettings,
}

// ─────────────────────────────────────────────
// Completion provider
// ─────────────────────────────────────────────

/// The OpenAI-compatible completion endpoint that writes the analysis.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Human-readable name, used in logs and report tags.
    pub display_name: String,
    /// API base URL; `/chat/completions` is appended.
    pub api_base: String,
    pub model: String,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    pub max_tokens: u32,
    /// Per-request timeout for analysis calls.
    pub timeout_secs: u64,
    /// Expected credential prefix; empty disables the format check.
    pub key_prefix: String,
    /// Server credentials, in rotation order. Replaced by the environment
    /// when `GROQ_API_KEY` slots are set.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            display_name: "Groq".to_string(),
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.3,
            max_tokens: 4000,
            timeout_secs: 60,
            key_prefix: "gsk_".to_string(),
            api_keys: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Amplitude
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmplitudeSettings {
    pub api_base: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_key: String,
}

impl AmplitudeSettings {
    /// Both halves of the key pair are needed to fetch experiments.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl Default for AmplitudeSettings {
    fn default() -> Self {
        Self {
            api_base: "https://amplitude.com/api/2".to_string(),
            api_key: String::new(),
            secret_key: String::new(),
        }
    }
}

// ─────────────────────────────────────────────
// HTTP service
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

// ─────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    /// Default output path for `splitlens analyze`.
    pub output: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output: "experiment-analysis.json".to_string(),
        }
    }
}
