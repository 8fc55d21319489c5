//! Config loader: reads `~/.splitlens/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.splitlens/config.json`
//! 3. Plain environment variables (`GROQ_API_KEY[_n]`, `AMPLITUDE_*`, `PORT`)
//! 4. `SPLITLENS_<SECTION>__<FIELD>` overrides
//!
//! Every env read goes through a lookup function so tests can feed a map
//! instead of touching the process environment.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Primary credential slot; additional slots are `GROQ_API_KEY_2`, `_3`, ...
pub const CREDENTIAL_ENV_VAR: &str = "GROQ_API_KEY";

/// Upper bound on numbered credential slots scanned at startup.
pub const MAX_CREDENTIAL_SLOTS: usize = 64;

pub const AMPLITUDE_API_KEY_VAR: &str = "AMPLITUDE_API_KEY";
pub const AMPLITUDE_SECRET_KEY_VAR: &str = "AMPLITUDE_SECRET_KEY";
pub const PORT_VAR: &str = "PORT";

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Read a variable from the process environment, treating empty as unset.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Load configuration from the default path + process environment.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path), &process_env)
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Collect `BASE`, `BASE_2`, `BASE_3`, ... in order.
///
/// The primary slot is optional; numbered slots stop at the first gap or at
/// [`MAX_CREDENTIAL_SLOTS`].
pub fn scan_credential_slots<F>(base: &str, lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys = Vec::new();
    if let Some(primary) = lookup(base).filter(|v| !v.is_empty()) {
        keys.push(primary);
    }

    for index in 2..=MAX_CREDENTIAL_SLOTS {
        match lookup(&format!("{base}_{index}")).filter(|v| !v.is_empty()) {
            Some(key) => keys.push(key),
            None => break,
        }
    }

    keys
}

/// Apply environment overrides on top of a loaded config.
///
/// Supported variables:
/// - `GROQ_API_KEY`, `GROQ_API_KEY_2`, ... → `provider.api_keys` (replaces file keys)
/// - `AMPLITUDE_API_KEY`, `AMPLITUDE_SECRET_KEY` → `amplitude.*`
/// - `PORT` → `server.port`
/// - `SPLITLENS_PROVIDER__{MODEL,API_BASE,DISPLAY_NAME,KEY_PREFIX}`
/// - `SPLITLENS_PROVIDER__{TEMPERATURE,MAX_TOKENS,TIMEOUT_SECS}`
/// - `SPLITLENS_AMPLITUDE__API_BASE`
/// - `SPLITLENS_SERVER__{HOST,PORT}`
/// - `SPLITLENS_REPORT__OUTPUT`
pub fn apply_env_overrides<F>(mut config: Config, lookup: &F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let keys = scan_credential_slots(CREDENTIAL_ENV_VAR, lookup);
    if !keys.is_empty() {
        debug!(count = keys.len(), "Loaded provider credentials from environment");
        config.provider.api_keys = keys;
    }

    if let Some(val) = lookup(AMPLITUDE_API_KEY_VAR) {
        config.amplitude.api_key = val;
    }
    if let Some(val) = lookup(AMPLITUDE_SECRET_KEY_VAR) {
        config.amplitude.secret_key = val;
    }
    if let Some(val) = lookup(PORT_VAR) {
        match val.parse::<u16>() {
            Ok(p) => config.server.port = p,
            Err(_) => warn!("Ignoring invalid PORT value: {}", val),
        }
    }

    // Provider
    if let Some(val) = lookup("SPLITLENS_PROVIDER__MODEL") {
        config.provider.model = val;
    }
    if let Some(val) = lookup("SPLITLENS_PROVIDER__API_BASE") {
        config.provider.api_base = val;
    }
    if let Some(val) = lookup("SPLITLENS_PROVIDER__DISPLAY_NAME") {
        config.provider.display_name = val;
    }
    if let Some(val) = lookup("SPLITLENS_PROVIDER__KEY_PREFIX") {
        config.provider.key_prefix = val;
    }
    if let Some(val) = lookup("SPLITLENS_PROVIDER__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.provider.temperature = t;
        }
    }
    if let Some(val) = lookup("SPLITLENS_PROVIDER__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.provider.max_tokens = n;
        }
    }
    if let Some(val) = lookup("SPLITLENS_PROVIDER__TIMEOUT_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.provider.timeout_secs = n;
        }
    }

    // Amplitude
    if let Some(val) = lookup("SPLITLENS_AMPLITUDE__API_BASE") {
        config.amplitude.api_base = val;
    }

    // Server
    if let Some(val) = lookup("SPLITLENS_SERVER__HOST") {
        config.server.host = val;
    }
    if let Some(val) = lookup("SPLITLENS_SERVER__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.server.port = p;
        }
    }

    // Report
    if let Some(val) = lookup("SPLITLENS_REPORT__OUTPUT") {
        config.report.output = val;
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
