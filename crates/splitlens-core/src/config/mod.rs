//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use splitlens_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Model: {}", cfg.provider.model);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, get_config_path, load_config, process_env,
    scan_credential_slots, CREDENTIAL_ENV_VAR,
};
pub use schema::{AmplitudeSettings, Config, ProviderSettings, ReportSettings, ServerSettings};
