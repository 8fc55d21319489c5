//! Utility helpers: paths, timestamps, lenient serde adapters.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

/// Get the Splitlens data directory (e.g. `~/.splitlens/`).
pub fn get_data_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".splitlens")
}

/// Current ISO 8601 timestamp in UTC.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Keep the first `max_len` characters, adding "..." if anything was cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => String::new(),
        }
    }
}

/// Deserialize a JSON string, number, bool, or `null` into a `String`.
///
/// Models and analytics APIs are loose about `"12%"` vs `12` and `"42"` vs `42`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

/// Like [`string_or_number`], but `null`/missing becomes `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}
