//! Server credential pool and the per-request selection policy.
//!
//! The credential list is fixed at construction. The only mutable state is the
//! rotation cursor, and the only way to move it is [`KeyPool::next`].

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use splitlens_core::config::ProviderSettings;

use crate::error::AnalyzeError;

// ─────────────────────────────────────────────
// Credential
// ─────────────────────────────────────────────

/// Where a credential came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Loaded from process configuration at startup.
    Server,
    /// Supplied by the caller for a single request.
    User,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Server => write!(f, "server"),
            CredentialSource::User => write!(f, "user"),
        }
    }
}

/// An opaque bearer token plus its origin.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    source: CredentialSource,
}

impl Credential {
    pub fn server(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: CredentialSource::Server,
        }
    }

    pub fn user(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source: CredentialSource::User,
        }
    }

    /// The raw token, for the `Authorization` header only.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// First few characters followed by an ellipsis, safe to log or print.
    pub fn redacted(&self) -> String {
        let head: String = self.value.chars().take(4).collect();
        format!("{head}…")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &self.redacted())
            .field("source", &self.source)
            .finish()
    }
}

// ─────────────────────────────────────────────
// KeyPool
// ─────────────────────────────────────────────

/// Ordered server credentials with a shared rotation cursor.
///
/// An empty pool is valid; callers check [`KeyPool::available`] first.
pub struct KeyPool {
    keys: Vec<Credential>,
    /// Always `< keys.len()` when `keys` is non-empty.
    cursor: AtomicUsize,
}

impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPool")
            .field("size", &self.keys.len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl KeyPool {
    /// Build a pool from raw token strings, keeping their order. Empty strings are skipped.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<Credential> = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.is_empty())
            .map(Credential::server)
            .collect();

        debug!(size = keys.len(), "Credential pool initialized");

        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Pool holding no credentials.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    /// Build the pool from the loaded provider settings.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(settings.api_keys.iter().cloned())
    }

    /// Round-robin: the credential at the cursor, then advance the cursor.
    ///
    /// Every credential is handed out once before any repeats, also under
    /// concurrent callers, since the advance is one atomic read-modify-write.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Option<&Credential> {
        let len = self.keys.len();
        if len == 0 {
            return None;
        }

        // The list is immutable, so only the atomicity of the update matters.
        let index = match self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % len))
        {
            Ok(previous) | Err(previous) => previous,
        };

        self.keys.get(index)
    }

    /// Uniform random pick. No ordering guarantee; does not touch the cursor.
    pub fn any(&self) -> Option<&Credential> {
        self.keys.choose(&mut rand::thread_rng())
    }

    pub fn available(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Rotation only means something with two or more credentials.
    pub fn rotation_enabled(&self) -> bool {
        self.keys.len() > 1
    }
}

// ─────────────────────────────────────────────
// Selection policy
// ─────────────────────────────────────────────

/// Pick the credential for one analysis request.
///
/// A non-empty caller-supplied key always wins and the pool is not consulted.
/// Otherwise the pool's next key is used, or
/// [`AnalyzeError::NoCredentialConfigured`] when the pool is empty.
pub fn select_credential(
    user_supplied: Option<&str>,
    pool: &KeyPool,
) -> Result<Credential, AnalyzeError> {
    if let Some(key) = user_supplied.map(str::trim).filter(|k| !k.is_empty()) {
        info!(key_source = %CredentialSource::User, "Using caller-supplied credential");
        return Ok(Credential::user(key));
    }

    if !pool.available() {
        return Err(AnalyzeError::NoCredentialConfigured);
    }

    let credential = pool
        .next()
        .cloned()
        .ok_or(AnalyzeError::NoCredentialConfigured)?;

    info!(
        key_source = %CredentialSource::Server,
        pool_size = pool.size(),
        "Using server credential"
    );
    Ok(credential)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
