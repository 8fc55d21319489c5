//! Error taxonomy for everything that stands between an experiment and its analysis.

use thiserror::Error;

use splitlens_core::ExperimentError;

/// One failed completion call, classified.
///
/// The client never retries; whoever holds this decides what to do next.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("malformed credential: {0}")]
    MalformedCredential(String),

    #[error("completion provider timed out, please try again")]
    Timeout,

    #[error(
        "completion provider rejected the request: {}",
        .0.as_deref().unwrap_or("bad request (400)")
    )]
    BadRequest(Option<String>),

    #[error("completion provider credential is invalid or expired")]
    InvalidCredential,

    #[error("completion provider rate limit exceeded, try again in a moment")]
    RateLimited,

    #[error(
        "completion provider error (HTTP {status}){}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    ProviderError { status: u16, message: Option<String> },

    #[error("model returned invalid JSON: {0}")]
    MalformedResponse(String),

    #[error("unexpected completion response format")]
    UnexpectedResponseShape,

    #[error("could not reach completion provider: {0}")]
    Connection(String),

    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl CompletionError {
    /// Stable machine-readable tag, used in service error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::MalformedCredential(_) => "malformed_credential",
            CompletionError::Timeout => "timeout",
            CompletionError::BadRequest(_) => "bad_request",
            CompletionError::InvalidCredential => "invalid_credential",
            CompletionError::RateLimited => "rate_limited",
            CompletionError::ProviderError { .. } => "provider_error",
            CompletionError::MalformedResponse(_) => "malformed_response",
            CompletionError::UnexpectedResponseShape => "unexpected_response_shape",
            CompletionError::Connection(_) => "connection",
            CompletionError::Encode(_) => "encode",
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Connection(e.to_string())
        }
    }
}

/// Failure to obtain experiment data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("AMPLITUDE_API_KEY and AMPLITUDE_SECRET_KEY are required to fetch from Amplitude")]
    MissingCredentials,

    #[error("Amplitude request timed out")]
    Timeout,

    #[error("could not reach Amplitude: {0}")]
    Connection(String),

    #[error("invalid Amplitude API base: {0}")]
    InvalidUrl(String),

    #[error("Amplitude returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected Amplitude payload: {0}")]
    Decode(String),

    #[error(transparent)]
    Experiment(#[from] ExperimentError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Connection(e.to_string())
        }
    }
}

/// Anything that ends an analysis request without a result.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("no server credential configured")]
    NoCredentialConfigured,

    #[error("failed to load experiment data: {0}")]
    DataFetch(#[from] FetchError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl AnalyzeError {
    /// Whether the caller should be nudged to bring their own credential.
    pub fn suggests_user_credential(&self) -> bool {
        matches!(
            self,
            AnalyzeError::NoCredentialConfigured
                | AnalyzeError::Completion(CompletionError::InvalidCredential)
        )
    }
}
