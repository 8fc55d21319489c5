//! JSON error responses for the analysis service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use splitlens_providers::{AnalyzeError, CompletionError, FetchError};

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiErrorBody {
    pub error: String,
    /// Machine-readable failure kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The caller may succeed with their own credential.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub suggest_user_key: bool,
    /// The caller must bring their own credential; the server has none.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub require_user_key: bool,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                error: message.into(),
                code: None,
                suggest_user_key: false,
                require_user_key: false,
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.body.code = Some(code.into());
        self
    }

    pub fn suggest_user_key(mut self) -> Self {
        self.body.suggest_user_key = true;
        self
    }

    pub fn require_user_key(mut self) -> Self {
        self.body.require_user_key = true;
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message).with_code("invalid_request")
    }

    /// No server credential and none supplied by the caller.
    pub fn no_server_key() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "No server API key configured. Please provide your own API key.",
        )
        .with_code("no_credential_configured")
        .require_user_key()
    }

    /// The server pool is empty. Unlike [`ApiError::no_server_key`], a caller
    /// key cannot help here: the endpoint only exercises server credentials.
    pub fn no_server_keys() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "No server API keys configured")
            .with_code("no_server_keys")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        let status = match &err {
            CompletionError::MalformedCredential(_) => StatusCode::BAD_REQUEST,
            CompletionError::InvalidCredential => StatusCode::UNAUTHORIZED,
            CompletionError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            CompletionError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CompletionError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CompletionError::BadRequest(_)
            | CompletionError::ProviderError { .. }
            | CompletionError::MalformedResponse(_)
            | CompletionError::UnexpectedResponseShape
            | CompletionError::Connection(_) => StatusCode::BAD_GATEWAY,
        };

        let api_err = Self::new(status, err.to_string()).with_code(err.kind());
        if matches!(err, CompletionError::InvalidCredential) {
            api_err.suggest_user_key()
        } else {
            api_err
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Experiment(e) => Self::bad_request(format!("Invalid experiment data: {e}")),
            missing @ FetchError::MissingCredentials => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, missing.to_string())
                    .with_code("data_source_unconfigured")
            }
            timeout @ FetchError::Timeout => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, timeout.to_string()).with_code("timeout")
            }
            other => Self::new(StatusCode::BAD_GATEWAY, other.to_string()).with_code("data_fetch"),
        }
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        match err {
            AnalyzeError::NoCredentialConfigured => Self::no_server_key(),
            AnalyzeError::DataFetch(e) => e.into(),
            AnalyzeError::Completion(e) => e.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.body.error)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use splitlens_core::ExperimentError;

    fn status_of(err: CompletionError) -> StatusCode {
        ApiError::from(err).status
    }

    #[test]
    fn test_completion_status_mapping() {
        assert_eq!(status_of(CompletionError::MalformedCredential("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CompletionError::InvalidCredential), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CompletionError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_of(CompletionError::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_of(CompletionError::BadRequest(None)), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(CompletionError::UnexpectedResponseShape), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(CompletionError::ProviderError { status: 500, message: None }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_only_invalid_credential_suggests_user_key() {
        assert!(ApiError::from(CompletionError::InvalidCredential).body.suggest_user_key);
        assert!(!ApiError::from(CompletionError::RateLimited).body.suggest_user_key);
    }

    #[test]
    fn test_no_credential_requires_user_key() {
        let err = ApiError::from(AnalyzeError::NoCredentialConfigured);
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.body.require_user_key);
        assert!(!err.body.suggest_user_key);
    }

    #[test]
    fn test_empty_pool_does_not_ask_for_user_key() {
        let json = serde_json::to_value(ApiError::no_server_keys().body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "No server API keys configured", "code": "no_server_keys"})
        );
    }

    #[test]
    fn test_invalid_experiment_is_bad_request() {
        let err = ApiError::from(AnalyzeError::from(FetchError::from(ExperimentError::NoVariants)));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.body.error.starts_with("Invalid experiment data"));
    }

    #[test]
    fn test_body_omits_unset_flags() {
        let json = serde_json::to_value(ApiError::bad_request("nope").body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "nope", "code": "invalid_request"})
        );
    }
}
