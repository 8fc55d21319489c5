//! OpenAI-compatible completion client with failure classification.
//!
//! One call in, one typed outcome out: the parsed [`AnalysisResult`] or a
//! [`CompletionError`] saying exactly what went wrong. Retrying with another
//! credential is the caller's business.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, error, warn};

use splitlens_core::config::ProviderSettings;
use splitlens_core::types::{ChatCompletionRequest, ChatCompletionResponse, Message, ProviderErrorBody};
use splitlens_core::utils::truncate_string;
use splitlens_core::{AnalysisResult, ExperimentRecord};

use crate::error::CompletionError;
use crate::keys::Credential;
use crate::prompt::{build_analysis_prompt, strip_code_fences, PING_PROMPT};
use crate::traits::AnalysisProvider;

/// Timeout for the connectivity smoke test.
const PING_TIMEOUT: Duration = Duration::from_secs(10);
const PING_MAX_TOKENS: u32 = 10;

// ─────────────────────────────────────────────
// CompletionClient
// ─────────────────────────────────────────────

/// Talks to `{api_base}/chat/completions` with a caller-supplied bearer token.
pub struct CompletionClient {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    api_base: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    /// Expected credential prefix; empty disables the check.
    key_prefix: String,
    display_name: String,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("provider", &self.display_name)
            .finish()
    }
}

impl CompletionClient {
    /// Build a client from provider settings. The request timeout is applied client-wide.
    pub fn new(settings: &ProviderSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(CompletionClient {
            client,
            api_base: settings.api_base.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            key_prefix: settings.key_prefix.clone(),
            display_name: settings.display_name.clone(),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Fail fast on credentials that cannot possibly work.
    fn check_credential(&self, credential: &Credential) -> Result<(), CompletionError> {
        let value = credential.value();
        if value.is_empty() {
            return Err(CompletionError::MalformedCredential(
                "credential is empty".to_string(),
            ));
        }
        if !self.key_prefix.is_empty() && !value.starts_with(&self.key_prefix) {
            return Err(CompletionError::MalformedCredential(format!(
                "{} keys should start with '{}'",
                self.display_name, self.key_prefix
            )));
        }
        Ok(())
    }

    /// POST one request and classify the outcome.
    async fn send(
        &self,
        credential: &Credential,
        body: &ChatCompletionRequest,
        timeout: Option<Duration>,
    ) -> Result<ChatCompletionResponse, CompletionError> {
        self.check_credential(credential)?;

        debug!(
            provider = %self.display_name,
            model = %body.model,
            key_source = %credential.source(),
            "Calling completion provider"
        );

        let mut request = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential.value())
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = %self.display_name, error = %e, "HTTP request failed");
            CompletionError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(CompletionError::from)?;

        if !status.is_success() {
            error!(
                provider = %self.display_name,
                status = %status,
                body = %truncate_string(&text, 500),
                "API error"
            );
            return Err(classify_status(status, &text));
        }

        serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| {
            error!(
                provider = %self.display_name,
                error = %e,
                "Completion body is not a chat completion document"
            );
            CompletionError::UnexpectedResponseShape
        })
    }
}

/// Map a non-success status and its body onto the error taxonomy.
fn classify_status(status: StatusCode, body: &str) -> CompletionError {
    match status {
        StatusCode::BAD_REQUEST => {
            CompletionError::BadRequest(ProviderErrorBody::extract_message(body))
        }
        StatusCode::UNAUTHORIZED => CompletionError::InvalidCredential,
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited,
        other => CompletionError::ProviderError {
            status: other.as_u16(),
            message: ProviderErrorBody::extract_message(body),
        },
    }
}

/// Pull the analysis out of the first choice.
fn parse_analysis(response: &ChatCompletionResponse) -> Result<AnalysisResult, CompletionError> {
    let content = response
        .first_content()
        .ok_or(CompletionError::UnexpectedResponseShape)?;

    let cleaned = strip_code_fences(content);
    serde_json::from_str::<AnalysisResult>(cleaned).map_err(|e| {
        warn!(error = %e, content = %truncate_string(cleaned, 200), "Model output is not valid analysis JSON");
        CompletionError::MalformedResponse(e.to_string())
    })
}

#[async_trait]
impl AnalysisProvider for CompletionClient {
    async fn analyze(
        &self,
        experiment: &ExperimentRecord,
        credential: &Credential,
    ) -> Result<AnalysisResult, CompletionError> {
        let prompt = build_analysis_prompt(experiment)?;

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        };

        let response = self.send(credential, &body, None).await?;
        let analysis = parse_analysis(&response)?;

        debug!(
            provider = %self.display_name,
            experiment = %experiment.experiment_name,
            winner = %analysis.statistical_results.winner,
            "Analysis complete"
        );
        Ok(analysis)
    }

    async fn ping(&self, credential: &Credential) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(PING_PROMPT)],
            max_tokens: Some(PING_MAX_TOKENS),
            temperature: None,
        };

        let response = self.send(credential, &body, Some(PING_TIMEOUT)).await?;
        response
            .first_content()
            .map(|c| c.trim().to_string())
            .ok_or(CompletionError::UnexpectedResponseShape)
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use splitlens_core::VariantStats;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "gsk_test_key_123";

    fn settings(api_base: &str) -> ProviderSettings {
        ProviderSettings {
            api_base: api_base.to_string(),
            ..Default::default()
        }
    }

    fn client(api_base: &str) -> CompletionClient {
        CompletionClient::new(&settings(api_base)).unwrap()
    }

    fn experiment() -> ExperimentRecord {
        ExperimentRecord::new("Signup CTA")
            .with_variant("control", VariantStats::new("Control", 100, 10))
            .with_variant("variant_a", VariantStats::new("Variant A", 100, 15))
    }

    fn analysis_json() -> serde_json::Value {
        serde_json::json!({
            "executive_summary": "Variant A converts 50% better.",
            "statistical_results": {
                "primary_metric": "conversion_rate",
                "winner": "variant_a",
                "lift": "50%",
                "confidence_level": "below 90%",
                "is_significant": false,
                "sample_size_adequate": false
            },
            "key_insights": ["15 vs 10 conversions"],
            "secondary_metrics": [],
            "risks_and_caveats": ["Only 200 users"],
            "recommended_action": "iterate: collect more data",
            "next_experiments": ["Rerun with 10x traffic"],
            "report_narrative": "Narrative."
        })
    }

    fn completion_with(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "choices": [{
                "message": { "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })
    }

    async fn mount(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    // ── Unit tests ──

    #[test]
    fn test_completions_url_trailing_slash() {
        let provider = client("https://api.groq.com/openai/v1/");
        assert_eq!(
            provider.completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            CompletionError::InvalidCredential
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "{}"),
            CompletionError::RateLimited
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, r#"{"error": {"message": "bad model"}}"#),
            CompletionError::BadRequest(Some(ref m)) if m == "bad model"
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "<html>"),
            CompletionError::BadRequest(None)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            CompletionError::ProviderError { status: 502, message: None }
        ));
    }

    #[test]
    fn test_parse_analysis_strips_fences() {
        let fenced = format!("```json\n{}\n```", analysis_json());
        let response: ChatCompletionResponse =
            serde_json::from_value(completion_with(&fenced)).unwrap();
        let analysis = parse_analysis(&response).unwrap();
        assert_eq!(analysis.statistical_results.winner, "variant_a");
    }

    fn analysis_with_narrative(narrative: &str) -> String {
        let mut value = analysis_json();
        value["report_narrative"] = serde_json::Value::String(narrative.to_string());
        value.to_string()
    }

    #[test]
    fn test_parse_analysis_keeps_backticks_in_bare_json() {
        let content = analysis_with_narrative("Run ```sql\nSELECT 1\n``` nightly");
        let response: ChatCompletionResponse =
            serde_json::from_value(completion_with(&content)).unwrap();

        let analysis = parse_analysis(&response).unwrap();
        assert_eq!(analysis.report_narrative, "Run ```sql\nSELECT 1\n``` nightly");
    }

    #[test]
    fn test_parse_analysis_keeps_backticks_in_fenced_json() {
        let fenced = format!("```json\n{}\n```", analysis_with_narrative("Use ```x``` here"));
        let response: ChatCompletionResponse =
            serde_json::from_value(completion_with(&fenced)).unwrap();

        let analysis = parse_analysis(&response).unwrap();
        assert_eq!(analysis.report_narrative, "Use ```x``` here");
        assert_eq!(analysis.statistical_results.winner, "variant_a");
    }

    #[test]
    fn test_parse_analysis_empty_choices() {
        let response: ChatCompletionResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            parse_analysis(&response),
            Err(CompletionError::UnexpectedResponseShape)
        ));
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_analyze_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", format!("Bearer {KEY}").as_str()))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "temperature": 0.3,
                "max_tokens": 4000,
                "messages": [{"role": "user"}]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_with(&analysis_json().to_string())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = client(&server.uri());
        let analysis = provider
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap();

        assert_eq!(analysis.executive_summary, "Variant A converts 50% better.");
        assert_eq!(analysis.key_insights.len(), 1);
    }

    #[tokio::test]
    async fn test_analysis_survives_report_file_unchanged() {
        let server = MockServer::start().await;
        let mut provider_json = analysis_json();
        provider_json["report_narrative"] =
            serde_json::Value::String("## Result\n\nRun ```sql\nSELECT 1\n``` before shipping.".into());
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(completion_with(&provider_json.to_string())),
        )
        .await;

        let analysis = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.json");
        let report = splitlens_core::Report::new(experiment(), analysis.clone(), "Groq");
        splitlens_core::save_report(&report, &file).unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(on_disk["analysis"], provider_json);

        let loaded = splitlens_core::load_report(&file).unwrap();
        assert_eq!(
            serde_json::to_string(&loaded.analysis).unwrap(),
            serde_json::to_string(&analysis).unwrap()
        );
    }

    #[tokio::test]
    async fn test_analyze_fenced_response() {
        let server = MockServer::start().await;
        let fenced = format!("```json\n{:#}\n```", analysis_json());
        mount(&server, ResponseTemplate::new(200).set_body_json(completion_with(&fenced))).await;

        let analysis = client(&server.uri())
            .analyze(&experiment(), &Credential::user(KEY))
            .await
            .unwrap();
        assert_eq!(analysis.recommended_action, "iterate: collect more data");
    }

    #[tokio::test]
    async fn test_malformed_credential_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = client(&server.uri());
        let err = provider
            .analyze(&experiment(), &Credential::user("sk-wrong-provider"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::MalformedCredential(_)));

        let err = provider.ping(&Credential::user("")).await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedCredential(_)));
    }

    #[tokio::test]
    async fn test_empty_prefix_disables_format_check() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(200).set_body_json(completion_with("OK"))).await;

        let provider = CompletionClient::new(&ProviderSettings {
            api_base: server.uri(),
            key_prefix: String::new(),
            ..Default::default()
        })
        .unwrap();

        let reply = provider.ping(&Credential::user("sk-anything")).await.unwrap();
        assert_eq!(reply, "OK");
    }

    #[tokio::test]
    async fn test_unauthorized_is_invalid_credential() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
            })),
        )
        .await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_rate_limited_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::RateLimited));
        // `expect(1)` is verified when `server` drops.
    }

    #[tokio::test]
    async fn test_bad_request_carries_provider_message() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "The model `llama-3.1-70b-versatile` has been decommissioned"}
            })),
        )
        .await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        match err {
            CompletionError::BadRequest(Some(msg)) => assert!(msg.contains("decommissioned")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_request_with_unknown_body_is_generic() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(400).set_body_string("nope")).await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::BadRequest(None)));
    }

    #[tokio::test]
    async fn test_other_status_is_provider_error() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(503).set_body_string("down")).await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompletionError::ProviderError { status: 503, message: None }
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_is_unexpected_shape() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x", "choices": []})),
        )
        .await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::UnexpectedResponseShape));
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_unexpected_shape() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(200).set_body_string("<html>hi</html>")).await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::UnexpectedResponseShape));
    }

    #[tokio::test]
    async fn test_invalid_model_json_is_malformed_response() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(completion_with("Sure! The variant won. {not json")),
        )
        .await;

        let err = client(&server.uri())
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        match err {
            CompletionError::MalformedResponse(detail) => assert!(!detail.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(completion_with("{}"))
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let provider = CompletionClient::new(&ProviderSettings {
            api_base: server.uri(),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let err = provider
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Timeout));
    }

    #[tokio::test]
    async fn test_network_error_is_connection() {
        let provider = client("http://127.0.0.1:1");
        let err = provider
            .analyze(&experiment(), &Credential::server(KEY))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Connection(_)));
    }

    #[tokio::test]
    async fn test_ping_sends_small_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "max_tokens": 10,
                "messages": [{"role": "user", "content": "Say 'OK'"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_with(" OK ")))
            .mount(&server)
            .await;

        let reply = client(&server.uri())
            .ping(&Credential::server(KEY))
            .await
            .unwrap();
        assert_eq!(reply, "OK");
    }
}
