//! The seam between request surfaces and the completion provider.

use async_trait::async_trait;

use splitlens_core::{AnalysisResult, ExperimentRecord};

use crate::error::CompletionError;
use crate::keys::Credential;

/// Something that can turn an experiment into an analysis.
///
/// The main implementation is [`crate::CompletionClient`], which talks to any
/// OpenAI-compatible API. Implementations make exactly one provider call per
/// method invocation and never retry.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Analyse one experiment with the given credential.
    async fn analyze(
        &self,
        experiment: &ExperimentRecord,
        credential: &Credential,
    ) -> Result<AnalysisResult, CompletionError>;

    /// Cheap round trip to check the credential and endpoint. Returns the model's reply.
    async fn ping(&self, credential: &Credential) -> Result<String, CompletionError>;

    /// Display name for logs and report tags.
    fn display_name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;
}
