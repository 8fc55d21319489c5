//! Provider layer for Splitlens.
//!
//! # Architecture
//!
//! - [`keys::KeyPool`]: server credentials with round-robin and random selection
//! - [`keys::select_credential`]: user key first, pool second
//! - [`traits::AnalysisProvider`]: seam between request surfaces and the model
//! - [`http_provider::CompletionClient`]: OpenAI-compatible client with failure classification
//! - [`amplitude::AmplitudeClient`]: experiment fetcher + payload normalization
//! - [`error`]: the error taxonomy shared by all of the above

pub mod amplitude;
pub mod error;
pub mod http_provider;
pub mod keys;
pub mod prompt;
pub mod traits;

pub use amplitude::AmplitudeClient;
pub use error::{AnalyzeError, CompletionError, FetchError};
pub use http_provider::CompletionClient;
pub use keys::{select_credential, Credential, CredentialSource, KeyPool};
pub use traits::AnalysisProvider;
