//! Shared state handed to every request handler.

use std::sync::Arc;

use splitlens_providers::{AnalysisProvider, KeyPool};

/// Read-only after startup; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<KeyPool>,
    pub analyst: Arc<dyn AnalysisProvider>,
}

impl AppState {
    pub fn new(pool: KeyPool, analyst: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            pool: Arc::new(pool),
            analyst,
        }
    }
}
