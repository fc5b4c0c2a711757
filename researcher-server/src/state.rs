//! Shared application state for the research server.

use std::sync::Arc;

use researcher::Researcher;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Brain, tools and document store shared by every mission.
    pub researcher: Arc<Researcher>,
}

impl AppState {
    pub fn new(researcher: Researcher) -> Self {
        Self {
            researcher: Arc::new(researcher),
        }
    }
}

/// State over a scripted brain, a `web_search` tool answering "web hit", and
/// an in-memory document store.
#[cfg(test)]
pub(crate) fn scripted_state(brain: researcher::test_support::ScriptedBrain) -> AppState {
    use researcher::io::config::ResearchConfig;
    use researcher::io::document_store::DocumentStore;
    use researcher::io::tools::ToolRegistry;
    use researcher::test_support::StaticTool;

    let mut config = ResearchConfig::default();
    config.documents.persist = false;
    let store = Arc::new(DocumentStore::new(config.documents.chunk_size));
    let mut registry = ToolRegistry::new();
    registry
        .register("web_search", "web", StaticTool::new("web hit"))
        .expect("register");
    AppState::new(Researcher::with_parts(&config, Arc::new(brain), registry, store))
}
