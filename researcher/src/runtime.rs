//! Long-lived bundle of mission collaborators built from config.
//!
//! A [`Researcher`] is shared (behind `Arc`) by the CLI and the server. Each
//! call to [`Researcher::run`] creates fresh mission state; only the brain,
//! the tool registry and the document store are shared between missions.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::agents::planner::PlannerAgent;
use crate::agents::synthesizer::SynthesizerAgent;
use crate::core::plan_validator::ValidatedPlan;
use crate::core::types::{MissionEvent, MissionOutcome};
use crate::io::brain::{Brain, brain_from_config};
use crate::io::config::ResearchConfig;
use crate::io::document_store::DocumentStore;
use crate::io::tools::{DocumentSearchTool, ToolRegistry, WebSearchTool, document_search, web_search};
use crate::mission::{MissionController, MissionError};
use crate::plan::ToolKind;

pub struct Researcher {
    brain: Arc<dyn Brain>,
    registry: ToolRegistry,
    store: Arc<DocumentStore>,
    planner: PlannerAgent,
    synthesizer: SynthesizerAgent,
}

/// Registry with `web_search` and `document_search` over `store`.
pub fn default_registry(config: &ResearchConfig, store: Arc<DocumentStore>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    let web = WebSearchTool::from_env(config.web_search.clone());
    if !web.is_enabled() {
        warn!(
            env = %config.web_search.api_key_env,
            "web search api key not set; web_search steps will report an error"
        );
    }
    registry.register(ToolKind::WEB_SEARCH, web_search::DESCRIPTION, web)?;
    registry.register(
        ToolKind::DOCUMENT_SEARCH,
        document_search::DESCRIPTION,
        DocumentSearchTool::new(store, config.documents.top_k),
    )?;
    Ok(registry)
}

impl Researcher {
    /// Build every collaborator from `config`, opening the document store.
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(
            DocumentStore::from_config(&config.documents).context("open document store")?,
        );
        let registry = default_registry(config, Arc::clone(&store))?;
        let brain = brain_from_config(&config.brain);
        info!(
            provider = ?config.brain.provider,
            model = %config.brain.model,
            documents = store.len(),
            "researcher ready"
        );
        Ok(Self::with_parts(config, brain, registry, store))
    }

    /// Assemble a researcher from explicit parts (used by tests and embedders).
    pub fn with_parts(
        config: &ResearchConfig,
        brain: Arc<dyn Brain>,
        registry: ToolRegistry,
        store: Arc<DocumentStore>,
    ) -> Self {
        Self {
            brain,
            registry,
            store,
            planner: PlannerAgent::new(config.planner.clone()),
            synthesizer: SynthesizerAgent::new(config.synthesis.clone()),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Run a full mission, reporting each transition to `on_event`.
    pub fn run<F: FnMut(&MissionEvent)>(
        &self,
        user_query: &str,
        on_event: F,
    ) -> Result<MissionOutcome, MissionError> {
        MissionController::new(
            self.brain.as_ref(),
            &self.planner,
            &self.registry,
            &self.synthesizer,
        )
        .run(user_query, on_event)
    }

    /// Planning stage only.
    pub fn plan(&self, user_query: &str) -> ValidatedPlan {
        self.planner
            .plan(self.brain.as_ref(), user_query, &self.registry.catalog())
    }

    /// Add `text` to the document store under `source`.
    pub fn ingest(&self, text: &str, source: &str) -> Result<usize> {
        self.store.ingest(text, source)
    }

    /// Run one registered tool directly.
    pub fn search(&self, tool_id: &str, query: &str) -> Result<String> {
        let tool = self.registry.get(tool_id).ok_or_else(|| {
            let known: Vec<&str> = self.registry.ids().collect();
            anyhow!("unknown tool {tool_id:?} (registered: {})", known.join(", "))
        })?;
        tool.run(query)
            .with_context(|| format!("run tool {tool_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedBrain, plan_json, step};

    fn offline_config() -> ResearchConfig {
        let mut config = ResearchConfig::default();
        config.documents.persist = false;
        config.web_search.api_key_env = "RESEARCHER_TEST_TAVILY_KEY_NEVER_SET".to_string();
        config
    }

    fn researcher(brain: ScriptedBrain) -> Researcher {
        let config = offline_config();
        let store = Arc::new(DocumentStore::new(config.documents.chunk_size));
        let registry = default_registry(&config, Arc::clone(&store)).expect("registry");
        Researcher::with_parts(&config, Arc::new(brain), registry, store)
    }

    #[test]
    fn default_registry_has_both_tools() {
        let researcher = researcher(ScriptedBrain::default());
        let ids: Vec<&str> = researcher.registry().ids().collect();
        assert_eq!(ids, vec!["web_search", "document_search"]);
    }

    #[test]
    fn document_search_sees_ingested_text() {
        let researcher = researcher(ScriptedBrain::default());
        let chunks = researcher
            .ingest("NVIDIA's 2024 strategy focuses on the Blackwell B200 GPU.", "memo")
            .expect("ingest");
        assert_eq!(chunks, 1);
        let text = researcher
            .search("document_search", "Blackwell")
            .expect("search");
        assert!(text.starts_with("Source: memo\n"));
    }

    #[test]
    fn search_rejects_unknown_tool() {
        let researcher = researcher(ScriptedBrain::default());
        let err = researcher.search("stock_ticker", "q").expect_err("unknown");
        assert!(err.to_string().contains("registered: web_search, document_search"));
    }

    #[test]
    fn web_search_without_key_is_recorded_as_finding() {
        let brain = ScriptedBrain::replying([plan_json(&[step(1, "web_search")]), "report".into()]);
        let researcher = researcher(brain);
        let outcome = researcher.run("q", |_| {}).expect("mission");
        assert!(
            outcome.findings[0]
                .content
                .starts_with("Error executing web_search: web search is disabled")
        );
        assert_eq!(outcome.final_answer, "report");
    }
}
