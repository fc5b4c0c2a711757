//! Retrieval capabilities and the registry the executor dispatches through.

use std::sync::Arc;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::plan::ToolKind;

pub mod document_search;
pub mod web_search;

pub use document_search::DocumentSearchTool;
pub use web_search::WebSearchTool;

const SYNTHESIS_DESCRIPTION: &str = "The final step that combines all findings into an answer.";

/// A retrieval capability: query in, text context out.
///
/// Errors are reported to the executor, which turns them into findings.
pub trait Tool: Send + Sync {
    fn run(&self, query: &str) -> Result<String>;
}

impl<T: Tool + ?Sized> Tool for Arc<T> {
    fn run(&self, query: &str) -> Result<String> {
        (**self).run(query)
    }
}

/// Tool id and the description shown to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub description: String,
}

impl ToolDescriptor {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    tool: Arc<dyn Tool>,
}

/// Maps tool identifiers to capabilities, in registration order.
///
/// `synthesis` is reserved: the executor answers it without a capability.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool` under `id`, replacing any tool already using that id.
    pub fn register(
        &mut self,
        id: &str,
        description: &str,
        tool: impl Tool + 'static,
    ) -> Result<()> {
        let id = id.trim();
        if id.is_empty() {
            bail!("tool id must be non-empty");
        }
        if id == ToolKind::SYNTHESIS {
            bail!("tool id {id:?} is reserved");
        }
        let entry = RegisteredTool {
            descriptor: ToolDescriptor::new(id, description),
            tool: Arc::new(tool),
        };
        match self.entries.iter_mut().find(|e| e.descriptor.id == id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Tool> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| e.tool.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.descriptor.id.as_str())
    }

    /// Registered tools followed by the reserved `synthesis` step.
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .map(|e| e.descriptor.clone())
            .chain(std::iter::once(ToolDescriptor::new(
                ToolKind::SYNTHESIS,
                SYNTHESIS_DESCRIPTION,
            )))
            .collect()
    }
}

/// Format `(source, content)` pairs as `Source:/Content:` blocks separated
/// by `---` lines.
pub fn format_sources<S, C>(items: impl IntoIterator<Item = (S, C)>) -> String
where
    S: AsRef<str>,
    C: AsRef<str>,
{
    items
        .into_iter()
        .map(|(source, content)| {
            format!("Source: {}\nContent: {}\n", source.as_ref(), content.as_ref())
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
