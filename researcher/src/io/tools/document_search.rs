//! Similarity lookup over locally ingested documents.

use std::sync::Arc;

use anyhow::Result;
use tracing::instrument;

use super::{Tool, format_sources};
use crate::io::document_store::DocumentStore;

pub const DESCRIPTION: &str =
    "For looking up specific details in ingested files (e.g. 10-K filings, manuals).";
pub const NO_DOCUMENTS: &str = "No relevant documents found in the local database.";

pub struct DocumentSearchTool {
    store: Arc<DocumentStore>,
    top_k: usize,
}

impl DocumentSearchTool {
    pub fn new(store: Arc<DocumentStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }
}

impl Tool for DocumentSearchTool {
    #[instrument(skip_all, fields(top_k = self.top_k))]
    fn run(&self, query: &str) -> Result<String> {
        let hits = self.store.query(query, self.top_k)?;
        if hits.is_empty() {
            return Ok(NO_DOCUMENTS.to_string());
        }
        Ok(format_sources(
            hits.into_iter().map(|hit| (hit.chunk.source, hit.chunk.content)),
        ))
    }
}
