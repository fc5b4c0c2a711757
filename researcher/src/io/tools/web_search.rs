//! Networked web search backed by the Tavily search API.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Tool, format_sources};
use crate::io::config::WebSearchConfig;

pub const DESCRIPTION: &str =
    "For current events, news, competitors and market data (post-2023).";
pub const NO_RESULTS: &str = "No web results found.";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Clone)]
pub struct WebSearchTool {
    config: WebSearchConfig,
    api_key: Option<String>,
}

impl WebSearchTool {
    /// Read the API key from the environment variable named in `config`.
    pub fn from_env(config: WebSearchConfig) -> Self {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self { config, api_key }
    }

    pub fn with_api_key(config: WebSearchConfig, api_key: Option<String>) -> Self {
        Self { config, api_key }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Tool for WebSearchTool {
    #[instrument(skip_all, fields(max_results = self.config.max_results))]
    fn run(&self, query: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("web search is disabled (no API key)");
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .context("build http client")?;
        let response = client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&SearchRequest {
                query,
                search_depth: &self.config.search_depth,
                max_results: self.config.max_results,
            })
            .send()
            .context("send search request")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("search returned status {status}: {body}"));
        }
        let parsed: SearchResponse = response.json().context("decode search response")?;
        debug!(results = parsed.results.len(), "web search finished");
        Ok(render_results(parsed.results, self.config.max_results))
    }
}

fn render_results(results: Vec<SearchResult>, max_results: usize) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    format_sources(
        results
            .into_iter()
            .take(max_results)
            .map(|r| (r.url, r.content)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_api_key() {
        let tool = WebSearchTool::with_api_key(WebSearchConfig::default(), None);
        assert!(!tool.is_enabled());
        let err = tool.run("anything").expect_err("disabled");
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn renders_results_up_to_limit() {
        let body = r#"{"results":[
            {"url":"https://a","content":"alpha"},
            {"url":"https://b","content":"beta"},
            {"url":"https://c"}
        ]}"#;
        let parsed: SearchResponse = serde_json::from_str(body).expect("parse");
        let text = render_results(parsed.results, 2);
        assert_eq!(
            text,
            "Source: https://a\nContent: alpha\n\n---\nSource: https://b\nContent: beta\n"
        );
    }

    #[test]
    fn empty_results_have_a_marker() {
        let parsed: SearchResponse = serde_json::from_str("{}").expect("parse");
        assert_eq!(render_results(parsed.results, 3), NO_RESULTS);
    }
}
