//! Researcher configuration stored under `.researcher/config.toml`.
//!
//! Secrets never live in this file. Each capability names the environment
//! variable holding its key; `.env` files are loaded by the binaries.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Researcher configuration (TOML).
///
/// Missing sections and fields fall back to the defaults below, so an empty
/// file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResearchConfig {
    pub brain: BrainConfig,
    pub planner: PlannerConfig,
    pub synthesis: SynthesisConfig,
    pub web_search: WebSearchConfig,
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrainProvider {
    /// OpenAI-compatible `chat/completions` endpoint.
    #[default]
    Http,
    /// Local command reading the transcript on stdin.
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrainConfig {
    pub provider: BrainProvider,
    pub model: String,
    /// Base URL; `/chat/completions` is appended.
    pub endpoint: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Used when `provider = "command"`, e.g. `["llm", "-m", "gemini-2.5-pro"]`.
    pub command: Vec<String>,
    /// Truncate command stdout beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            provider: BrainProvider::Http,
            model: "gemini-2.5-pro".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
            command: Vec::new(),
            output_limit_bytes: 200_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub temperature: f32,
    /// Step budget suggested to the model. Longer plans are logged, not cut.
    pub max_steps: usize,
    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_steps: 5,
            json_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub temperature: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self { temperature: 0.7 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WebSearchConfig {
    pub endpoint: String,
    pub api_key_env: String,
    pub max_results: usize,
    /// `basic` or `advanced`.
    pub search_depth: String,
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 3,
            search_depth: "advanced".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Persist ingested chunks to `store_path`. When false the store is in-memory only.
    pub persist: bool,
    /// JSON file backing the document store, relative to the working directory.
    pub store_path: PathBuf,
    /// Chunk size in characters.
    pub chunk_size: usize,
    pub top_k: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            persist: true,
            store_path: PathBuf::from(".researcher/documents.json"),
            chunk_size: 1000,
            top_k: 3,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.brain.model.trim().is_empty() {
            return Err(anyhow!("brain.model must be non-empty"));
        }
        if self.brain.timeout_secs == 0 {
            return Err(anyhow!("brain.timeout_secs must be > 0"));
        }
        match self.brain.provider {
            BrainProvider::Http => {
                if self.brain.endpoint.trim().is_empty() {
                    return Err(anyhow!("brain.endpoint must be non-empty"));
                }
            }
            BrainProvider::Command => {
                if self.brain.command.is_empty() || self.brain.command[0].trim().is_empty() {
                    return Err(anyhow!("brain.command must be a non-empty array"));
                }
                if self.brain.output_limit_bytes == 0 {
                    return Err(anyhow!("brain.output_limit_bytes must be > 0"));
                }
            }
        }
        validate_temperature("planner.temperature", self.planner.temperature)?;
        validate_temperature("synthesis.temperature", self.synthesis.temperature)?;
        if self.planner.max_steps == 0 {
            return Err(anyhow!("planner.max_steps must be > 0"));
        }
        if self.web_search.max_results == 0 {
            return Err(anyhow!("web_search.max_results must be > 0"));
        }
        if !matches!(self.web_search.search_depth.as_str(), "basic" | "advanced") {
            return Err(anyhow!(
                "web_search.search_depth must be \"basic\" or \"advanced\""
            ));
        }
        if self.web_search.timeout_secs == 0 {
            return Err(anyhow!("web_search.timeout_secs must be > 0"));
        }
        if self.documents.chunk_size == 0 {
            return Err(anyhow!("documents.chunk_size must be > 0"));
        }
        if self.documents.top_k == 0 {
            return Err(anyhow!("documents.top_k must be > 0"));
        }
        Ok(())
    }
}

fn validate_temperature(field: &str, value: f32) -> Result<()> {
    if !(0.0..=2.0).contains(&value) {
        return Err(anyhow!("{field} must be within 0.0..=2.0"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ResearchConfig::default()`.
pub fn load_config(path: &Path) -> Result<ResearchConfig> {
    if !path.exists() {
        let cfg = ResearchConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ResearchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ResearchConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes())
}

/// Write `contents` next to `path` and rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
