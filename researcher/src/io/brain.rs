//! Reasoning capability: text generation from an ordered message list.
//!
//! The mission only distinguishes success from failure. Provider details stay
//! inside the concrete implementations.

use std::env;
use std::fmt;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::io::config::{BrainConfig, BrainProvider};
use crate::io::process::{ChildExit, ProcessLimits, run_child};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the provider to return a single JSON object.
    pub json_mode: bool,
}

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("api key not set: environment variable {var} is empty or missing")]
    MissingApiKey { var: String },
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("command error: {0}")]
    Command(String),
}

/// Text generation capability shared by the planner and the synthesizer.
pub trait Brain: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BrainError>;
}

impl<T: Brain + ?Sized> Brain for Arc<T> {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BrainError> {
        (**self).complete(request)
    }
}

/// Build the configured reasoning capability.
pub fn brain_from_config(config: &BrainConfig) -> Arc<dyn Brain> {
    match config.provider {
        BrainProvider::Http => Arc::new(HttpBrain::new(config.clone())),
        BrainProvider::Command => Arc::new(CommandBrain::new(config.clone())),
    }
}

/// OpenAI-compatible `chat/completions` client.
pub struct HttpBrain {
    config: BrainConfig,
}

impl fmt::Debug for HttpBrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBrain")
            .field("model", &self.config.model)
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

impl HttpBrain {
    pub fn new(config: BrainConfig) -> Self {
        Self { config }
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

impl Brain for HttpBrain {
    #[instrument(skip_all, fields(model = %self.config.model, messages = request.messages.len()))]
    fn complete(&self, request: &CompletionRequest) -> Result<String, BrainError> {
        let api_key = read_api_key(&self.config.api_key_env)?;
        // Built per call: blocking clients must not be dropped inside an async runtime.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|err| BrainError::Http(err.to_string()))?;
        let response = client
            .post(self.url())
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .map_err(|err| BrainError::Http(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BrainError::Http(format!("status {status}: {body}")));
        }
        let payload: Value = response
            .json()
            .map_err(|err| BrainError::Response(err.to_string()))?;
        let text = extract_message_content(&payload)?;
        debug!(bytes = text.len(), "completion received");
        Ok(text)
    }
}

fn read_api_key(var: &str) -> Result<String, BrainError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(BrainError::MissingApiKey {
            var: var.to_string(),
        }),
    }
}

fn extract_message_content(payload: &Value) -> Result<String, BrainError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BrainError::Response("response has no choices[0].message.content".into()))
}

/// Runs a local command, writing the transcript to stdin and reading the
/// completion from stdout.
///
/// The command also receives `RESEARCHER_MODEL`, `RESEARCHER_TEMPERATURE` and
/// `RESEARCHER_JSON_MODE` in its environment.
#[derive(Debug)]
pub struct CommandBrain {
    config: BrainConfig,
}

impl CommandBrain {
    pub fn new(config: BrainConfig) -> Self {
        Self { config }
    }
}

impl Brain for CommandBrain {
    #[instrument(skip_all, fields(program = self.config.command.first().map(String::as_str).unwrap_or("")))]
    fn complete(&self, request: &CompletionRequest) -> Result<String, BrainError> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| BrainError::Command("brain.command is empty".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("RESEARCHER_MODEL", &self.config.model)
            .env("RESEARCHER_TEMPERATURE", request.temperature.to_string())
            .env("RESEARCHER_JSON_MODE", request.json_mode.to_string());

        let limits = ProcessLimits {
            timeout: Duration::from_secs(self.config.timeout_secs),
            output_limit_bytes: self.config.output_limit_bytes,
        };
        let output = run_child(cmd, &render_transcript(&request.messages), limits)
            .map_err(|err| BrainError::Command(format!("{err:#}")))?;

        match output.exit {
            ChildExit::TimedOut => {
                return Err(BrainError::Command(format!(
                    "timed out after {}s",
                    self.config.timeout_secs
                )));
            }
            ChildExit::Finished(status) if !status.success() => {
                return Err(BrainError::Command(format!(
                    "exited with {status}: {}",
                    output.stderr.trim()
                )));
            }
            ChildExit::Finished(_) => {}
        }
        let text = output.stdout.trim().to_string();
        if text.is_empty() {
            return Err(BrainError::Response("command produced no output".to_string()));
        }
        debug!(bytes = text.len(), "completion received");
        Ok(text)
    }
}

/// Plain-text transcript: one `### role` header per message.
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        out.push_str("### ");
        out.push_str(message.role.as_str());
        out.push('\n');
        out.push_str(message.content.trim_end());
        out.push_str("\n\n");
    }
    out
}
