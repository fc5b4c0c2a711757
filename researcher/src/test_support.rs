//! Test-only helpers: plan builders and scripted capabilities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use crate::io::brain::{Brain, BrainError, CompletionRequest};
use crate::io::tools::Tool;
use crate::plan::{Plan, PlanStep};

/// Create a deterministic plan step using `tool`.
pub fn step(id: i64, tool: &str) -> PlanStep {
    PlanStep {
        id,
        title: format!("Step {id} title"),
        query: format!("query {id}"),
        tool: tool.into(),
        reasoning: format!("reason {id}"),
    }
}

/// Build a plan from non-empty `steps`.
pub fn plan_of(steps: Vec<PlanStep>) -> Plan {
    Plan::new(steps).expect("test plan must be non-empty")
}

/// Planner output for `steps` in the `{"steps": [...]}` shape.
pub fn plan_json(steps: &[PlanStep]) -> String {
    serde_json::json!({ "steps": steps }).to_string()
}

/// Brain that replays scripted replies in order and records every request.
///
/// Once the script is exhausted every call fails.
#[derive(Clone, Default)]
pub struct ScriptedBrain {
    replies: Arc<Mutex<VecDeque<Result<String, BrainError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedBrain {
    pub fn new(replies: impl IntoIterator<Item = Result<String, BrainError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    /// Brain answering each call with the next string.
    pub fn replying<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|reply| Ok(reply.into())))
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Brain for ScriptedBrain {
    fn complete(&self, request: &CompletionRequest) -> Result<String, BrainError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(BrainError::Response("scripted brain exhausted".to_string())))
    }
}

/// Tool returning a fixed response and recording the queries it saw.
#[derive(Clone)]
pub struct StaticTool {
    response: String,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StaticTool {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            queries: Arc::default(),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }
}

impl Tool for StaticTool {
    fn run(&self, query: &str) -> Result<String> {
        self.queries
            .lock()
            .expect("queries lock")
            .push(query.to_string());
        Ok(self.response.clone())
    }
}

/// Tool that always fails with `message`.
pub struct FailingTool {
    message: String,
}

impl FailingTool {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Tool for FailingTool {
    fn run(&self, _query: &str) -> Result<String> {
        Err(anyhow!("{}", self.message))
    }
}

/// Tool that panics, for checking the executor keeps the mission alive.
pub struct PanickingTool;

impl Tool for PanickingTool {
    fn run(&self, _query: &str) -> Result<String> {
        panic!("tool panicked");
    }
}
