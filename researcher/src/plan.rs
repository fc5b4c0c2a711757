use std::fmt;

use serde::{Deserialize, Serialize};

pub const FALLBACK_TITLE: &str = "Fallback Search";
pub const FALLBACK_REASONING: &str = "Planner failed, defaulting to basic search.";

/// Tool identifier carried by a plan step.
///
/// Identifiers outside the known set are kept verbatim in [`ToolKind::Other`]
/// so the executor can report them instead of the validator rejecting the plan.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolKind {
    WebSearch,
    DocumentSearch,
    Synthesis,
    Other(String),
}

impl ToolKind {
    pub const WEB_SEARCH: &'static str = "web_search";
    pub const DOCUMENT_SEARCH: &'static str = "document_search";
    pub const SYNTHESIS: &'static str = "synthesis";

    pub fn as_str(&self) -> &str {
        match self {
            ToolKind::WebSearch => Self::WEB_SEARCH,
            ToolKind::DocumentSearch => Self::DOCUMENT_SEARCH,
            ToolKind::Synthesis => Self::SYNTHESIS,
            ToolKind::Other(id) => id,
        }
    }
}

impl From<&str> for ToolKind {
    fn from(value: &str) -> Self {
        match value {
            Self::WEB_SEARCH => ToolKind::WebSearch,
            Self::DOCUMENT_SEARCH => ToolKind::DocumentSearch,
            Self::SYNTHESIS => ToolKind::Synthesis,
            other => ToolKind::Other(other.to_string()),
        }
    }
}

impl From<String> for ToolKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            Self::WEB_SEARCH | Self::DOCUMENT_SEARCH | Self::SYNTHESIS => {
                ToolKind::from(value.as_str())
            }
            _ => ToolKind::Other(value),
        }
    }
}

impl From<ToolKind> for String {
    fn from(value: ToolKind) -> Self {
        match value {
            ToolKind::Other(id) => id,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanStep {
    pub id: i64,
    pub title: String,
    pub query: String,
    pub tool: ToolKind,
    pub reasoning: String,
}

/// Non-empty, ordered research plan.
///
/// Steps run in array order. `PlanStep::id` is descriptive only and is never
/// used for sequencing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PlanDocument", into = "PlanDocument")]
pub struct Plan {
    steps: Vec<PlanStep>,
}

/// Wire shape of a plan: `{"steps": [...]}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PlanDocument {
    steps: Vec<PlanStep>,
}

impl TryFrom<PlanDocument> for Plan {
    type Error = String;

    fn try_from(doc: PlanDocument) -> Result<Self, Self::Error> {
        Plan::new(doc.steps).ok_or_else(|| "plan must contain at least one step".to_string())
    }
}

impl From<Plan> for PlanDocument {
    fn from(plan: Plan) -> Self {
        PlanDocument { steps: plan.steps }
    }
}

impl Plan {
    /// Build a plan, returning `None` for an empty step list.
    pub fn new(steps: Vec<PlanStep>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self { steps })
    }

    /// Single web-search step over the original query.
    pub fn fallback(user_query: &str) -> Self {
        Self {
            steps: vec![PlanStep {
                id: 1,
                title: FALLBACK_TITLE.to_string(),
                query: user_query.to_string(),
                tool: ToolKind::WebSearch,
                reasoning: FALLBACK_REASONING.to_string(),
            }],
        }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<PlanStep> {
        self.steps
    }

    /// Step ids that appear more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<i64> {
        let mut seen = Vec::new();
        let mut duplicates = Vec::new();
        for step in &self.steps {
            if seen.contains(&step.id) {
                if !duplicates.contains(&step.id) {
                    duplicates.push(step.id);
                }
            } else {
                seen.push(step.id);
            }
        }
        duplicates
    }
}
