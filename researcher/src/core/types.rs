//! Shared deterministic types for the mission loop.
//!
//! These types are the stable contract between the stages and any observer of
//! the mission (CLI progress output, the streaming server).

use std::fmt;

use serde::Serialize;

use crate::plan::{Plan, PlanStep};

/// Textual result of one executed plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub step_id: i64,
    pub title: String,
    pub content: String,
}

impl Finding {
    pub fn new(step: &PlanStep, content: impl Into<String>) -> Self {
        Self {
            step_id: step.id,
            title: step.title.clone(),
            content: content.into(),
        }
    }

    /// Stable text form consumed verbatim by the synthesis prompt.
    pub fn render(&self) -> String {
        format!("Step {} ({}):\n{}\n", self.step_id, self.title, self.content)
    }
}

/// Position of the mission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    Planning,
    Executing,
    Advancing,
    Synthesizing,
    Done,
}

impl MissionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionPhase::Planning => "planning",
            MissionPhase::Executing => "executing",
            MissionPhase::Advancing => "advancing",
            MissionPhase::Synthesizing => "synthesizing",
            MissionPhase::Done => "done",
        }
    }
}

/// One completed transition, emitted before the next stage starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum MissionEvent {
    Planned {
        plan: Plan,
        /// Set when the planner output was rejected and the fallback plan is used.
        fallback_reason: Option<String>,
    },
    Executed {
        cursor: usize,
        finding: Option<Finding>,
    },
    Advanced {
        cursor: usize,
        remaining: usize,
    },
    Synthesized {
        final_answer: String,
    },
}

impl MissionEvent {
    /// Stage that produced this event.
    pub fn phase(&self) -> MissionPhase {
        match self {
            MissionEvent::Planned { .. } => MissionPhase::Planning,
            MissionEvent::Executed { .. } => MissionPhase::Executing,
            MissionEvent::Advanced { .. } => MissionPhase::Advancing,
            MissionEvent::Synthesized { .. } => MissionPhase::Synthesizing,
        }
    }
}

impl fmt::Display for MissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.phase().as_str())?;
        match self {
            MissionEvent::Planned {
                plan,
                fallback_reason,
            } => {
                write!(f, "{} step(s)", plan.len())?;
                if fallback_reason.is_some() {
                    f.write_str(" (fallback plan)")?;
                }
                for step in plan.steps() {
                    write!(f, "\n  {}. {} [{}]", step.id, step.title, step.tool)?;
                }
                Ok(())
            }
            MissionEvent::Executed { cursor, finding } => match finding {
                Some(finding) => write!(
                    f,
                    "step {} ({}) -> {} bytes",
                    finding.step_id,
                    finding.title,
                    finding.content.len()
                ),
                None => write!(f, "nothing to execute at cursor {cursor}"),
            },
            MissionEvent::Advanced { cursor, remaining } => {
                write!(f, "cursor={cursor} remaining={remaining}")
            }
            MissionEvent::Synthesized { final_answer } => {
                write!(f, "report ready ({} bytes)", final_answer.len())
            }
        }
    }
}

/// Snapshot of mission progress, kept for diagnostics when a mission fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionProgress {
    pub user_query: String,
    pub plan: Vec<PlanStep>,
    pub cursor: usize,
    pub findings: Vec<Finding>,
}

/// Result of a completed mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionOutcome {
    pub user_query: String,
    pub final_answer: String,
    pub plan: Vec<PlanStep>,
    pub findings: Vec<Finding>,
    /// Number of stage transitions the mission went through.
    pub transitions: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;

    #[test]
    fn finding_render_is_stable() {
        let finding = Finding::new(&step(3, "web_search"), "Source: a\nContent: b\n");
        assert_eq!(
            finding.render(),
            "Step 3 (Step 3 title):\nSource: a\nContent: b\n\n"
        );
    }

    #[test]
    fn events_serialize_with_stage_tag() {
        let event = MissionEvent::Advanced {
            cursor: 2,
            remaining: 1,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["stage"], "advanced");
        assert_eq!(value["cursor"], 2);
        assert_eq!(event.phase(), MissionPhase::Advancing);
    }

    #[test]
    fn planned_event_display_lists_steps() {
        let plan = Plan::fallback("q");
        let event = MissionEvent::Planned {
            plan,
            fallback_reason: Some("bad json".to_string()),
        };
        let text = event.to_string();
        assert!(text.starts_with("[planning] 1 step(s) (fallback plan)"));
        assert!(text.contains("1. Fallback Search [web_search]"));
    }
}
