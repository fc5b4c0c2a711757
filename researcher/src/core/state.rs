//! Mission-owned state and the stage updates allowed to change it.
//!
//! Fields of [`MissionState`] are private to this module. Each stage produces
//! its own update record and only the matching `apply_*` method writes the
//! corresponding field:
//!
//! | stage        | update            | writes                          |
//! |--------------|-------------------|---------------------------------|
//! | planning     | `PlanningUpdate`  | `plan` (resets cursor/findings) |
//! | executing    | `ExecutionUpdate` | appends to `findings`           |
//! | advancing    | `AdvanceUpdate`   | `cursor += 1`                   |
//! | synthesizing | `SynthesisUpdate` | `final_answer`                  |

use crate::core::plan_validator::{PlanSource, ValidatedPlan};
use crate::core::types::{Finding, MissionOutcome, MissionProgress};
use crate::plan::{Plan, PlanStep};

/// Output of the planning stage.
#[derive(Debug, Clone)]
pub struct PlanningUpdate {
    pub plan: Plan,
    pub source: PlanSource,
}

impl From<ValidatedPlan> for PlanningUpdate {
    fn from(validated: ValidatedPlan) -> Self {
        Self {
            plan: validated.plan,
            source: validated.source,
        }
    }
}

/// Output of the executing stage. Empty only when the cursor is past the plan.
#[derive(Debug, Clone, Default)]
pub struct ExecutionUpdate {
    finding: Option<Finding>,
}

impl ExecutionUpdate {
    pub fn finding(finding: Finding) -> Self {
        Self {
            finding: Some(finding),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_finding(&self) -> Option<&Finding> {
        self.finding.as_ref()
    }
}

/// Output of the advancing stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvanceUpdate;

/// Output of the synthesizing stage.
#[derive(Debug, Clone)]
pub struct SynthesisUpdate {
    pub final_answer: String,
}

/// State of a single mission. Never shared across missions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionState {
    user_query: String,
    plan: Option<Plan>,
    cursor: usize,
    findings: Vec<Finding>,
    final_answer: Option<String>,
}

impl MissionState {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            plan: None,
            cursor: 0,
            findings: Vec::new(),
            final_answer: None,
        }
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    /// Plan steps, empty until planning completes.
    pub fn plan_steps(&self) -> &[PlanStep] {
        self.plan.as_ref().map(Plan::steps).unwrap_or_default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.final_answer.as_deref()
    }

    /// Continuation predicate evaluated after each advance.
    pub fn should_continue(&self) -> bool {
        self.cursor < self.plan_steps().len()
    }

    pub fn remaining_steps(&self) -> usize {
        self.plan_steps().len().saturating_sub(self.cursor)
    }

    pub fn is_terminal(&self) -> bool {
        self.final_answer.is_some()
    }

    pub(crate) fn apply_planning(&mut self, update: PlanningUpdate) {
        self.plan = Some(update.plan);
        self.cursor = 0;
        self.findings.clear();
    }

    pub(crate) fn apply_execution(&mut self, update: ExecutionUpdate) {
        if let Some(finding) = update.finding {
            self.findings.push(finding);
        }
    }

    pub(crate) fn apply_advance(&mut self, _update: AdvanceUpdate) {
        self.cursor += 1;
    }

    pub(crate) fn apply_synthesis(&mut self, update: SynthesisUpdate) {
        self.final_answer = Some(update.final_answer);
    }

    pub fn progress(&self) -> MissionProgress {
        MissionProgress {
            user_query: self.user_query.clone(),
            plan: self.plan_steps().to_vec(),
            cursor: self.cursor,
            findings: self.findings.clone(),
        }
    }

    pub(crate) fn into_outcome(self, transitions: u32) -> MissionOutcome {
        MissionOutcome {
            user_query: self.user_query,
            final_answer: self.final_answer.unwrap_or_default(),
            plan: self.plan.map(Plan::into_steps).unwrap_or_default(),
            findings: self.findings,
            transitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{plan_of, step};

    fn planned(len: i64) -> MissionState {
        let mut state = MissionState::new("query");
        let steps = (1..=len).map(|id| step(id, "web_search")).collect();
        state.apply_planning(PlanningUpdate {
            plan: plan_of(steps),
            source: PlanSource::Oracle,
        });
        state
    }

    #[test]
    fn new_state_starts_empty() {
        let state = MissionState::new("q");
        assert_eq!(state.cursor(), 0);
        assert!(state.plan_steps().is_empty());
        assert!(state.findings().is_empty());
        assert!(!state.should_continue());
        assert!(!state.is_terminal());
    }

    #[test]
    fn findings_track_cursor_after_each_advance() {
        let mut state = planned(3);
        for n in 1..=3 {
            let step = state.plan_steps()[state.cursor()].clone();
            state.apply_execution(ExecutionUpdate::finding(Finding::new(&step, "out")));
            state.apply_advance(AdvanceUpdate);
            assert_eq!(state.cursor(), n);
            assert_eq!(state.findings().len(), n);
        }
        assert!(!state.should_continue());
        assert_eq!(state.remaining_steps(), 0);
    }

    #[test]
    fn planning_resets_cursor_and_findings() {
        let mut state = planned(2);
        let step = state.plan_steps()[0].clone();
        state.apply_execution(ExecutionUpdate::finding(Finding::new(&step, "out")));
        state.apply_advance(AdvanceUpdate);

        state.apply_planning(PlanningUpdate {
            plan: Plan::fallback("query"),
            source: PlanSource::Oracle,
        });
        assert_eq!(state.cursor(), 0);
        assert!(state.findings().is_empty());
        assert_eq!(state.plan_steps().len(), 1);
    }

    #[test]
    fn empty_execution_update_appends_nothing() {
        let mut state = planned(1);
        state.apply_execution(ExecutionUpdate::empty());
        assert!(state.findings().is_empty());
    }

    #[test]
    fn synthesis_makes_state_terminal() {
        let mut state = planned(1);
        state.apply_synthesis(SynthesisUpdate {
            final_answer: "report".to_string(),
        });
        assert!(state.is_terminal());
        let outcome = state.into_outcome(4);
        assert_eq!(outcome.final_answer, "report");
        assert_eq!(outcome.plan.len(), 1);
        assert_eq!(outcome.transitions, 4);
    }
}
