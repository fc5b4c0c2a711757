//! Mission state machine.
//!
//! ```text
//! PLANNING -> EXECUTING <-> ADVANCING -> SYNTHESIZING -> DONE
//! ```
//!
//! Every stage runs on the caller's thread, strictly in sequence. Each
//! completed stage emits exactly one [`MissionEvent`] before the next stage
//! starts, so synchronous and streaming callers share this loop.

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::agents::executor::execute_step;
use crate::agents::planner::PlannerAgent;
use crate::agents::synthesizer::{SynthesisError, SynthesizerAgent};
use crate::core::state::{AdvanceUpdate, MissionState, SynthesisUpdate};
use crate::core::types::{MissionEvent, MissionOutcome, MissionPhase, MissionProgress};
use crate::io::brain::Brain;
use crate::io::tools::ToolRegistry;

/// The only fatal mission failure.
#[derive(Debug, Error)]
pub enum MissionError {
    #[error("mission failed during synthesis")]
    SynthesisFailed {
        /// Plan and findings gathered before the failure.
        progress: Box<MissionProgress>,
        source: SynthesisError,
    },
}

impl MissionError {
    pub fn progress(&self) -> &MissionProgress {
        match self {
            MissionError::SynthesisFailed { progress, .. } => progress,
        }
    }
}

/// Drives one mission at a time over shared, read-only collaborators.
pub struct MissionController<'a, B: Brain + ?Sized> {
    brain: &'a B,
    planner: &'a PlannerAgent,
    registry: &'a ToolRegistry,
    synthesizer: &'a SynthesizerAgent,
}

impl<'a, B: Brain + ?Sized> MissionController<'a, B> {
    pub fn new(
        brain: &'a B,
        planner: &'a PlannerAgent,
        registry: &'a ToolRegistry,
        synthesizer: &'a SynthesizerAgent,
    ) -> Self {
        Self {
            brain,
            planner,
            registry,
            synthesizer,
        }
    }

    /// Run a mission for `user_query`, calling `on_event` once per completed
    /// transition.
    ///
    /// Terminates after `2 * plan.len() + 2` transitions. Only a synthesis
    /// failure is returned as an error.
    #[instrument(skip_all)]
    pub fn run<F: FnMut(&MissionEvent)>(
        &self,
        user_query: &str,
        mut on_event: F,
    ) -> Result<MissionOutcome, MissionError> {
        let mut state = MissionState::new(user_query);
        let mut phase = MissionPhase::Planning;
        let mut transitions = 0u32;

        loop {
            phase = match phase {
                MissionPhase::Planning => {
                    let validated =
                        self.planner
                            .plan(self.brain, user_query, &self.registry.catalog());
                    let event = MissionEvent::Planned {
                        plan: validated.plan.clone(),
                        fallback_reason: validated.fallback_reason().map(str::to_string),
                    };
                    state.apply_planning(validated.into());
                    info!(steps = state.plan_steps().len(), "planning complete");
                    transitions += 1;
                    on_event(&event);
                    MissionPhase::Executing
                }
                MissionPhase::Executing => {
                    let update = execute_step(state.plan_steps(), state.cursor(), self.registry);
                    let event = MissionEvent::Executed {
                        cursor: state.cursor(),
                        finding: update.as_finding().cloned(),
                    };
                    state.apply_execution(update);
                    transitions += 1;
                    on_event(&event);
                    MissionPhase::Advancing
                }
                MissionPhase::Advancing => {
                    state.apply_advance(AdvanceUpdate);
                    debug_assert_eq!(state.findings().len(), state.cursor());
                    debug!(
                        cursor = state.cursor(),
                        remaining = state.remaining_steps(),
                        "advanced"
                    );
                    transitions += 1;
                    on_event(&MissionEvent::Advanced {
                        cursor: state.cursor(),
                        remaining: state.remaining_steps(),
                    });
                    if state.should_continue() {
                        MissionPhase::Executing
                    } else {
                        MissionPhase::Synthesizing
                    }
                }
                MissionPhase::Synthesizing => {
                    let report = self
                        .synthesizer
                        .synthesize(
                            self.brain,
                            state.user_query(),
                            state.plan_steps(),
                            state.findings(),
                        )
                        .map_err(|source| MissionError::SynthesisFailed {
                            progress: Box::new(state.progress()),
                            source,
                        })?;
                    state.apply_synthesis(SynthesisUpdate {
                        final_answer: report.clone(),
                    });
                    transitions += 1;
                    on_event(&MissionEvent::Synthesized {
                        final_answer: report,
                    });
                    MissionPhase::Done
                }
                MissionPhase::Done => break,
            };
        }

        info!(transitions, findings = state.findings().len(), "mission complete");
        Ok(state.into_outcome(transitions))
    }
}

/// Run one mission without keeping a controller around.
pub fn run_mission<B, F>(
    user_query: &str,
    brain: &B,
    planner: &PlannerAgent,
    registry: &ToolRegistry,
    synthesizer: &SynthesizerAgent,
    on_event: F,
) -> Result<MissionOutcome, MissionError>
where
    B: Brain + ?Sized,
    F: FnMut(&MissionEvent),
{
    MissionController::new(brain, planner, registry, synthesizer).run(user_query, on_event)
}

/// `err` followed by each source, joined with `: `.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
