//! Planning stage: ask the brain for a plan and validate it.

use tracing::{info, instrument, warn};

use crate::core::plan_validator::{ValidatedPlan, validate_plan};
use crate::io::brain::{Brain, ChatMessage, CompletionRequest};
use crate::io::config::PlannerConfig;
use crate::io::prompt::{planner_user_message, render_planner_system};
use crate::io::tools::ToolDescriptor;

/// Planner agent wrapper that owns prompt settings.
#[derive(Debug, Clone)]
pub struct PlannerAgent {
    config: PlannerConfig,
}

impl PlannerAgent {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Produce a plan for `user_query` using only tools from `catalog`.
    ///
    /// Never fails: prompt or brain errors yield the fallback plan, as does
    /// output the validator rejects.
    #[instrument(skip_all, fields(tools = catalog.len()))]
    pub fn plan<B: Brain + ?Sized>(
        &self,
        brain: &B,
        user_query: &str,
        catalog: &[ToolDescriptor],
    ) -> ValidatedPlan {
        let system = match render_planner_system(catalog, self.config.max_steps) {
            Ok(system) => system,
            Err(err) => {
                warn!(error = %err, "planner prompt failed to render; using fallback plan");
                return ValidatedPlan::fallback(user_query, format!("planner prompt: {err}"));
            }
        };
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(system),
                ChatMessage::user(planner_user_message(user_query)),
            ],
            temperature: self.config.temperature,
            json_mode: self.config.json_mode,
        };

        let raw = match brain.complete(&request) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "planner call failed; using fallback plan");
                return ValidatedPlan::fallback(user_query, format!("planner call: {err}"));
            }
        };

        let validated = validate_plan(&raw, user_query);
        if validated.plan.len() > self.config.max_steps {
            warn!(
                steps = validated.plan.len(),
                max_steps = self.config.max_steps,
                "plan exceeds suggested step budget"
            );
        }
        info!(
            steps = validated.plan.len(),
            fallback = validated.fallback_reason().is_some(),
            "plan ready"
        );
        validated
    }
}
