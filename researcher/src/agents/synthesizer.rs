//! Synthesizing stage: turn findings into the final report.

use thiserror::Error;
use tracing::{info, instrument};

use crate::core::types::Finding;
use crate::io::brain::{Brain, BrainError, ChatMessage, CompletionRequest};
use crate::io::config::SynthesisConfig;
use crate::io::prompt::{render_synthesis_input, synthesis_system};
use crate::plan::PlanStep;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("render synthesis prompt")]
    Prompt(#[from] minijinja::Error),
    #[error("synthesis call failed")]
    Brain(#[from] BrainError),
}

#[derive(Debug, Clone)]
pub struct SynthesizerAgent {
    config: SynthesisConfig,
}

impl SynthesizerAgent {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Write the report for `user_query`. No retries: a brain failure is
    /// returned to the caller as is.
    #[instrument(skip_all, fields(steps = plan.len(), findings = findings.len()))]
    pub fn synthesize<B: Brain + ?Sized>(
        &self,
        brain: &B,
        user_query: &str,
        plan: &[PlanStep],
        findings: &[Finding],
    ) -> Result<String, SynthesisError> {
        let input = render_synthesis_input(user_query, plan, findings)?;
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(synthesis_system()),
                ChatMessage::user(input),
            ],
            temperature: self.config.temperature,
            json_mode: false,
        };
        let report = brain.complete(&request)?;
        info!(bytes = report.len(), "report synthesized");
        Ok(report)
    }
}
