//! Executing stage: run the tool for the step at the cursor.
//!
//! Nothing here fails. Any problem with the step (unknown tool, tool error or
//! panic) becomes finding text and the mission keeps going.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, info, instrument, warn};

use crate::core::state::ExecutionUpdate;
use crate::core::types::Finding;
use crate::io::tools::ToolRegistry;
use crate::plan::{PlanStep, ToolKind};

pub const SYNTHESIS_PLACEHOLDER: &str = "Synthesis step reached. Proceeding to final answer.";

/// Execute `steps[cursor]` against `registry`.
///
/// Returns an empty update when `cursor` is past the end of the plan.
#[instrument(skip_all, fields(cursor = cursor))]
pub fn execute_step(steps: &[PlanStep], cursor: usize, registry: &ToolRegistry) -> ExecutionUpdate {
    let Some(step) = steps.get(cursor) else {
        warn!(plan_len = steps.len(), "cursor past end of plan; nothing to execute");
        return ExecutionUpdate::empty();
    };
    let content = run_tool(step, registry);
    debug!(step_id = step.id, bytes = content.len(), "step executed");
    ExecutionUpdate::finding(Finding::new(step, content))
}

fn run_tool(step: &PlanStep, registry: &ToolRegistry) -> String {
    let tool_id = step.tool.as_str();
    if step.tool == ToolKind::Synthesis {
        info!(step_id = step.id, "synthesis marker step");
        return SYNTHESIS_PLACEHOLDER.to_string();
    }
    let Some(tool) = registry.get(tool_id) else {
        warn!(step_id = step.id, tool = tool_id, "unknown tool");
        return format!("Unknown tool: {tool_id}");
    };

    info!(step_id = step.id, tool = tool_id, title = %step.title, "running tool");
    match catch_unwind(AssertUnwindSafe(|| tool.run(&step.query))) {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            let message = format!("{err:#}");
            warn!(step_id = step.id, tool = tool_id, error = %message, "tool failed");
            format!("Error executing {tool_id}: {message}")
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            warn!(step_id = step.id, tool = tool_id, %message, "tool panicked");
            format!("Error executing {tool_id}: tool panicked: {message}")
        }
    }
}
