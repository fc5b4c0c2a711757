//! Prompt rendering for the planner and the synthesizer.

use std::sync::LazyLock;

use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::Finding;
use crate::io::tools::ToolDescriptor;
use crate::plan::PlanStep;

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const SYNTHESIS_SYSTEM: &str = include_str!("prompts/synthesis.md");
const SYNTHESIS_INPUT_TEMPLATE: &str = include_str!("prompts/synthesis_input.md");

static ENGINE: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

#[derive(Debug, Serialize)]
struct StepContext<'a> {
    id: i64,
    title: &'a str,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("synthesis_input", SYNTHESIS_INPUT_TEMPLATE)
            .expect("synthesis input template should be valid");
        Self { env }
    }
}

/// System prompt for plan generation, listing the tools the plan may use.
pub fn render_planner_system(
    tools: &[ToolDescriptor],
    max_steps: usize,
) -> Result<String, minijinja::Error> {
    let template = ENGINE.env.get_template("planner")?;
    template.render(context! {
        tools => tools,
        max_steps => max_steps,
    })
}

pub fn planner_user_message(user_query: &str) -> String {
    format!("User Query: {}", user_query.trim())
}

pub fn synthesis_system() -> &'static str {
    SYNTHESIS_SYSTEM.trim()
}

/// User message for the synthesizer: query, executed plan titles, and the
/// rendered findings in execution order.
pub fn render_synthesis_input(
    user_query: &str,
    plan: &[PlanStep],
    findings: &[Finding],
) -> Result<String, minijinja::Error> {
    let steps: Vec<StepContext<'_>> = plan
        .iter()
        .map(|step| StepContext {
            id: step.id,
            title: &step.title,
        })
        .collect();
    let rendered: Vec<String> = findings.iter().map(Finding::render).collect();
    let template = ENGINE.env.get_template("synthesis_input")?;
    template.render(context! {
        user_query => user_query.trim(),
        plan => steps,
        findings => rendered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;

    #[test]
    fn planner_prompt_lists_tools_and_budget() {
        let tools = vec![
            ToolDescriptor::new("web_search", "Current events and market data."),
            ToolDescriptor::new("synthesis", "Final step."),
        ];
        let prompt = render_planner_system(&tools, 4).expect("render");
        assert!(prompt.contains("- `web_search`: Current events and market data."));
        assert!(prompt.contains("- `synthesis`: Final step."));
        assert!(prompt.contains("at most 4 steps"));
        assert!(prompt.contains("\"steps\""));
    }

    #[test]
    fn synthesis_input_includes_titles_and_findings_in_order() {
        let plan = vec![step(1, "web_search"), step(2, "document_search")];
        let findings = vec![
            Finding::new(&plan[0], "first"),
            Finding::new(&plan[1], "second"),
        ];
        let text = render_synthesis_input("  what happened?  ", &plan, &findings).expect("render");
        assert!(text.starts_with("Original Query: what happened?\n"));
        assert!(text.contains("- Step 1 title\n- Step 2 title\n"));
        let first = text.find("Step 1 (Step 1 title):\nfirst").expect("first finding");
        let second = text.find("Step 2 (Step 2 title):\nsecond").expect("second finding");
        assert!(first < second);
    }

    #[test]
    fn synthesis_input_marks_missing_findings() {
        let text = render_synthesis_input("q", &[step(1, "web_search")], &[]).expect("render");
        assert!(text.contains("(no findings)"));
    }

    #[test]
    fn synthesis_system_names_report_sections() {
        let system = synthesis_system();
        for section in [
            "Executive Summary",
            "Key Findings",
            "Strategic Analysis",
            "Conclusion",
        ] {
            assert!(system.contains(section), "missing {section}");
        }
    }
}
