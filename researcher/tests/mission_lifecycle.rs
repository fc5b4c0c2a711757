//! End-to-end mission scenarios driven through the public API.
//!
//! Each test scripts the brain (planner reply, then report) and registers
//! recording tools, then checks the executed step sequence, the findings, and
//! the number of transitions.

use std::sync::Arc;

use researcher::agents::executor::SYNTHESIS_PLACEHOLDER;
use researcher::agents::planner::PlannerAgent;
use researcher::agents::synthesizer::{SynthesisError, SynthesizerAgent};
use researcher::io::brain::BrainError;
use researcher::io::config::{PlannerConfig, ResearchConfig, SynthesisConfig};
use researcher::io::document_store::DocumentStore;
use researcher::io::tools::ToolRegistry;
use researcher::plan::FALLBACK_TITLE;
use researcher::test_support::{
    FailingTool, ScriptedBrain, StaticTool, plan_json, step,
};
use researcher::{
    MissionError, MissionEvent, MissionOutcome, MissionPhase, Researcher, ToolKind, run_mission,
};

struct Harness {
    brain: ScriptedBrain,
    planner: PlannerAgent,
    synthesizer: SynthesizerAgent,
    registry: ToolRegistry,
    web: StaticTool,
    docs: StaticTool,
}

impl Harness {
    fn new(replies: Vec<Result<String, BrainError>>) -> Self {
        let web = StaticTool::new("Source: https://web\nContent: web result\n");
        let docs = StaticTool::new("Source: memo.txt\nContent: doc result\n");
        let mut registry = ToolRegistry::new();
        registry
            .register("web_search", "web", web.clone())
            .expect("register web");
        registry
            .register("document_search", "docs", docs.clone())
            .expect("register docs");
        Self {
            brain: ScriptedBrain::new(replies),
            planner: PlannerAgent::new(PlannerConfig::default()),
            synthesizer: SynthesizerAgent::new(SynthesisConfig::default()),
            registry,
            web,
            docs,
        }
    }

    fn with_plan(plan: &str) -> Self {
        Self::new(vec![Ok(plan.to_string()), Ok("final report".to_string())])
    }

    fn run(&self, query: &str) -> (Result<MissionOutcome, MissionError>, Vec<MissionEvent>) {
        let mut events = Vec::new();
        let result = run_mission(
            query,
            &self.brain,
            &self.planner,
            &self.registry,
            &self.synthesizer,
            |event| events.push(event.clone()),
        );
        (result, events)
    }
}

/// One well-formed step: executed once, then the report is produced.
#[test]
fn single_step_plan_runs_once_then_synthesizes() {
    let harness = Harness::with_plan(
        r#"{"steps":[{"id":1,"title":"X","query":"q1","tool":"web_search","reasoning":"r"}]}"#,
    );
    let (result, events) = harness.run("user question");
    let outcome = result.expect("mission");

    assert_eq!(outcome.plan.len(), 1);
    assert_eq!(harness.web.queries(), vec!["q1".to_string()]);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].title, "X");
    assert_eq!(outcome.final_answer, "final report");
    assert_eq!(outcome.transitions, 4);
    assert_eq!(events.len(), 4);
    assert!(matches!(
        events.last(),
        Some(MissionEvent::Synthesized { final_answer }) if final_answer == "final report"
    ));
}

/// Invalid planner output falls back to a web search on the original query.
#[test]
fn invalid_planner_output_uses_fallback_plan() {
    let harness = Harness::with_plan("not valid json{");
    let (result, events) = harness.run("nvidia vs amd");
    let outcome = result.expect("mission");

    assert_eq!(outcome.plan.len(), 1);
    assert_eq!(outcome.plan[0].title, FALLBACK_TITLE);
    assert_eq!(outcome.plan[0].tool, ToolKind::WebSearch);
    assert_eq!(harness.web.queries(), vec!["nvidia vs amd".to_string()]);
    assert_eq!(outcome.transitions, 4);
    assert!(matches!(
        &events[0],
        MissionEvent::Planned { fallback_reason: Some(_), .. }
    ));
}

/// A `plan` key is accepted in place of `steps`.
#[test]
fn plan_key_is_normalized() {
    let harness = Harness::with_plan(
        r#"{"plan":[{"id":1,"title":"Docs","query":"b200","tool":"document_search","reasoning":"r"}]}"#,
    );
    let (result, _) = harness.run("q");
    let outcome = result.expect("mission");

    assert_eq!(outcome.plan[0].tool, ToolKind::DocumentSearch);
    assert_eq!(harness.docs.queries(), vec!["b200".to_string()]);
    assert!(harness.web.queries().is_empty());
}

/// A `synthesis` step produces the placeholder without touching any tool.
#[test]
fn synthesis_step_is_a_marker() {
    let steps = vec![step(1, "web_search"), step(2, "synthesis")];
    let harness = Harness::with_plan(&plan_json(&steps));
    let (result, _) = harness.run("q");
    let outcome = result.expect("mission");

    assert_eq!(outcome.findings[1].content, SYNTHESIS_PLACEHOLDER);
    assert_eq!(harness.web.queries().len(), 1);
    assert!(harness.docs.queries().is_empty());
}

/// A failing tool leaves an error finding and the mission still completes.
#[test]
fn failing_tool_does_not_stop_the_mission() {
    let mut harness = Harness::with_plan(&plan_json(&[
        step(1, "web_search"),
        step(2, "document_search"),
    ]));
    harness
        .registry
        .register("web_search", "web", FailingTool::new("upstream timeout"))
        .expect("register");

    let (result, events) = harness.run("q");
    let outcome = result.expect("mission");

    assert_eq!(
        outcome.findings[0].content,
        "Error executing web_search: upstream timeout"
    );
    assert_eq!(outcome.findings[1].content, "Source: memo.txt\nContent: doc result\n");
    assert!(
        events
            .iter()
            .any(|e| e.phase() == MissionPhase::Synthesizing)
    );
}

/// Unknown tools become findings; the mission continues to the end.
#[test]
fn unknown_tool_is_reported_in_findings() {
    let steps = vec![step(1, "stock_ticker"), step(2, "web_search")];
    let harness = Harness::with_plan(&plan_json(&steps));
    let (result, _) = harness.run("q");
    let outcome = result.expect("mission");

    assert_eq!(outcome.findings[0].content, "Unknown tool: stock_ticker");
    assert_eq!(outcome.findings.len(), 2);
    assert_eq!(outcome.final_answer, "final report");
}

/// Steps run in array order regardless of ids; transitions are `2L + 2`.
#[test]
fn steps_execute_in_array_order() {
    let mut steps = vec![step(3, "web_search"), step(1, "web_search"), step(2, "web_search")];
    for (i, s) in steps.iter_mut().enumerate() {
        s.query = format!("q{i}");
    }
    let harness = Harness::with_plan(&plan_json(&steps));
    let (result, events) = harness.run("q");
    let outcome = result.expect("mission");

    assert_eq!(harness.web.queries(), vec!["q0", "q1", "q2"]);
    let ids: Vec<i64> = outcome.findings.iter().map(|f| f.step_id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
    assert_eq!(outcome.transitions, 2 * 3 + 2);

    // After each advance, the cursor equals the number of findings so far.
    let mut findings = 0;
    for event in &events {
        match event {
            MissionEvent::Executed { finding, .. } => findings += usize::from(finding.is_some()),
            MissionEvent::Advanced { cursor, .. } => assert_eq!(*cursor, findings),
            _ => {}
        }
    }
}

/// The report prompt carries the rendered findings in execution order.
#[test]
fn synthesizer_receives_rendered_findings() {
    let steps = vec![step(1, "web_search"), step(2, "document_search")];
    let harness = Harness::with_plan(&plan_json(&steps));
    harness.run("q").0.expect("mission");

    let requests = harness.brain.requests();
    assert_eq!(requests.len(), 2);
    let input = &requests[1].messages[1].content;
    let web = input
        .find("Step 1 (Step 1 title):\nSource: https://web")
        .expect("web finding");
    let doc = input
        .find("Step 2 (Step 2 title):\nSource: memo.txt")
        .expect("doc finding");
    assert!(web < doc);
}

/// Synthesis failure is fatal and exposes the partial progress.
#[test]
fn synthesis_failure_surfaces_progress() {
    let steps = vec![step(1, "web_search"), step(2, "document_search")];
    let harness = Harness::new(vec![
        Ok(plan_json(&steps)),
        Err(BrainError::Http("503 service unavailable".to_string())),
    ]);
    let (result, events) = harness.run("q");
    let err = result.expect_err("synthesis fails");

    let MissionError::SynthesisFailed { progress, source } = &err;
    assert!(matches!(source, SynthesisError::Brain(BrainError::Http(_))));
    assert_eq!(progress.cursor, 2);
    assert_eq!(progress.findings.len(), 2);
    assert_eq!(progress.plan.len(), 2);
    assert!(
        !events
            .iter()
            .any(|e| e.phase() == MissionPhase::Synthesizing)
    );
}

/// Planner failure is absorbed into the fallback plan.
#[test]
fn planner_failure_falls_back() {
    let harness = Harness::new(vec![
        Err(BrainError::Http("connection reset".to_string())),
        Ok("report".to_string()),
    ]);
    let (result, _) = harness.run("fallback query");
    let outcome = result.expect("mission");
    assert_eq!(outcome.plan[0].query, "fallback query");
    assert_eq!(outcome.final_answer, "report");
}

/// Missions on a shared researcher do not share state.
#[test]
fn researcher_missions_are_independent() {
    let mut config = ResearchConfig::default();
    config.documents.persist = false;
    let store = Arc::new(DocumentStore::new(1000));
    let mut registry = ToolRegistry::new();
    registry
        .register("web_search", "web", StaticTool::new("hit"))
        .expect("register");
    let brain = ScriptedBrain::replying([
        plan_json(&[step(1, "web_search"), step(2, "web_search")]),
        "first".to_string(),
        plan_json(&[step(1, "web_search")]),
        "second".to_string(),
    ]);
    let researcher = Researcher::with_parts(&config, Arc::new(brain), registry, store);

    let first = researcher.run("a", |_| {}).expect("first");
    let second = researcher.run("b", |_| {}).expect("second");
    assert_eq!(first.findings.len(), 2);
    assert_eq!(second.findings.len(), 1);
    assert_eq!(second.user_query, "b");
    assert_eq!(second.final_answer, "second");
}
