//! Turn untrusted planner output into a valid [`Plan`].
//!
//! [`validate_plan`] is total: every input yields a non-empty plan. Output that
//! cannot be repaired is replaced by [`Plan::fallback`] and the reason is kept
//! in [`PlanSource::Fallback`].

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use jsonschema::{Draft, Validator};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::plan::Plan;

const PLAN_SCHEMA: &str = include_str!("../../schemas/research_plan.schema.json");

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence regex")
});

static PLAN_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(PLAN_SCHEMA).expect("plan schema should be valid json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("plan schema should compile")
});

/// Where a validated plan came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSource {
    Oracle,
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan {
    pub plan: Plan,
    pub source: PlanSource,
}

impl ValidatedPlan {
    pub fn fallback(user_query: &str, reason: impl Into<String>) -> Self {
        Self {
            plan: Plan::fallback(user_query),
            source: PlanSource::Fallback {
                reason: reason.into(),
            },
        }
    }

    /// Fallback reason, if the plan is the fallback.
    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.source {
            PlanSource::Oracle => None,
            PlanSource::Fallback { reason } => Some(reason),
        }
    }
}

/// Validate raw planner output, falling back to a single web search on
/// `user_query` when it cannot be parsed or does not match the plan schema.
pub fn validate_plan(raw: &str, user_query: &str) -> ValidatedPlan {
    match parse_plan(raw) {
        Ok(plan) => {
            let duplicates = plan.duplicate_ids();
            if !duplicates.is_empty() {
                warn!(?duplicates, "plan contains duplicate step ids; executing in array order");
            }
            debug!(steps = plan.len(), "planner output accepted");
            ValidatedPlan {
                plan,
                source: PlanSource::Oracle,
            }
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!(error = %reason, raw_output = raw, "planner output rejected; using fallback plan");
            ValidatedPlan::fallback(user_query, reason)
        }
    }
}

fn parse_plan(raw: &str) -> Result<Plan> {
    let text = strip_fences(raw);
    if text.is_empty() {
        bail!("planner output is empty");
    }
    let mut value: Value = serde_json::from_str(text).context("parse planner output as json")?;
    normalize_shape(&mut value);
    validate_schema(&value)?;
    integral_ids(&mut value);
    serde_json::from_value(value).context("deserialize plan")
}

/// Extract the JSON payload from fenced or prose-wrapped output.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = FENCE_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        return inner.as_str().trim();
    }
    if trimmed.starts_with('{') {
        return trimmed;
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Accept `{"plan": [...]}` as an alias for `{"steps": [...]}`.
fn normalize_shape(value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    if object.contains_key("steps") {
        return;
    }
    if let Some(steps) = object.remove("plan") {
        object.insert("steps".to_string(), steps);
    }
}

/// Schema `integer` admits `1.0`; rewrite whole-number float ids as integers.
fn integral_ids(value: &mut Value) {
    let Some(steps) = value.get_mut("steps").and_then(Value::as_array_mut) else {
        return;
    };
    for id in steps.iter_mut().filter_map(|step| step.get_mut("id")) {
        if id.is_f64()
            && let Some(float) = id.as_f64()
            && float.fract() == 0.0
            && float.abs() < i64::MAX as f64
        {
            *id = Value::from(float as i64);
        }
    }
}

fn validate_schema(instance: &Value) -> Result<()> {
    let messages: Vec<String> = PLAN_VALIDATOR
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("plan schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}
