//! Automated multi-step research missions.
//!
//! A mission turns a natural-language query into a research plan, runs each
//! plan step against a retrieval tool, and synthesizes a report from the
//! findings. The crate is split the same way the mission is:
//!
//! - **[`core`]**: Pure, deterministic logic (mission state, plan validation).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting capabilities (reasoning model, web search,
//!   document store, config, prompts).
//! - **[`agents`]**: One module per mission stage, pairing core logic with a
//!   capability.
//!
//! [`mission`] sequences the stages; [`runtime::Researcher`] bundles the
//! collaborators built from config for the CLI and the server.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mission;
pub mod plan;
pub mod runtime;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::types::{Finding, MissionEvent, MissionOutcome, MissionPhase, MissionProgress};
pub use crate::mission::{MissionController, MissionError, error_chain, run_mission};
pub use crate::plan::{Plan, PlanStep, ToolKind};
pub use crate::runtime::Researcher;
