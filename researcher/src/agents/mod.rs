//! Mission stages that pair core logic with a capability.

pub mod executor;
pub mod planner;
pub mod synthesizer;
