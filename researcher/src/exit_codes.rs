//! Stable exit codes for researcher CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, config, or I/O failure.
pub const INVALID: i32 = 1;
/// The mission ran but could not produce a report.
pub const MISSION_FAILED: i32 = 2;
