//! Deterministic, pure logic shared by the mission loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod plan_validator;
pub mod state;
pub mod types;
