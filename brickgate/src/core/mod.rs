//! Deterministic, pure logic shared by the gates.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod command_line;
pub mod contract;
pub mod failures;
pub mod scope;
pub mod state_update;
pub mod types;
