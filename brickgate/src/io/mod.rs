//! I/O helpers for gate commands.

pub mod atomic;
pub mod changes;
pub mod config;
pub mod documents;
pub mod git;
pub mod handover;
pub mod paths;
pub mod process;
pub mod snapshot;
pub mod workflow_state;
