//! Stable exit codes for brickgate CLI commands.
//!
//! The test gate additionally passes a failing test command's own exit code
//! through unchanged.

/// Gate passed: tests green, scope compliant, or brick completed.
pub const OK: i32 = 0;
/// Policy violation: out-of-scope changes or a rejected completion.
pub const VIOLATION: i32 = 1;
/// Configuration or tooling failure: missing documents, bad baseline, bad config.
pub const CONFIG: i32 = 2;
/// Recorded when the configured test timeout kills the command.
pub const TIMED_OUT: i32 = 124;
/// Recorded when the test program exists but could not be started.
pub const NOT_RUNNABLE: i32 = 126;
/// Recorded when the test program does not exist.
pub const NOT_FOUND: i32 = 127;
