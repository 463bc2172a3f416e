//! Shared deterministic types for gate core logic.
//!
//! These types define stable contracts between the gates and the persisted
//! workflow record. They must not depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// Outcome of a single test command run, as recorded in workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
}

impl TestStatus {
    /// Status is driven by the exit code only.
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
        }
    }
}

/// Lifecycle status of the current brick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrickStatus {
    #[default]
    InProgress,
    Completed,
}

impl BrickStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BrickStatus::InProgress => "IN_PROGRESS",
            BrickStatus::Completed => "COMPLETED",
        }
    }
}

/// The most recent test gate run. Replaced wholesale on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunRecord {
    pub command: String,
    pub status: TestStatus,
    pub exit_code: i32,
    #[serde(rename = "artifact")]
    pub artifact_path: String,
    /// Unique failing test identifiers in first-seen order.
    #[serde(rename = "failed_nodeids", default)]
    pub failed_test_ids: Vec<String>,
}

/// Which class of problem made a gate fail.
///
/// Configuration and tool problems are kept apart from plain test failures so
/// an orchestrator can tell "tooling broke" from "the change is wrong".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A required document or field is missing or malformed.
    Configuration,
    /// The launched command is absent or could not be started, or its output
    /// names a missing tool.
    ExternalTool,
    /// The command ran and reported failing tests.
    Tests,
}

/// Which change-set backend produced a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMode {
    Git,
    Snapshot,
}

impl DetectMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectMode::Git => "git",
            DetectMode::Snapshot => "snapshot",
        }
    }
}
