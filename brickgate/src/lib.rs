//! Mechanical gates for a contract-driven code-change loop.
//!
//! Each gate is a discrete checkpoint run by an external orchestrator: the
//! scope gate checks touched files against the brick contract, the test gate
//! runs the declared test command and records the outcome, and the
//! completion gate requires a reviewer's PASS verdict before a brick may be
//! marked complete. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (contract scanning, scope set
//!   difference, failure extraction, state transitions). No I/O.
//! - **[`io`]**: Side-effecting operations (filesystem, git, snapshot hashing,
//!   process execution). Isolated to enable fakes in tests.
//!
//! Orchestration modules ([`scope`], [`test_gate`], [`completion`],
//! [`contract`], [`packet`]) coordinate core logic with I/O to implement CLI
//! commands.

pub mod completion;
pub mod contract;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod packet;
pub mod scope;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod test_gate;
