//! Append-only handover log (`handover.md`).
//!
//! Each gate decision becomes one markdown block. Blocks are only ever
//! appended; nothing here rewrites or truncates the log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

pub const TEST_GATE: &str = "TEST GATE";
pub const COMPLETION_GATE: &str = "COMPLETION GATE";

/// One gate event, rendered as a heading plus `- key: value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoverEntry {
    pub gate: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl HandoverEntry {
    pub fn new(gate: &'static str) -> Self {
        Self {
            gate,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((key, value.into()));
        self
    }

    /// Blank separator line, heading, then one line per field.
    pub fn render(&self) -> String {
        let mut out = format!("\n## {}\n", self.gate);
        for (key, value) in &self.fields {
            out.push_str(&format!("- {key}: {value}\n"));
        }
        out
    }
}

/// Append `entry` to the log, creating the file if needed.
pub fn append_entry(path: &Path, entry: &HandoverEntry) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open handover log {}", path.display()))?;
    file.write_all(entry.render().as_bytes())
        .with_context(|| format!("append handover log {}", path.display()))?;
    debug!(gate = entry.gate, "handover entry appended");
    Ok(())
}
