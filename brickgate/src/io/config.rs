//! Gate configuration stored under `.workflow/config.toml`.

use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gate configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// used by the brick workflow. Artifact paths are relative to the workflow
/// root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    /// Brick contract document.
    pub spec_path: String,
    /// Persistent workflow state record.
    pub state_path: String,
    /// Context document holding the `TEST_COMMAND:` line.
    pub context_path: String,
    /// Append-only audit trail of gate decisions.
    pub handover_path: String,
    /// Reviewer verdict consumed by the completion gate.
    pub verdict_path: String,
    /// Directory for reviewer packet artifacts (test output lives here too).
    pub packet_dir: String,
    /// Snapshot baseline for non-git change detection.
    pub snapshot_path: String,

    pub test: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestConfig {
    /// Kill the test command after this many seconds. Unset means wait forever.
    pub timeout_secs: Option<u64>,
    /// Keep at most this many bytes of combined test output.
    pub output_limit_bytes: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            output_limit_bytes: 10_000_000,
        }
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            spec_path: "spec.md".to_string(),
            state_path: "state.json".to_string(),
            context_path: "context.txt".to_string(),
            handover_path: "handover.md".to_string(),
            verdict_path: "skeptic_verdict.md".to_string(),
            packet_dir: "skeptic_packet".to_string(),
            snapshot_path: ".workflow/snapshots/before.json".to_string(),
            test: TestConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("spec_path", &self.spec_path),
            ("state_path", &self.state_path),
            ("context_path", &self.context_path),
            ("handover_path", &self.handover_path),
            ("verdict_path", &self.verdict_path),
            ("packet_dir", &self.packet_dir),
            ("snapshot_path", &self.snapshot_path),
        ] {
            validate_relative(name, value)?;
        }
        if self.test.output_limit_bytes == 0 {
            return Err(anyhow!("test.output_limit_bytes must be > 0"));
        }
        if self.test.timeout_secs == Some(0) {
            return Err(anyhow!("test.timeout_secs must be > 0 when set"));
        }
        Ok(())
    }
}

fn validate_relative(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{name} must not be empty"));
    }
    let path = Path::new(value);
    if path
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(anyhow!("{name} must be relative to the workflow root (got '{value}')"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GateConfig::default()`.
pub fn load_config(path: &Path) -> Result<GateConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(GateConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GateConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, GateConfig::default());
        assert_eq!(cfg.test.timeout(), None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "state_path = \"work/state.json\"\n\n[test]\ntimeout_secs = 90\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.state_path, "work/state.json");
        assert_eq!(cfg.spec_path, "spec.md");
        assert_eq!(cfg.test.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(cfg.test.output_limit_bytes, 10_000_000);
    }

    #[test]
    fn rejects_absolute_paths_and_zero_limits() {
        let cfg = GateConfig {
            state_path: "/etc/state.json".to_string(),
            ..GateConfig::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = GateConfig::default();
        cfg.test.output_limit_bytes = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GateConfig::default();
        cfg.test.timeout_secs = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "state_path = [").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse"));
    }
}
