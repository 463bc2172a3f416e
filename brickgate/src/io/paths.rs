//! Resolved artifact paths for a workflow root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::{GateConfig, load_config};

/// Location of the optional config file, relative to the workflow root.
pub const CONFIG_PATH: &str = ".workflow/config.toml";

/// All canonical paths the gates touch for a workflow root.
#[derive(Debug, Clone)]
pub struct GatePaths {
    pub root: PathBuf,
    pub spec_path: PathBuf,
    pub state_path: PathBuf,
    pub context_path: PathBuf,
    pub handover_path: PathBuf,
    pub verdict_path: PathBuf,
    pub packet_dir: PathBuf,
    pub test_output_path: PathBuf,
    pub snapshot_path: PathBuf,
}

impl GatePaths {
    pub fn new(root: impl Into<PathBuf>, cfg: &GateConfig) -> Self {
        let root = root.into();
        let packet_dir = root.join(&cfg.packet_dir);
        Self {
            spec_path: root.join(&cfg.spec_path),
            state_path: root.join(&cfg.state_path),
            context_path: root.join(&cfg.context_path),
            handover_path: root.join(&cfg.handover_path),
            verdict_path: root.join(&cfg.verdict_path),
            test_output_path: packet_dir.join("test_output.txt"),
            packet_dir,
            snapshot_path: root.join(&cfg.snapshot_path),
            root,
        }
    }

    /// `path` relative to the root, with forward slashes, for display and
    /// for recording in state.
    pub fn display_rel(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Everything a gate needs about its workflow root: config plus paths.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub config: GateConfig,
    pub paths: GatePaths,
}

impl Workflow {
    /// Load `.workflow/config.toml` under `root` (defaults if missing).
    pub fn open(root: &Path) -> Result<Self> {
        let config = load_config(&root.join(CONFIG_PATH)).context("load gate config")?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: &Path, config: GateConfig) -> Self {
        let paths = GatePaths::new(root, &config);
        Self { config, paths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_are_stable() {
        let paths = GatePaths::new("/work", &GateConfig::default());
        assert!(paths.state_path.ends_with("state.json"));
        assert!(paths.verdict_path.ends_with("skeptic_verdict.md"));
        assert_eq!(
            paths.display_rel(&paths.test_output_path),
            "skeptic_packet/test_output.txt"
        );
        assert_eq!(
            paths.display_rel(&paths.snapshot_path),
            ".workflow/snapshots/before.json"
        );
    }

    #[test]
    fn open_reads_config_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(temp.path().join(".workflow")).expect("mkdir");
        std::fs::write(
            temp.path().join(CONFIG_PATH),
            "packet_dir = \"review\"\n",
        )
        .expect("write config");

        let workflow = Workflow::open(temp.path()).expect("open");
        assert_eq!(
            workflow.paths.display_rel(&workflow.paths.test_output_path),
            "review/test_output.txt"
        );
    }
}
