//! Snapshot baseline for working trees without git.
//!
//! The baseline maps every regular file's root-relative path to the SHA-256
//! of its bytes. It never lists anything under `.git/` or the baseline file
//! itself, so writing the baseline cannot show up as a change.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use super::atomic::write_json_atomic;

/// Path → lowercase hex SHA-256, ordered by path.
pub type FileDigests = BTreeMap<String, String>;

/// Baseline problems callers must tell apart from other I/O failures.
#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("snapshot baseline missing at {path}; run `brickgate scope --snapshot-init` first")]
    Missing { path: String },
    #[error("snapshot baseline at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    files: &'a FileDigests,
}

/// Hash every regular file under `root`, skipping `.git` and `exclude`.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn take_snapshot(root: &Path, exclude: &Path) -> Result<FileDigests> {
    let mut files = FileDigests::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !(entry.depth() > 0 && entry.file_name() == ".git"));
    for entry in walker {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        let path = entry.path();
        if path == exclude || !path.is_file() {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(key, hash_file(path)?);
    }
    debug!(count = files.len(), "snapshot taken");
    Ok(files)
}

/// SHA-256 over the full file contents, lowercase hex.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Record the current tree as the baseline, replacing any previous one.
///
/// Returns the number of files recorded.
pub fn write_snapshot(root: &Path, snapshot_path: &Path) -> Result<usize> {
    let files = take_snapshot(root, snapshot_path)?;
    write_json_atomic(snapshot_path, &SnapshotDocument { files: &files })
        .context("write snapshot baseline")?;
    Ok(files.len())
}

/// Load a baseline written by [`write_snapshot`].
///
/// Fails with [`BaselineError::Missing`] if there is no baseline and with
/// [`BaselineError::Corrupt`] if it is not a `{"files": {...}}` document.
/// Entries with non-string digests are skipped.
pub fn read_snapshot(snapshot_path: &Path) -> Result<FileDigests> {
    let display = snapshot_path.display().to_string();
    let contents = match fs::read_to_string(snapshot_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(BaselineError::Missing { path: display }.into());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read snapshot {display}"));
        }
    };
    let value: Value = serde_json::from_str(&contents).map_err(|err| BaselineError::Corrupt {
        path: display.clone(),
        reason: err.to_string(),
    })?;
    let Some(entries) = value.get("files").and_then(Value::as_object) else {
        return Err(BaselineError::Corrupt {
            path: display,
            reason: "expected an object under \"files\"".to_string(),
        }
        .into());
    };
    Ok(entries
        .iter()
        .filter_map(|(path, digest)| Some((path.clone(), digest.as_str()?.to_string())))
        .collect())
}

/// Paths that are new or whose digest changed, in path order.
///
/// Files that exist only in the baseline are not reported.
pub fn changed_paths(before: &FileDigests, after: &FileDigests) -> Vec<String> {
    after
        .iter()
        .filter(|(path, digest)| before.get(*path) != Some(*digest))
        .map(|(path, _)| path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digests(pairs: &[(&str, &str)]) -> FileDigests {
        pairs
            .iter()
            .map(|(p, d)| (p.to_string(), d.to_string()))
            .collect()
    }

    #[test]
    fn hashes_known_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "abc").expect("write");
        assert_eq!(
            hash_file(&path).expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn snapshot_excludes_git_dir_and_itself() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join(".git/objects")).expect("mkdir");
        fs::write(root.join(".git/HEAD"), "ref").expect("write");
        fs::create_dir_all(root.join("src")).expect("mkdir");
        fs::write(root.join("src/lib.rs"), "fn a() {}").expect("write");
        let snapshot_path = root.join(".workflow/snapshots/before.json");

        write_snapshot(root, &snapshot_path).expect("init");
        write_snapshot(root, &snapshot_path).expect("re-init");

        let baseline = read_snapshot(&snapshot_path).expect("read");
        let keys: Vec<&str> = baseline.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["src/lib.rs"]);
    }

    #[test]
    fn round_trip_without_edits_has_no_changes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("a.txt"), "1").expect("write");
        fs::write(root.join("b.txt"), "2").expect("write");
        let snapshot_path = root.join(".workflow/snapshots/before.json");

        write_snapshot(root, &snapshot_path).expect("init");
        let before = read_snapshot(&snapshot_path).expect("read");
        let after = take_snapshot(root, &snapshot_path).expect("rescan");

        assert!(changed_paths(&before, &after).is_empty());
    }

    #[test]
    fn changed_paths_are_sorted_new_or_modified() {
        let before = digests(&[("b.txt", "1"), ("gone.txt", "2"), ("same.txt", "3")]);
        let after = digests(&[("b.txt", "9"), ("a_new.txt", "4"), ("same.txt", "3")]);
        assert_eq!(changed_paths(&before, &after), vec!["a_new.txt", "b.txt"]);
    }

    #[test]
    fn missing_baseline_is_typed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = read_snapshot(&temp.path().join("before.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BaselineError>(),
            Some(BaselineError::Missing { .. })
        ));
    }

    #[test]
    fn corrupt_baseline_is_typed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("before.json");

        fs::write(&path, "not json").expect("write");
        let err = read_snapshot(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BaselineError>(),
            Some(BaselineError::Corrupt { .. })
        ));

        fs::write(&path, "{\"files\": [\"a\"]}").expect("write");
        let err = read_snapshot(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BaselineError>(),
            Some(BaselineError::Corrupt { .. })
        ));
    }

    #[test]
    fn non_string_digests_are_skipped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("before.json");
        fs::write(&path, "{\"files\": {\"a.txt\": \"ff\", \"b.txt\": 3}}").expect("write");

        let baseline = read_snapshot(&path).expect("read");
        assert_eq!(baseline, digests(&[("a.txt", "ff")]));
    }
}
