//! Readers for the plain-text documents the gates consume.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::contract::BrickContract;

const TEST_COMMAND_KEY: &str = "TEST_COMMAND:";

/// Exact line the completion gate requires in the verdict artifact.
pub const PASS_VERDICT_LINE: &str = "Verdict: PASS";

/// Read and parse the brick contract. A missing document is an error.
pub fn read_contract(path: &Path) -> Result<BrickContract> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read brick contract {}", path.display()))?;
    let contract = BrickContract::parse(&text);
    debug!(
        brick = %contract.brick,
        allowed = contract.allowed_files.len(),
        "brick contract loaded"
    );
    Ok(contract)
}

/// The first non-empty `TEST_COMMAND:` value in the context document.
///
/// A missing document reads as "no command".
pub fn read_test_command(path: &Path) -> Result<Option<String>> {
    let Some(text) = read_optional(path)? else {
        debug!(path = %path.display(), "context document missing");
        return Ok(None);
    };
    Ok(parse_test_command(&text))
}

fn parse_test_command(text: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix(TEST_COMMAND_KEY))
        .map(str::trim)
        .find(|command| !command.is_empty())
        .map(str::to_string)
}

/// True if the verdict artifact exists and has a line that is exactly
/// `Verdict: PASS` once surrounding whitespace is trimmed.
pub fn has_pass_verdict(path: &Path) -> Result<bool> {
    let Some(text) = read_optional(path)? else {
        debug!(path = %path.display(), "verdict artifact missing");
        return Ok(false);
    };
    Ok(text.lines().any(|line| line.trim() == PASS_VERDICT_LINE))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_non_empty_test_command_wins() {
        let text = "NOTES: x\nTEST_COMMAND:   \nTEST_COMMAND: pytest -q\nTEST_COMMAND: make test\n";
        assert_eq!(parse_test_command(text).as_deref(), Some("pytest -q"));
    }

    #[test]
    fn indented_key_is_not_a_test_command() {
        assert_eq!(parse_test_command("  TEST_COMMAND: true\n"), None);
    }

    #[test]
    fn missing_context_reads_as_no_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let command = read_test_command(&temp.path().join("context.txt")).expect("read");
        assert_eq!(command, None);
    }

    #[test]
    fn verdict_requires_exact_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("skeptic_verdict.md");
        assert!(!has_pass_verdict(&path).expect("missing"));

        for text in [
            "Verdict: pass\n",
            "Verdict: PASS with notes\n",
            "The Verdict: PASS\n",
            "Verdict: FAIL\n",
        ] {
            fs::write(&path, text).expect("write");
            assert!(!has_pass_verdict(&path).expect("read"), "{text:?}");
        }

        fs::write(&path, "# Review\n\n  Verdict: PASS  \n").expect("write");
        assert!(has_pass_verdict(&path).expect("read"));
    }

    #[test]
    fn missing_contract_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(read_contract(&temp.path().join("spec.md")).is_err());
    }
}
