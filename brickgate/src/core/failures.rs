//! Best-effort interpretation of test command output.
//!
//! Status never depends on anything here: it is driven by the exit code alone.
//! These helpers only pull identifiers and a short human reason out of free
//! text, so a miss is not an error.

use std::sync::LazyLock;

use regex::Regex;

/// Per-line patterns, in priority order. The first pattern that matches a
/// line decides that line, even if its identifier is then filtered out.
static FAILURE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"^FAILED\s+(\S+)").unwrap(),
        Regex::new(r"^ERROR\s+at setup of\s+(\S+)").unwrap(),
        Regex::new(r"^ERROR\s+(\S+)").unwrap(),
    ]
});

const NO_MODULE: &str = "No module named ";
const COMMAND_NOT_FOUND: &str = "command not found";

/// Extract unique failing test identifiers in first-seen order.
///
/// An identifier is kept only if it contains `::` or ends with `.py`, which
/// filters out unrelated lines that merely start with `ERROR`.
pub fn extract_failed_test_ids(output: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for line in output.lines() {
        let text = line.trim();
        let Some(caps) = FAILURE_PATTERNS
            .iter()
            .find_map(|pattern| pattern.captures(text))
        else {
            continue;
        };
        let id = caps[1].trim();
        if !looks_like_test_id(id) {
            continue;
        }
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

fn looks_like_test_id(id: &str) -> bool {
    id.contains("::") || id.ends_with(".py")
}

/// Name of a missing tool mentioned in the output, if any.
///
/// Recognises Python's `No module named <x>` and shell
/// `command not found` lines (both `zsh: command not found: x` and
/// `bash: x: command not found` shapes).
pub fn detect_missing_tool(output: &str) -> Option<String> {
    output.lines().map(str::trim).find_map(missing_tool_in_line)
}

fn missing_tool_in_line(text: &str) -> Option<String> {
    if let Some((_, rest)) = text.split_once(NO_MODULE) {
        let name = rest.trim().trim_matches(|c| c == '\'' || c == '"');
        return non_empty(name);
    }
    if text.contains(COMMAND_NOT_FOUND) && text.contains(':') {
        let stripped = text.replace(COMMAND_NOT_FOUND, "");
        return stripped
            .rsplit(':')
            .map(str::trim)
            .find(|segment| !segment.is_empty())
            .map(str::to_string);
    }
    None
}

fn non_empty(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Short reason for a failing run, in priority order: missing tool, first
/// failing identifier, then a last-resort diagnostic carrying the exit code.
pub fn short_reason(
    exit_code: i32,
    failed_test_ids: &[String],
    missing_tool: Option<&str>,
) -> String {
    if let Some(tool) = missing_tool {
        return format!("missing tool {tool}");
    }
    if let Some(first) = failed_test_ids.first() {
        return format!("failing nodeid {first}");
    }
    format!("missing tool unknown (exit {exit_code})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_failed_nodeid() {
        let output = "collected 3 items\n\nFAILED tests/test_x.py::test_y - AssertionError\n";
        assert_eq!(
            extract_failed_test_ids(output),
            vec!["tests/test_x.py::test_y".to_string()]
        );
    }

    #[test]
    fn extracts_setup_errors_and_module_errors() {
        let output = "\
ERROR at setup of tests/test_db.py::test_conn
ERROR tests/test_import.py
ERROR something unrelated happened
";
        assert_eq!(
            extract_failed_test_ids(output),
            vec![
                "tests/test_db.py::test_conn".to_string(),
                "tests/test_import.py".to_string()
            ]
        );
    }

    #[test]
    fn setup_pattern_wins_over_plain_error() {
        // The setup pattern matches first; its id is filtered out and the
        // plain ERROR pattern is not consulted for the same line.
        let output = "ERROR at setup of fixture_name\n";
        assert!(extract_failed_test_ids(output).is_empty());
    }

    #[test]
    fn duplicates_keep_first_occurrence_order() {
        let output = "\
FAILED b.py::t2
   FAILED a.py::t1
FAILED b.py::t2 - again
";
        assert_eq!(
            extract_failed_test_ids(output),
            vec!["b.py::t2".to_string(), "a.py::t1".to_string()]
        );
    }

    #[test]
    fn keyword_must_start_the_line() {
        let output = "test summary: FAILED x.py::y\n";
        assert!(extract_failed_test_ids(output).is_empty());
    }

    #[test]
    fn detects_missing_python_module() {
        let output = "Traceback\nModuleNotFoundError: No module named 'pytest'\n";
        assert_eq!(detect_missing_tool(output), Some("pytest".to_string()));
        let output = "/usr/bin/python3: No module named pytest\n";
        assert_eq!(detect_missing_tool(output), Some("pytest".to_string()));
    }

    #[test]
    fn detects_command_not_found_shapes() {
        assert_eq!(
            detect_missing_tool("zsh: command not found: cargo-nextest\n"),
            Some("cargo-nextest".to_string())
        );
        assert_eq!(
            detect_missing_tool("bash: line 1: pytest: command not found\n"),
            Some("pytest".to_string())
        );
        assert_eq!(detect_missing_tool("command not found:\n"), None);
    }

    #[test]
    fn no_missing_tool_in_plain_failure() {
        assert_eq!(detect_missing_tool("1 failed, 2 passed\n"), None);
    }

    #[test]
    fn short_reason_priority() {
        let ids = vec!["a.py::t".to_string()];
        assert_eq!(short_reason(1, &ids, Some("pytest")), "missing tool pytest");
        assert_eq!(short_reason(1, &ids, None), "failing nodeid a.py::t");
        assert_eq!(short_reason(1, &[], None), "missing tool unknown (exit 1)");
    }
}
