//! Line-oriented scanner for brick contract documents.
//!
//! A contract is plain text. `BRICK: <name>` names the brick, and a line that
//! is exactly `<SECTION>:` at zero indentation opens a section. Any later
//! zero-indented line ending in `:` closes it, whatever its case. The format
//! is forgiving: anything missing or malformed parses to an empty value rather
//! than an error.

pub const FILES_SECTION: &str = "FILES";
pub const ACCEPTANCE_SECTION: &str = "ACCEPTANCE CRITERIA";
pub const SCOPE_SECTION: &str = "SCOPE";

/// Structured view of a brick contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrickContract {
    pub brick: String,
    /// Allowed file paths in document order, forward-slash normalized.
    pub allowed_files: Vec<String>,
    /// Raw lines of the acceptance criteria section (not interpreted).
    pub acceptance_criteria: Vec<String>,
    /// Raw lines of the scope section (not interpreted).
    pub scope_rules: Vec<String>,
}

impl BrickContract {
    pub fn parse(text: &str) -> Self {
        Self {
            brick: brick_name(text),
            allowed_files: allowed_files(text),
            acceptance_criteria: section_lines(text, ACCEPTANCE_SECTION),
            scope_rules: section_lines(text, SCOPE_SECTION),
        }
    }
}

/// Name from the first `BRICK:` line, or empty.
pub fn brick_name(text: &str) -> String {
    text.lines()
        .find_map(|line| line.strip_prefix("BRICK:"))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_default()
}

/// `- <path>` entries of the `FILES:` section.
pub fn allowed_files(text: &str) -> Vec<String> {
    section_lines(text, FILES_SECTION)
        .iter()
        .filter_map(|line| line.trim().strip_prefix('-'))
        .map(normalize_path)
        .filter(|path| !path.is_empty())
        .collect()
}

/// Lines strictly between the `<name>:` header and the next section header.
///
/// Only the first occurrence of the section is read.
pub fn section_lines(text: &str, name: &str) -> Vec<String> {
    let mut lines = text.lines();
    let opened = lines.by_ref().any(|line| header_name(line) == Some(name));
    if !opened {
        return Vec::new();
    }
    lines
        .take_while(|line| header_name(line).is_none())
        .map(str::to_string)
        .collect()
}

/// Section name if `line` is a zero-indented line ending in `:`.
fn header_name(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    line.trim_end().strip_suffix(':').map(str::trim_end)
}

/// Trim, use forward slashes and drop a leading `./`.
pub fn normalize_path(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    path
}
