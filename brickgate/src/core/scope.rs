//! Scope enforcement: changed paths that the contract does not allow.

use std::collections::HashSet;

/// Result of comparing a change set against the allowed files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeVerdict {
    /// Every changed path is allowed.
    Ok,
    /// Changed paths outside the allowed set, in detector order. Never empty.
    Violations(Vec<String>),
}

impl ScopeVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, ScopeVerdict::Ok)
    }
}

/// Set difference `changed - allowed`, preserving the order of `changed`.
///
/// Allowed files that were not touched are never reported.
pub fn check_scope<S: AsRef<str>>(changed: &[S], allowed: &[S]) -> ScopeVerdict {
    let allowed: HashSet<&str> = allowed.iter().map(|path| path.as_ref()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut violations = Vec::new();
    for path in changed.iter().map(|path| path.as_ref()) {
        if !allowed.contains(path) && seen.insert(path) {
            violations.push(path.to_string());
        }
    }
    if violations.is_empty() {
        ScopeVerdict::Ok
    } else {
        ScopeVerdict::Violations(violations)
    }
}
