//! Split a `TEST_COMMAND` value into an argument vector.
//!
//! The command is executed directly, never through a shell, so quoting is
//! resolved here with POSIX-shell-like rules: whitespace separates words,
//! single quotes are literal, double quotes allow `\"`, `\\`, `\$` and
//! `` \` `` escapes, and a backslash outside quotes escapes the next character.

use thiserror::Error;

/// Why a command line could not be split.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("unterminated single quote")]
    UnterminatedSingleQuote,
    #[error("unterminated double quote")]
    UnterminatedDoubleQuote,
    #[error("trailing backslash")]
    TrailingBackslash,
}

pub fn split_command_line(line: &str) -> Result<Vec<String>, SplitError> {
    let mut words = Vec::new();
    let mut current = String::new();
    // Distinguishes `''` (an empty word) from no word at all.
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err(SplitError::UnterminatedSingleQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\' | '$' | '`')) => current.push(escaped),
                            Some('\n') => {}
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(SplitError::UnterminatedDoubleQuote),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err(SplitError::UnterminatedDoubleQuote),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(escaped) => {
                    in_word = true;
                    current.push(escaped);
                }
                None => return Err(SplitError::TrailingBackslash),
            },
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> Vec<String> {
        split_command_line(line).expect("split")
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split("python3 -m  pytest\t-q"), ["python3", "-m", "pytest", "-q"]);
    }

    #[test]
    fn honours_quotes() {
        assert_eq!(
            split(r#"sh -c 'echo "hi there"; exit 3' "a b" c\ d"#),
            ["sh", "-c", r#"echo "hi there"; exit 3"#, "a b", "c d"]
        );
    }

    #[test]
    fn double_quote_escapes() {
        assert_eq!(split(r#""say \"x\" \n""#), [r#"say "x" \n"#]);
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(split("echo ''"), ["echo", ""]);
        assert!(split("   ").is_empty());
    }

    #[test]
    fn rejects_unbalanced_quotes() {
        assert_eq!(
            split_command_line("pytest 'oops"),
            Err(SplitError::UnterminatedSingleQuote)
        );
        assert_eq!(
            split_command_line("pytest \"oops"),
            Err(SplitError::UnterminatedDoubleQuote)
        );
        assert_eq!(
            split_command_line("pytest \\"),
            Err(SplitError::TrailingBackslash)
        );
    }
}
