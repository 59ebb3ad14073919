use crate::errors::{TemplateError, TemplateResult};
use crate::params::Param;
use regex::Regex;
use std::sync::OnceLock;

/// Characters whose presence forces a shell invocation rather than a
/// plain argv vector: pipes, control operators, redirection, command
/// substitution and globbing.
const SHELL_METACHARACTERS: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '*', '?', '[', ']',
];

pub fn contains_shell_metacharacters(s: &str) -> bool {
    s.chars().any(|c| SHELL_METACHARACTERS.contains(&c))
}

fn safe_unquoted_pattern() -> &'static Regex {
    static P: OnceLock<Regex> = OnceLock::new();
    P.get_or_init(|| Regex::new(r"^[A-Za-z0-9/_.:=-]+$").unwrap())
}

/// Renders a single parameter value as a shell-safe string fragment,
/// per the substitution rules: verbatim when the string already matches
/// the safe-character set, single-quoted (with embedded quotes escaped
/// as `'\''`) otherwise; canonical string conversion for numbers and
/// booleans; the empty-quoted string for null; JSON serialization for
/// composite values.
pub fn shell_safe(value: &Param) -> String {
    match value {
        Param::String(s) => quote_if_needed(s),
        Param::Integer(i) => i.to_string(),
        Param::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{n:.1}")
            } else {
                n.to_string()
            }
        }
        Param::Bool(b) => b.to_string(),
        Param::Null => "''".to_string(),
        Param::Array(_) | Param::Object(_) => {
            let json = serde_json::Value::from(value.clone());
            quote_if_needed(&json.to_string())
        }
    }
}

fn quote_if_needed(s: &str) -> String {
    if !s.is_empty() && safe_unquoted_pattern().is_match(s) {
        s.to_string()
    } else {
        let escaped = s.replace('\'', r"'\''");
        format!("'{escaped}'")
    }
}

/// Splits a string into argv-style tokens, respecting single quotes,
/// double quotes and backslash escapes the way a POSIX shell word-split
/// would (without performing globbing or variable expansion — those
/// have already happened, or will happen inside `sh -c`).
pub fn split_argv(input: &str) -> TemplateResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_current = false;
    let mut chars = input.chars().peekable();

    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }
    let mut quote = Quote::None;

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => {
                    if let Some(&next) = chars.peek() {
                        if next == '"' || next == '\\' || next == '$' {
                            current.push(next);
                            chars.next();
                        } else {
                            current.push(c);
                        }
                    } else {
                        current.push(c);
                    }
                }
                _ => current.push(c),
            },
            Quote::None => match c {
                ' ' | '\t' => {
                    if has_current {
                        tokens.push(std::mem::take(&mut current));
                        has_current = false;
                    }
                    continue;
                }
                '\'' => {
                    quote = Quote::Single;
                    has_current = true;
                }
                '"' => {
                    quote = Quote::Double;
                    has_current = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        has_current = true;
                    }
                }
                _ => {
                    current.push(c);
                    has_current = true;
                }
            },
        }
        if quote != Quote::None {
            has_current = true;
        }
    }

    if quote != Quote::None {
        return Err(TemplateError::UnterminatedQuote(input.to_string()));
    }
    if has_current {
        tokens.push(current);
    }
    Ok(tokens)
}
