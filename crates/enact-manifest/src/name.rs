use crate::errors::{ManifestError, ManifestResult};
use regex::Regex;
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_-]+(/[a-z0-9_-]+)+$").unwrap())
}

/// Validates a manifest's `name` field against the hierarchical-path
/// grammar: lowercase segments separated by `/`, no `@`, at least two
/// segments.
pub fn validate_name(name: &str) -> ManifestResult<()> {
    if name.contains('@') || !name_pattern().is_match(name) {
        return Err(ManifestError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hierarchical_lowercase_names() {
        assert!(validate_name("alice/greet").is_ok());
        assert!(validate_name("acme/tools/lint").is_ok());
        assert!(validate_name("a1_b-2/c3").is_ok());
    }

    #[test]
    fn rejects_single_segment_names() {
        assert!(validate_name("greet").is_err());
    }

    #[test]
    fn rejects_uppercase_and_version_suffix() {
        assert!(validate_name("Alice/Greet").is_err());
        assert!(validate_name("alice/greet@1.0.0").is_err());
    }
}
