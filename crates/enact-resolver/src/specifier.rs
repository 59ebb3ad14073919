use std::path::{Path, PathBuf};

/// A parsed tool specifier, one of three accepted forms: an explicit
/// filesystem path, a single-segment alias, or a hierarchical
/// `name[:action][@version]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    Path(PathBuf),
    Alias {
        alias: String,
        action: Option<String>,
        version: Option<String>,
    },
    Name {
        name: String,
        action: Option<String>,
        version: Option<String>,
    },
}

/// Parses a raw specifier string per the resolver's search rules.
pub fn parse(raw: &str) -> Specifier {
    if looks_path_like(raw) {
        return Specifier::Path(PathBuf::from(raw));
    }
    let (name, action, version) = split_name_action_version(raw);
    if name.contains('/') {
        Specifier::Name {
            name,
            action,
            version,
        }
    } else {
        Specifier::Alias {
            alias: name,
            action,
            version,
        }
    }
}

fn looks_path_like(raw: &str) -> bool {
    raw.starts_with("./")
        || raw.starts_with("../")
        || raw.starts_with('/')
        || is_windows_drive(raw)
        || Path::new(raw).exists()
}

/// `x:\` / `x:/`-shaped Windows drive prefixes, e.g. `C:\Users\...`.
fn is_windows_drive(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes.get(2), Some(b'/') | Some(b'\\'))
}

/// Splits `name[:action][@version]`. The version is split off first by
/// the last `@`; the action is then split off by the last `:` in what
/// remains, unless that colon sits at index 1 and is immediately
/// followed by `/` — a Windows drive letter, never an action
/// separator. An empty action after the colon reverts to "no action".
fn split_name_action_version(raw: &str) -> (String, Option<String>, Option<String>) {
    let (before_version, version) = match raw.rfind('@') {
        Some(idx) => (&raw[..idx], Some(raw[idx + 1..].to_string())),
        None => (raw, None),
    };

    let action_idx = before_version.rfind(':').filter(|&idx| {
        !(idx == 1 && before_version.as_bytes().get(2) == Some(&b'/'))
    });

    let (name, action) = match action_idx {
        Some(idx) => {
            let action = &before_version[idx + 1..];
            let action = if action.is_empty() {
                None
            } else {
                Some(action.to_string())
            };
            (before_version[..idx].to_string(), action)
        }
        None => (before_version.to_string(), None),
    };

    (name, action, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_paths_are_path_like() {
        assert_eq!(parse("./x"), Specifier::Path(PathBuf::from("./x")));
        assert_eq!(parse("../x"), Specifier::Path(PathBuf::from("../x")));
        assert_eq!(parse("/x"), Specifier::Path(PathBuf::from("/x")));
    }

    #[test]
    fn windows_drive_is_path_like_not_an_action_split() {
        assert_eq!(
            parse(r"C:\Users\alice\skill"),
            Specifier::Path(PathBuf::from(r"C:\Users\alice\skill"))
        );
    }

    #[test]
    fn colon_at_index_one_is_not_an_action_separator_even_off_the_path_branch() {
        // Exercises the splitter directly: even if something upstream
        // routed a drive-shaped string here, the colon-at-1 guard holds.
        let (name, action, _version) = split_name_action_version("C:/something");
        assert_eq!(name, "C:/something");
        assert_eq!(action, None);
    }

    #[test]
    fn hierarchical_name_with_action_and_version() {
        assert_eq!(
            parse("acme/lint:format@1.2.3"),
            Specifier::Name {
                name: "acme/lint".to_string(),
                action: Some("format".to_string()),
                version: Some("1.2.3".to_string()),
            }
        );
    }

    #[test]
    fn hierarchical_name_with_version_only() {
        assert_eq!(
            parse("acme/lint@1.2.3"),
            Specifier::Name {
                name: "acme/lint".to_string(),
                action: None,
                version: Some("1.2.3".to_string()),
            }
        );
    }

    #[test]
    fn empty_action_after_colon_reverts_to_no_action() {
        assert_eq!(
            parse("acme/lint:"),
            Specifier::Name {
                name: "acme/lint".to_string(),
                action: None,
                version: None,
            }
        );
    }

    #[test]
    fn single_segment_with_no_slash_is_an_alias() {
        assert_eq!(
            parse("lint"),
            Specifier::Alias {
                alias: "lint".to_string(),
                action: None,
                version: None,
            }
        );
    }

    #[test]
    fn alias_can_still_carry_action_and_version() {
        assert_eq!(
            parse("lint:format@2.0.0"),
            Specifier::Alias {
                alias: "lint".to_string(),
                action: Some("format".to_string()),
                version: Some("2.0.0".to_string()),
            }
        );
    }
}
