//! Typed representation of a skill manifest (`skill.yaml` / `enact.yaml`)
//! and the loader that turns the on-disk two-file model (YAML + optional
//! `SKILL.md` documentation body) into a single, immutable [`Manifest`].

mod errors;
mod name;

pub use errors::{ManifestError, ManifestResult};
pub use name::validate_name;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// The set of filenames the resolver recognizes as a package manifest, in
/// the order they are preferred when more than one is present.
pub const MANIFEST_FILE_NAMES: &[&str] = &["skill.yaml", "skill.yml", "enact.yaml", "enact.yml"];

/// The human-documentation companion file. When both this and a YAML
/// manifest are present in the same directory, the YAML is authoritative
/// and the markdown body is attached as [`Manifest::doc`].
pub const DOC_FILE_NAME: &str = "SKILL.md";

/// Declaration of a single environment variable a skill's command
/// template expects to find populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub default: Option<String>,
}

/// A named sub-command within a skill, selected via `tool:action` syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub input_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Immutable, typed representation of a skill. Loaded once per run and
/// treated as read-only from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Container base image reference, e.g. `python:3.12-slim`.
    #[serde(default)]
    pub from: Option<String>,
    /// Command template. A manifest with no command is an "instruction
    /// tool": it is executed by emitting its documentation body rather
    /// than invoking a provider.
    #[serde(default)]
    pub command: Option<String>,
    /// Raw duration string of the form `<int>(ms|s|m|h)`, parsed lazily
    /// by callers via [`parse_duration`].
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvVarSpec>,
    #[serde(default = "default_input_schema")]
    pub input_schema: serde_json::Value,
    #[serde(default)]
    pub output_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub actions: BTreeMap<String, Action>,
    /// Shell commands run sequentially by the local provider before the
    /// main command, each under its own 10-minute budget. A non-zero
    /// exit from any step is a build failure.
    #[serde(default)]
    pub build: Vec<String>,
    /// Markdown documentation body, attached from `SKILL.md` when the
    /// manifest itself does not already carry one inline.
    #[serde(default)]
    pub doc: Option<String>,
}

fn default_input_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl Manifest {
    /// True when this manifest has no command to run: it is rendered to
    /// the caller as documentation instead of being executed.
    pub fn is_instruction_tool(&self) -> bool {
        self.command.is_none()
    }

    /// Parses [`Manifest::timeout`] into a [`Duration`], if present.
    pub fn parsed_timeout(&self) -> ManifestResult<Option<Duration>> {
        self.timeout.as_deref().map(parse_duration).transpose()
    }

    /// Returns the named action, if declared.
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }
}

/// Parses a duration string of the form `<int>(ms|s|m|h)`, e.g. `"30s"`,
/// `"2m"`, `"500ms"`.
pub fn parse_duration(raw: &str) -> ManifestResult<Duration> {
    let raw = raw.trim();
    let split_at = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ManifestError::InvalidDuration(raw.to_string()))?;
    let (digits, unit) = raw.split_at(split_at);
    let amount: u64 = digits
        .parse()
        .map_err(|_| ManifestError::InvalidDuration(raw.to_string()))?;
    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount * 60),
        "h" => Duration::from_secs(amount * 3600),
        _ => return Err(ManifestError::InvalidDuration(raw.to_string())),
    };
    Ok(duration)
}

/// Loads a manifest directory, applying the two-file model: `skill.yaml`
/// (or one of its siblings in [`MANIFEST_FILE_NAMES`]) is authoritative;
/// a sibling `SKILL.md` is attached as documentation unless the YAML
/// already set one. When no YAML manifest is present but `SKILL.md` is,
/// the markdown itself is treated as an instruction-only manifest whose
/// name is derived from the directory name.
pub fn load_dir(dir: &Path) -> ManifestResult<Manifest> {
    let yaml_path = MANIFEST_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file());

    let doc_path = dir.join(DOC_FILE_NAME);
    let doc_body = if doc_path.is_file() {
        Some(std::fs::read_to_string(&doc_path).map_err(|e| ManifestError::Io(doc_path.clone(), e))?)
    } else {
        None
    };

    let mut manifest = match yaml_path {
        Some(path) => load_yaml_file(&path)?,
        None => {
            let body = doc_body.clone().ok_or_else(|| {
                ManifestError::NotFound(dir.to_path_buf())
            })?;
            Manifest {
                name: dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default(),
                version: None,
                description: String::new(),
                from: None,
                command: None,
                timeout: None,
                env: BTreeMap::new(),
                input_schema: default_input_schema(),
                output_schema: None,
                actions: BTreeMap::new(),
                build: Vec::new(),
                doc: Some(body),
            }
        }
    };

    validate_name(&manifest.name)?;
    if manifest.doc.is_none() {
        manifest.doc = doc_body;
    }
    Ok(manifest)
}

/// Parses a single YAML manifest file (no documentation attachment).
pub fn load_yaml_file(path: &Path) -> ManifestResult<Manifest> {
    let raw = std::fs::read_to_string(path).map_err(|e| ManifestError::Io(path.to_path_buf(), e))?;
    let manifest: Manifest = serde_yaml::from_str(&raw)
        .map_err(|e| ManifestError::Parse(path.to_path_buf(), e))?;
    validate_name(&manifest.name)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_plain_yaml_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "skill.yaml",
            "name: alice/greet\nversion: 1.0.0\ncommand: echo hello ${name}\n",
        );
        let manifest = load_dir(dir.path()).unwrap();
        assert_eq!(manifest.name, "alice/greet");
        assert_eq!(manifest.version.as_deref(), Some("1.0.0"));
        assert!(!manifest.is_instruction_tool());
    }

    #[test]
    fn attaches_markdown_doc_when_yaml_has_none() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "skill.yaml", "name: alice/greet\n");
        write_file(dir.path(), "SKILL.md", "# Greet\n\nSays hello.\n");
        let manifest = load_dir(dir.path()).unwrap();
        assert_eq!(manifest.doc.as_deref(), Some("# Greet\n\nSays hello.\n"));
    }

    #[test]
    fn markdown_only_directory_is_instruction_tool() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "SKILL.md", "# Notes\n");
        let manifest = load_dir(dir.path()).unwrap();
        assert!(manifest.is_instruction_tool());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dir(dir.path()).is_err());
    }

    #[rstest]
    #[case("30s", Duration::from_secs(30))]
    #[case("2m", Duration::from_secs(120))]
    #[case("500ms", Duration::from_millis(500))]
    #[case("1h", Duration::from_secs(3600))]
    fn parses_durations(#[case] raw: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(raw).unwrap(), expected);
    }

    #[test]
    fn rejects_malformed_duration() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("30").is_err());
    }
}
