use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// The local rule governing whether an unverified or under-verified
/// tool may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    RequireAttestation,
    Prompt,
    Allow,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::RequireAttestation
    }
}

/// The local policy governing tool execution trust, loaded once per run
/// and passed by value into the controller: trust settings cannot be
/// mutated mid-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustConfig {
    pub policy: Policy,
    pub minimum_attestations: u32,
    pub trusted_identities: HashSet<String>,
    pub trusted_scopes: Vec<String>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        TrustConfig {
            policy: Policy::RequireAttestation,
            minimum_attestations: 1,
            trusted_identities: HashSet::new(),
            trusted_scopes: Vec::new(),
        }
    }
}

impl TrustConfig {
    /// `minimum_attestations = 0` always satisfies the gate, regardless
    /// of policy.
    pub fn always_satisfied(&self) -> bool {
        self.minimum_attestations == 0
    }

    /// Matches `name` against `trusted_scopes`: a `@acme/*` pattern is a
    /// prefix match on `@acme/`; any other pattern is an exact match.
    pub fn matches_trusted_scope(&self, name: &str) -> bool {
        self.trusted_scopes.iter().any(|pattern| {
            if let Some(prefix) = pattern.strip_suffix("/*") {
                name.starts_with(prefix) && name[prefix.len()..].starts_with('/')
            } else {
                name == pattern
            }
        })
    }
}

/// On-disk shape of `config.yaml`'s trust section, including the two
/// legacy fields the spec requires normalizing at load time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawTrustConfig {
    policy: Option<Policy>,
    minimum_attestations: Option<u32>,
    trusted_identities: Vec<String>,
    trusted_scopes: Vec<String>,
    /// Legacy: `true` maps to `require_attestation`, `false` to `allow`.
    require_signatures: Option<bool>,
    /// Legacy: merged into `trusted_identities` without duplicates.
    trusted_publishers: Vec<String>,
}

impl From<RawTrustConfig> for TrustConfig {
    fn from(raw: RawTrustConfig) -> Self {
        let policy = match (raw.policy, raw.require_signatures) {
            (Some(policy), _) => policy,
            (None, Some(true)) => Policy::RequireAttestation,
            (None, Some(false)) => Policy::Allow,
            (None, None) => Policy::RequireAttestation,
        };

        let mut trusted_identities: HashSet<String> = raw.trusted_identities.into_iter().collect();
        trusted_identities.extend(raw.trusted_publishers);

        TrustConfig {
            policy,
            minimum_attestations: raw.minimum_attestations.unwrap_or(1),
            trusted_identities,
            trusted_scopes: raw.trusted_scopes,
        }
    }
}

/// Loads and normalizes `config.yaml`'s trust section. Returns the
/// documented defaults when the file does not exist.
pub fn load(path: &Path) -> ConfigResult<TrustConfig> {
    if !path.exists() {
        return Ok(TrustConfig::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let parsed: RawTrustConfig =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = TrustConfig::default();
        assert_eq!(config.policy, Policy::RequireAttestation);
        assert_eq!(config.minimum_attestations, 1);
        assert!(config.trusted_identities.is_empty());
        assert!(config.trusted_scopes.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, TrustConfig::default());
    }

    #[test]
    fn legacy_require_signatures_true_maps_to_require_attestation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "require_signatures: true\n").unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.policy, Policy::RequireAttestation);
    }

    #[test]
    fn legacy_require_signatures_false_maps_to_allow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "require_signatures: false\n").unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.policy, Policy::Allow);
    }

    #[test]
    fn legacy_trusted_publishers_merge_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "trusted_identities: [\"github:alice\"]\ntrusted_publishers: [\"github:alice\", \"github:bob\"]\n",
        )
        .unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.trusted_identities.len(), 2);
        assert!(config.trusted_identities.contains("github:bob"));
    }

    #[test]
    fn zero_minimum_attestations_always_satisfies() {
        let config = TrustConfig {
            minimum_attestations: 0,
            ..TrustConfig::default()
        };
        assert!(config.always_satisfied());
    }

    #[test]
    fn trusted_scope_glob_matches_prefix() {
        let config = TrustConfig {
            trusted_scopes: vec!["@acme/*".to_string()],
            ..TrustConfig::default()
        };
        assert!(config.matches_trusted_scope("@acme/lint"));
        assert!(!config.matches_trusted_scope("@acme-other/lint"));
        assert!(!config.matches_trusted_scope("@other/lint"));
    }

    #[test]
    fn trusted_scope_exact_match_without_wildcard() {
        let config = TrustConfig {
            trusted_scopes: vec!["acme/lint".to_string()],
            ..TrustConfig::default()
        };
        assert!(config.matches_trusted_scope("acme/lint"));
        assert!(!config.matches_trusted_scope("acme/lint2"));
    }
}
