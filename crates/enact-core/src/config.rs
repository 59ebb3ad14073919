//! Execution-level settings layered on top of `enact-trust::config`'s
//! trust policy: the router's default/fallback backend names, and the
//! recognized environment variables (registry URL override, auth
//! token, a CI/non-interactive indicator, a trust-policy override).

use crate::errors::{CoreError, CoreResult};
use enact_trust::Policy;
use serde::Deserialize;
use std::path::Path;

/// The execution-specific slice of `config.yaml`. Loaded independently
/// of `enact_trust::config::load`, which reads the same file for its
/// own (unrelated) fields — each loader ignores keys it doesn't know
/// about, so neither needs the other to agree on one schema.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub default_backend: Option<String>,
    pub fallback_backend: Option<String>,
    /// `<endpoint>/execute` and `<endpoint>/health` base address for the
    /// remote execution provider. Absent means the `remote` backend is
    /// never registered.
    pub remote_endpoint: Option<String>,
    /// Bearer token sent with every remote provider request, if set.
    pub remote_token: Option<String>,
    /// OCI registry host tools' attestations are published under, used
    /// to build the `attestation_ref` the Sigstore verifier checks.
    /// Defaults to the tool registry's own host when unset.
    pub oci_registry: Option<String>,
}

/// Loads `config.yaml`'s execution section, returning defaults (no
/// configured backend preference) when the file is absent.
pub fn load_execution_config(path: &Path) -> CoreResult<ExecutionConfig> {
    if !path.exists() {
        return Ok(ExecutionConfig::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| CoreError::Io(path.to_path_buf(), e))?;
    serde_yaml::from_str(&raw).map_err(|e| CoreError::ConfigParse(path.to_path_buf(), e))
}

/// The environment variables enact recognizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub registry_url: Option<String>,
    pub auth_token: Option<String>,
    pub ci: bool,
    pub trust_policy: Option<Policy>,
}

impl EnvOverrides {
    /// Reads `ENACT_REGISTRY_URL`, `ENACT_AUTH_TOKEN`, `CI`, and
    /// `ENACT_TRUST_POLICY` from the process environment.
    pub fn from_env() -> Self {
        EnvOverrides {
            registry_url: non_empty_env("ENACT_REGISTRY_URL"),
            auth_token: non_empty_env("ENACT_AUTH_TOKEN"),
            ci: non_empty_env("CI").is_some(),
            trust_policy: non_empty_env("ENACT_TRUST_POLICY").and_then(|v| parse_policy(&v)),
        }
    }

    /// Applies the trust-policy override, if any, to an already-loaded
    /// trust config.
    pub fn apply_to_trust(&self, mut trust: enact_trust::TrustConfig) -> enact_trust::TrustConfig {
        if let Some(policy) = self.trust_policy {
            trust.policy = policy;
        }
        trust
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_policy(raw: &str) -> Option<Policy> {
    match raw.to_ascii_lowercase().replace('-', "_").as_str() {
        "require_attestation" => Some(Policy::RequireAttestation),
        "prompt" => Some(Policy::Prompt),
        "allow" => Some(Policy::Allow),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default_execution_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_execution_config(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, ExecutionConfig::default());
    }

    #[test]
    fn loads_default_and_fallback_backend_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "default_backend: container\nfallback_backend: local\n").unwrap();
        let config = load_execution_config(&path).unwrap();
        assert_eq!(config.default_backend.as_deref(), Some("container"));
        assert_eq!(config.fallback_backend.as_deref(), Some("local"));
    }

    #[test]
    fn unrelated_trust_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "policy: allow\ndefault_backend: local\n").unwrap();
        let config = load_execution_config(&path).unwrap();
        assert_eq!(config.default_backend.as_deref(), Some("local"));
    }

    #[test]
    fn trust_policy_env_var_parses_case_and_dash_insensitively() {
        assert_eq!(parse_policy("Require-Attestation"), Some(Policy::RequireAttestation));
        assert_eq!(parse_policy("ALLOW"), Some(Policy::Allow));
        assert_eq!(parse_policy("nonsense"), None);
    }
}
