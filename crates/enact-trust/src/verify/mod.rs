use crate::config::TrustConfig;
use sigstore::cosign::{signature_layers::SignatureLayer, ClientBuilder, CosignCapabilities};
use sigstore::registry::oci_reference::OciReference;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub mod errors;

pub use errors::{VerifyError, VerifyResult};

/// Verifies Sigstore attestation bundles for a tool and extracts the
/// provider-qualified identities that signed them.
///
/// Wraps a `sigstore::cosign::Client` built against the public-good
/// Fulcio/Rekor trust root, using the same triangulate-then-fetch-
/// trusted-layers pipeline cosign uses to verify container image
/// signatures, applied here to attestation bundles addressed by an
/// OCI-compatible reference.
#[derive(Clone)]
pub struct Verifier {
    cosign_client: Arc<Mutex<sigstore::cosign::Client>>,
}

impl Verifier {
    /// Builds a verifier against an already-fetched Sigstore TUF trust
    /// root (Fulcio certs + Rekor public key).
    pub fn new(repo: &sigstore::tuf::SigstoreRepository) -> VerifyResult<Self> {
        let cosign_client = ClientBuilder::default()
            .with_rekor_pub_key(repo.rekor_pub_key())
            .with_fulcio_certs(repo.fulcio_certs())
            .enable_registry_caching()
            .build()
            .map_err(VerifyError::ClientBuildError)?;
        Ok(Verifier {
            cosign_client: Arc::new(Mutex::new(cosign_client)),
        })
    }

    /// Fetches and validates every attestation bundle published for
    /// `attestation_ref`, returning the set of verified
    /// `provider:identity` strings whose statement subject digest binds
    /// to `expected_hash` (the registry-advertised bundle hash, with or
    /// without a `sha256:` prefix). Never trusts the registry's own
    /// "verified" flag: certificate chain, transparency-log inclusion
    /// and statement-signature checks all happen inside
    /// `trusted_signature_layers`; the subject-digest comparison here is
    /// the last binding step, since a cryptographically valid
    /// attestation over the *wrong* artifact must not count.
    ///
    /// An attestation-free or digest-mismatched result is not itself an
    /// error: it simply yields an empty identity set, leaving
    /// [`evaluate_gate`] to decide whether that's acceptable under the
    /// configured policy (`allow`, or `minimum_attestations = 0`, both
    /// proceed with zero identities).
    pub async fn verify_attestations(
        &self,
        attestation_ref: &str,
        expected_hash: &str,
    ) -> VerifyResult<Vec<String>> {
        let image_ref = OciReference::from_str(attestation_ref)
            .map_err(|_| VerifyError::InvalidReference(attestation_ref.to_string()))?;
        let expected_hash = normalize_digest(expected_hash);

        let mut client = self.cosign_client.lock().await;
        let auth = sigstore::registry::Auth::Anonymous;
        let (source_digest, signature_image) = client
            .triangulate(&image_ref, &auth)
            .await
            .map_err(VerifyError::FetchError)?;
        let layers = client
            .trusted_signature_layers(&auth, &source_digest, &signature_image)
            .await
            .map_err(VerifyError::FetchError)?;
        drop(client);

        let identities: Vec<String> = layers
            .iter()
            .filter(|layer| subject_digest_matches(layer, &expected_hash))
            .filter_map(extract_identity)
            .collect();
        debug!(attestation_ref, count = identities.len(), "attestations verified");
        Ok(identities)
    }
}

/// Strips a tolerated `sha256:` prefix and lowercases, so a digest can
/// be compared regardless of which side carries the prefix.
fn normalize_digest(digest: &str) -> String {
    digest.strip_prefix("sha256:").unwrap_or(digest).to_lowercase()
}

/// True iff `layer`'s signed statement binds to `expected_hash`: the
/// subject-digest check spec.md calls the "Attestation binding"
/// invariant. A layer whose statement digest doesn't match is not a
/// valid attestation for this bundle, however well-formed its
/// signature is.
fn subject_digest_matches(layer: &SignatureLayer, expected_hash: &str) -> bool {
    let subject_digest = normalize_digest(&layer.simple_signing.critical.image.docker_manifest_digest);
    subject_digest == expected_hash
}

/// Fetches the default public-good Sigstore TUF trust root. Blocking,
/// per sigstore-rs's own constraint that TUF repository fetches cannot
/// run inside an async context; callers invoke this via
/// `tokio::task::spawn_blocking`.
pub fn fetch_trust_root() -> VerifyResult<sigstore::tuf::SigstoreRepository> {
    sigstore::tuf::SigstoreRepository::fetch(None).map_err(VerifyError::ClientBuildError)
}

/// How the trust gate resolved for one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RequiresPrompt,
    Deny,
}

/// Applies the trust policy gate: counts how many of `identities` are
/// in `trusted_identities`, then compares against
/// `minimum_attestations` per the configured policy.
pub fn evaluate_gate(config: &TrustConfig, identities: &[String]) -> GateDecision {
    if config.always_satisfied() {
        return GateDecision::Allow;
    }
    let verified: HashSet<&str> = identities
        .iter()
        .map(String::as_str)
        .filter(|id| config.trusted_identities.contains(*id))
        .collect();
    let n = verified.len() as u32;
    if n >= config.minimum_attestations {
        return GateDecision::Allow;
    }
    match config.policy {
        crate::config::Policy::RequireAttestation => GateDecision::Deny,
        crate::config::Policy::Prompt => GateDecision::RequiresPrompt,
        crate::config::Policy::Allow => GateDecision::Allow,
    }
}

/// Maps a verified signature layer's issuer + certificate subject to a
/// `provider:identity` string per the spec's Sigstore OIDC claim
/// mapping. Layers with no certificate (pure key-based signatures)
/// yield no identity.
fn extract_identity(layer: &SignatureLayer) -> Option<String> {
    let cert = layer.certificate_signature.as_ref()?;
    let issuer = cert.issuer.as_deref().unwrap_or_default();
    let subject = subject_string(&cert.subject);

    if issuer.contains("github.com") || issuer.contains("actions.githubusercontent.com") {
        let login = subject.split('@').next().unwrap_or(&subject);
        return Some(format!("github:{login}"));
    }
    if issuer.contains("accounts.google.com") {
        return Some(format!("google:{subject}"));
    }
    if issuer.is_empty() {
        warn!("signature layer has no issuer; cannot classify identity");
        return None;
    }
    let provider = issuer
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(issuer);
    Some(format!("{provider}:{subject}"))
}

fn subject_string(subject: &sigstore::cosign::signature_layers::CertificateSubject) -> String {
    use sigstore::cosign::signature_layers::CertificateSubject;
    match subject {
        CertificateSubject::Email(email) => email.clone(),
        CertificateSubject::Uri(uri) => uri.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use sigstore::cosign::payload::simple_signing::SimpleSigning;
    use sigstore::cosign::signature_layers::{CertificateSignature, CertificateSubject};

    const TEST_DIGEST: &str = "sha256:0000000000000000000000000000000000000000000000000000000000000";

    fn layer_with(issuer: &str, subject: &str) -> SignatureLayer {
        layer_with_digest(issuer, subject, TEST_DIGEST)
    }

    fn layer_with_digest(issuer: &str, subject: &str, digest: &str) -> SignatureLayer {
        let pub_key = r#"-----BEGIN PUBLIC KEY-----
MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAELKhD7F5OKy77Z582Y6h0u1J3GNA+
kvUsh4eKpd1lwkDAzfFDs7yXEExsEkPPuiQJBelDT68n7PDIWB/QEY7mrA==
-----END PUBLIC KEY-----"#;
        let verification_key =
            sigstore::crypto::CosignVerificationKey::try_from_pem(pub_key.as_bytes())
                .expect("valid test key");
        let raw_data = format!(
            r#"{{"critical":{{"identity":{{"docker-reference":"registry.example/acme/lint"}},"image":{{"docker-manifest-digest":"{digest}"}},"type":"cosign container image signature"}},"optional":null}}"#
        )
        .into_bytes();
        let simple_signing: SimpleSigning =
            serde_json::from_slice(&raw_data).expect("valid simple signing payload");

        SignatureLayer {
            simple_signing,
            oci_digest: digest.to_string(),
            certificate_signature: Some(CertificateSignature {
                verification_key,
                issuer: Some(issuer.to_string()),
                subject: CertificateSubject::Email(subject.to_string()),
                github_workflow_trigger: None,
                github_workflow_sha: None,
                github_workflow_name: None,
                github_workflow_repository: None,
                github_workflow_ref: None,
            }),
            bundle: None,
            signature: Some("deadbeef".to_string()),
            raw_data,
        }
    }

    #[test]
    fn extracts_github_identity_from_oauth_issuer() {
        let layer = layer_with("https://github.com/login/oauth", "alice@example.com");
        assert_eq!(extract_identity(&layer).as_deref(), Some("github:alice"));
    }

    #[test]
    fn extracts_google_identity() {
        let layer = layer_with("https://accounts.google.com", "alice@gmail.com");
        assert_eq!(
            extract_identity(&layer).as_deref(),
            Some("google:alice@gmail.com")
        );
    }

    #[test]
    fn extracts_generic_provider_identity() {
        let layer = layer_with("https://gitlab.com/oauth", "alice@example.com");
        assert_eq!(
            extract_identity(&layer).as_deref(),
            Some("gitlab.com:alice@example.com")
        );
    }

    #[test]
    fn subject_digest_matches_regardless_of_prefix_or_case() {
        let layer = layer_with_digest("https://github.com/login/oauth", "alice@example.com", TEST_DIGEST);
        assert!(subject_digest_matches(&layer, &TEST_DIGEST.trim_start_matches("sha256:").to_lowercase()));
        assert!(subject_digest_matches(
            &layer,
            &TEST_DIGEST.trim_start_matches("sha256:").to_uppercase()
        ));
    }

    #[test]
    fn subject_digest_mismatch_is_rejected() {
        let layer = layer_with_digest("https://github.com/login/oauth", "alice@example.com", TEST_DIGEST);
        assert!(!subject_digest_matches(&layer, "deadbeef"));
    }

    #[test]
    fn gate_allows_when_quorum_met() {
        let config = TrustConfig {
            policy: Policy::RequireAttestation,
            minimum_attestations: 1,
            trusted_identities: ["github:alice".to_string()].into_iter().collect(),
            trusted_scopes: vec![],
        };
        let decision = evaluate_gate(&config, &["github:alice".to_string()]);
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn gate_denies_under_require_attestation_when_quorum_unmet() {
        let config = TrustConfig {
            policy: Policy::RequireAttestation,
            minimum_attestations: 2,
            trusted_identities: ["github:alice".to_string()].into_iter().collect(),
            trusted_scopes: vec![],
        };
        let decision = evaluate_gate(&config, &["github:alice".to_string()]);
        assert_eq!(decision, GateDecision::Deny);
    }

    #[test]
    fn gate_prompts_under_prompt_policy_when_quorum_unmet() {
        let config = TrustConfig {
            policy: Policy::Prompt,
            minimum_attestations: 2,
            trusted_identities: ["github:alice".to_string()].into_iter().collect(),
            trusted_scopes: vec![],
        };
        let decision = evaluate_gate(&config, &["github:alice".to_string()]);
        assert_eq!(decision, GateDecision::RequiresPrompt);
    }

    #[test]
    fn gate_allows_under_allow_policy_regardless_of_quorum() {
        let config = TrustConfig {
            policy: Policy::Allow,
            minimum_attestations: 5,
            trusted_identities: HashSet::new(),
            trusted_scopes: vec![],
        };
        let decision = evaluate_gate(&config, &[]);
        assert_eq!(decision, GateDecision::Allow);
    }

    #[test]
    fn zero_minimum_attestations_allows_with_no_identities() {
        let config = TrustConfig {
            policy: Policy::RequireAttestation,
            minimum_attestations: 0,
            trusted_identities: HashSet::new(),
            trusted_scopes: vec![],
        };
        let decision = evaluate_gate(&config, &[]);
        assert_eq!(decision, GateDecision::Allow);
    }
}
