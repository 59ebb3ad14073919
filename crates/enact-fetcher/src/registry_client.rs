use async_trait::async_trait;
use url::Url;

/// Where to download a tool bundle from and what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
    pub url: Url,
    /// Hex-encoded SHA-256, optionally prefixed with `sha256:`.
    pub hash: String,
}

/// The registry's answer to "what is the latest (or a specific)
/// version of this tool, and where do I get it".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub version: String,
    pub bundle: BundleDescriptor,
    pub yanked: bool,
}

/// Thin client over the external tool registry's HTTP protocol. The
/// protocol itself (endpoints, auth, pagination) is outside this
/// crate's concern; callers supply a concrete implementation.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn tool_info(&self, name: &str, requested_version: Option<&str>) -> anyhow::Result<ToolInfo>;

    /// Returns an address the trust verifier can use to fetch and
    /// verify `(name, version)`'s attestation bundles.
    async fn attestation_ref(&self, name: &str, version: &str) -> anyhow::Result<String>;

    /// Submits a freshly produced Sigstore bundle for `(name, version)`
    /// to the registry, completing the signing flow's publication
    /// step. The signing step itself is an external collaborator; this
    /// is only the upload. Registries that don't support signature
    /// submission can leave the default, which reports the operation
    /// as unsupported.
    async fn submit_attestation(&self, name: &str, version: &str, bundle: &[u8]) -> anyhow::Result<()> {
        let _ = (name, version, bundle);
        anyhow::bail!("this registry client does not support attestation submission")
    }
}
