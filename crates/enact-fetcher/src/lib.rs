//! Content-addressed tool bundle fetcher: resolve destination, run the
//! trust gate (`enact_trust`) before any bytes are downloaded, stream
//! the gzipped tarball to a temp file under a SHA-256 hash binding,
//! extract it with the system `tar` binary, and persist the cache
//! registry update atomically.

mod errors;
mod hash;
mod registry_client;

pub use errors::{FetchError, FetchResult};
pub use registry_client::{BundleDescriptor, RegistryClient, ToolInfo};

use enact_store::Layout;
use enact_trust::{evaluate_gate, GateDecision, TrustConfig, Verifier};
use futures_util::StreamExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// The on-disk marker recording which bundle hash a cache directory was
/// extracted from, so a later fetch can confirm the cache is still
/// valid without re-downloading.
const HASH_MARKER_FILE: &str = ".enact-bundle-hash";

/// A non-fatal condition surfaced alongside a successful fetch.
/// `Serialize` lets the CLI embed it directly in its `--json` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    YankedVersion { name: String, version: String },
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Suppresses the yanked-version warning; the caller has already
    /// surfaced and accepted it.
    pub acknowledge_yanked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub path: PathBuf,
    pub version: String,
    pub cached: bool,
    pub warnings: Vec<Warning>,
}

/// Resolves, trust-gates, downloads and extracts a tool bundle, then
/// updates `registry_path`'s `tools.json` to point at the new version.
///
/// Steps 2-6 of the pipeline are safe to retry: a half-populated cache
/// directory from an interrupted previous attempt is never considered
/// valid, and a successful extraction is the only terminal state.
pub async fn fetch_bundle(
    registry: &dyn RegistryClient,
    verifier: &Verifier,
    trust_config: &TrustConfig,
    layout: &Layout,
    registry_path: &Path,
    name: &str,
    requested_version: Option<&str>,
    options: &FetchOptions,
) -> FetchResult<FetchOutcome> {
    let info = registry.tool_info(name, requested_version).await?;

    let mut warnings = Vec::new();
    if info.yanked && !options.acknowledge_yanked {
        warnings.push(Warning::YankedVersion {
            name: name.to_string(),
            version: info.version.clone(),
        });
    }

    let cache_dir = layout.cache_dir(name, &info.version);
    let expected_hash = hash::normalize(&info.bundle.hash);

    if cache_dir.is_dir() && cached_hash_matches(&cache_dir, &expected_hash) {
        debug!(name, version = %info.version, "bundle already cached");
        record_install(registry_path, name, &info.version)?;
        return Ok(FetchOutcome {
            path: cache_dir,
            version: info.version,
            cached: true,
            warnings,
        });
    }

    let attestation_ref = registry.attestation_ref(name, &info.version).await?;
    let identities = verifier
        .verify_attestations(&attestation_ref, &expected_hash)
        .await?;
    match evaluate_gate(trust_config, &identities) {
        GateDecision::Allow => {}
        GateDecision::Deny => {
            return Err(FetchError::TrustDenied {
                name: name.to_string(),
                minimum: trust_config.minimum_attestations,
            })
        }
        GateDecision::RequiresPrompt => {
            return Err(FetchError::TrustPromptRequired(name.to_string()))
        }
    }

    layout.ensure_cache_root()?;
    let tool_cache_root = layout.cache_root().join(name);
    tokio::fs::create_dir_all(&tool_cache_root)
        .await
        .map_err(|e| FetchError::Io(tool_cache_root.clone(), e))?;
    let tmp_archive = tool_cache_root.join(format!("v{}.tar.gz.tmp", info.version));

    download_and_verify(&info.bundle.url, &tmp_archive, &expected_hash).await?;

    if cache_dir.exists() {
        let _ = tokio::fs::remove_dir_all(&cache_dir).await;
    }
    tokio::fs::create_dir_all(&cache_dir)
        .await
        .map_err(|e| FetchError::Io(cache_dir.clone(), e))?;

    let extraction = extract_tarball(&tmp_archive, &cache_dir).await;
    let _ = tokio::fs::remove_file(&tmp_archive).await;
    extraction?;

    tokio::fs::write(cache_dir.join(HASH_MARKER_FILE), &expected_hash)
        .await
        .map_err(|e| FetchError::Io(cache_dir.clone(), e))?;

    record_install(registry_path, name, &info.version)?;

    info!(name, version = %info.version, "bundle fetched and extracted");
    Ok(FetchOutcome {
        path: cache_dir,
        version: info.version,
        cached: false,
        warnings,
    })
}

fn cached_hash_matches(cache_dir: &Path, expected: &str) -> bool {
    std::fs::read_to_string(cache_dir.join(HASH_MARKER_FILE))
        .map(|recorded| recorded.trim() == expected)
        .unwrap_or(false)
}

fn record_install(registry_path: &Path, name: &str, version: &str) -> FetchResult<()> {
    enact_store::with_exclusive_lock(
        registry_path,
        std::time::Duration::from_secs(10),
        |registry| {
            registry.install(name, version);
            Ok(())
        },
    )
    .map_err(FetchError::Store)
}

async fn download_and_verify(url: &url::Url, tmp_path: &Path, expected_hash: &str) -> FetchResult<()> {
    let response = reqwest::get(url.clone())
        .await
        .map_err(|e| FetchError::Download(url.to_string(), e))?
        .error_for_status()
        .map_err(|e| FetchError::Download(url.to_string(), e))?;

    let mut file = tokio::fs::File::create(tmp_path)
        .await
        .map_err(|e| FetchError::Io(tmp_path.to_path_buf(), e))?;
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::Download(url.to_string(), e))?;
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::Io(tmp_path.to_path_buf(), e))?;
    }
    file.flush().await.map_err(|e| FetchError::Io(tmp_path.to_path_buf(), e))?;
    drop(file);

    let actual = hash::hex_digest(hasher);
    if actual != expected_hash {
        let _ = tokio::fs::remove_file(tmp_path).await;
        warn!(expected = expected_hash, actual = %actual, "bundle hash mismatch");
        return Err(FetchError::HashMismatch {
            expected: expected_hash.to_string(),
            actual,
        });
    }
    Ok(())
}

async fn extract_tarball(archive: &Path, destination: &Path) -> FetchResult<()> {
    let status = tokio::process::Command::new("tar")
        .arg("xzf")
        .arg(archive)
        .arg("-C")
        .arg(destination)
        .status()
        .await
        .map_err(|e| FetchError::Io(archive.to_path_buf(), e))?;

    if !status.success() {
        let _ = tokio::fs::remove_dir_all(destination).await;
        return Err(FetchError::ExtractFailed(destination.to_path_buf(), status.code()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubRegistry {
        calls: Arc<AtomicUsize>,
        yanked: bool,
    }

    #[async_trait]
    impl RegistryClient for StubRegistry {
        async fn tool_info(&self, _name: &str, _version: Option<&str>) -> anyhow::Result<ToolInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolInfo {
                version: "1.0.0".to_string(),
                bundle: BundleDescriptor {
                    url: url::Url::parse("https://example.invalid/bundle.tar.gz").unwrap(),
                    hash: "sha256:deadbeef".to_string(),
                },
                yanked: self.yanked,
            })
        }

        async fn attestation_ref(&self, name: &str, version: &str) -> anyhow::Result<String> {
            Ok(format!("registry.example/{name}:{version}"))
        }
    }

    #[test]
    fn cache_hit_skips_download_when_hash_marker_matches() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().to_path_buf());
        let cache_dir = layout.cache_dir("acme/lint", "1.0.0");
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join(HASH_MARKER_FILE), "deadbeef").unwrap();
        assert!(cached_hash_matches(&cache_dir, "deadbeef"));
        assert!(!cached_hash_matches(&cache_dir, "other"));
    }

    #[test]
    fn missing_cache_marker_is_not_a_match() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().to_path_buf());
        let cache_dir = layout.cache_dir("acme/lint", "1.0.0");
        std::fs::create_dir_all(&cache_dir).unwrap();
        assert!(!cached_hash_matches(&cache_dir, "deadbeef"));
    }
}
