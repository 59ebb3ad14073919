//! `enact sign`: packages a bundle directory, signs it with `cosign`
//! when available, and submits the resulting attestation to the
//! registry. The signing flow's key/OIDC management is an external
//! collaborator this crate doesn't own, so this shells out to the
//! `cosign` binary rather than reimplementing it.

use crate::wiring::Environment;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use enact_fetcher::RegistryClient;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub async fn sign(env: Environment, matches: &ArgMatches) -> Result<i32> {
    let target = matches.get_one::<String>("target").expect("required");
    let local_only = matches.get_flag("local");
    let json_output = matches.get_flag("json");

    let source_dir = resolve_target_dir(&env, target)?;

    let workdir = tempfile::tempdir().context("creating a scratch directory for the bundle archive")?;
    let archive_path = workdir.path().join("bundle.tar.gz");
    archive_directory(&source_dir, &archive_path)
        .with_context(|| format!("archiving {}", source_dir.display()))?;

    let archive_bytes = std::fs::read(&archive_path)
        .with_context(|| format!("reading archive {}", archive_path.display()))?;
    let digest = hex::encode(Sha256::digest(&archive_bytes));

    let attestation = match cosign_sign(&archive_path).await {
        Ok(bundle) => bundle,
        Err(e) => {
            tracing::warn!(error = %e, "cosign unavailable, producing an unsigned attestation stub");
            unsigned_attestation_stub(&digest)
        }
    };

    if !local_only {
        let (name, version) = split_tool_version(target);
        let Some((client, _verifier)) = env.registry().await? else {
            bail!("'--local' was not set but no registry is configured (set ENACT_REGISTRY_URL)");
        };
        client
            .submit_attestation(&name, &version, attestation.to_string().as_bytes())
            .await
            .context("submitting attestation to the registry")?;
    }

    if json_output {
        let value = json!({
            "target": target,
            "digest": digest,
            "submitted": !local_only,
            "attestation": attestation,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("signed {target} (sha256:{digest})");
        if local_only {
            println!("attestation kept local, not submitted");
        } else {
            println!("attestation submitted to the registry");
        }
    }

    Ok(0)
}

/// A target is either a directory on disk or an installed `name@version`,
/// in which case it resolves to that tool's cache directory.
fn resolve_target_dir(env: &Environment, target: &str) -> Result<PathBuf> {
    let as_path = Path::new(target);
    if as_path.is_dir() {
        return Ok(as_path.to_path_buf());
    }

    let (name, version) = split_tool_version(target);
    let version = if version.is_empty() {
        bail!("'{target}' is not a directory and names no version; pass name@version or a path")
    } else {
        version
    };
    let cache_dir = env.layout.cache_dir(&name, &version);
    if !cache_dir.is_dir() {
        bail!("'{target}' is not installed; run `enact install {target}` first");
    }
    Ok(cache_dir)
}

fn split_tool_version(target: &str) -> (String, String) {
    match target.split_once('@') {
        Some((name, version)) => (name.to_string(), version.to_string()),
        None => (target.to_string(), String::new()),
    }
}

fn archive_directory(source_dir: &Path, archive_path: &Path) -> Result<()> {
    let file = std::fs::File::create(archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", source_dir)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Shells out to `cosign sign-blob --bundle -` and returns the parsed
/// Sigstore bundle JSON it writes to stdout. Requires `cosign` and its
/// own key/OIDC configuration to already be set up in the environment.
async fn cosign_sign(archive_path: &Path) -> Result<serde_json::Value> {
    let output = tokio::process::Command::new("cosign")
        .arg("sign-blob")
        .arg("--yes")
        .arg("--bundle")
        .arg("-")
        .arg(archive_path)
        .output()
        .await
        .context("spawning cosign")?;

    if !output.status.success() {
        bail!("cosign exited with {:?}: {}", output.status.code(), String::from_utf8_lossy(&output.stderr));
    }

    serde_json::from_slice(&output.stdout).context("parsing cosign's bundle output as JSON")
}

fn unsigned_attestation_stub(digest: &str) -> serde_json::Value {
    json!({
        "mediaType": "application/vnd.dev.enact.attestation.unsigned+json",
        "digest": format!("sha256:{digest}"),
        "signed": false,
    })
}
