//! A thin `reqwest`-based [`RegistryClient`] wiring the registry's wire
//! protocol to the trait `enact-fetcher` depends on. The registry's
//! exact request/response schema is an external collaborator this
//! crate doesn't own, so this implementation assumes the minimal REST
//! surface a tool registry needs: a tool-info lookup and an OCI host
//! attestations are published under.

use async_trait::async_trait;
use enact_fetcher::{BundleDescriptor, RegistryClient, ToolInfo};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct WireBundle {
    url: String,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct WireToolInfo {
    version: String,
    bundle: WireBundle,
    #[serde(default)]
    yanked: bool,
}

/// HTTP client over `<base_url>/tools/<name>`. `oci_registry` names the
/// OCI host tool attestations are published under — a cosign-signed
/// attestation lives in an OCI registry, not behind the tool registry's
/// own REST API, so the two hosts are configured independently.
pub struct HttpRegistryClient {
    base_url: Url,
    oci_registry: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(base_url: Url, oci_registry: impl Into<String>, auth_token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(HttpRegistryClient {
            base_url,
            oci_registry: oci_registry.into(),
            auth_token,
            client,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn tool_info(&self, name: &str, requested_version: Option<&str>) -> anyhow::Result<ToolInfo> {
        let mut url = self.base_url.join(&format!("tools/{name}"))?;
        if let Some(version) = requested_version {
            url.query_pairs_mut().append_pair("version", version);
        }
        let request = self.authorize(self.client.get(url.clone()));
        let response = request.send().await?.error_for_status()?;
        let wire: WireToolInfo = response.json().await?;

        Ok(ToolInfo {
            version: wire.version,
            bundle: BundleDescriptor {
                url: Url::parse(&wire.bundle.url)?,
                hash: wire.bundle.hash,
            },
            yanked: wire.yanked,
        })
    }

    async fn attestation_ref(&self, name: &str, version: &str) -> anyhow::Result<String> {
        Ok(format!("{}/{name}:{version}", self.oci_registry.trim_end_matches('/')))
    }

    async fn submit_attestation(&self, name: &str, version: &str, bundle: &[u8]) -> anyhow::Result<()> {
        let url = self.base_url.join(&format!("tools/{name}/{version}/attestations"))?;
        let request = self
            .authorize(self.client.post(url))
            .header("content-type", "application/vnd.dev.sigstore.bundle+json")
            .body(bundle.to_vec());
        request.send().await?.error_for_status()?;
        Ok(())
    }
}
