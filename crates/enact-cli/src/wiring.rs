//! Assembles the long-lived, shared-across-invocations pieces the
//! controller needs: layout, trust config, execution router (with
//! every available provider registered), and — only when a registry
//! URL is actually configured — a registry client plus the Sigstore
//! verifier it needs to fetch a not-yet-cached tool. Composes these
//! once, up front, rather than re-deriving them in every command
//! handler.

use crate::registry_client::HttpRegistryClient;
use anyhow::{Context, Result};
use enact_core::{EnvOverrides, ExecutionConfig};
use enact_exec::{ContainerProvider, ExecutionRouter, LocalProvider, RemoteProvider, RouterConfig};
use enact_fetcher::RegistryClient;
use enact_store::Layout;
use enact_trust::{TrustConfig, Verifier};
use std::sync::Arc;
use url::Url;

pub struct Environment {
    pub layout: Layout,
    pub trust_config: TrustConfig,
    pub exec_config: ExecutionConfig,
    pub env: EnvOverrides,
    pub router: ExecutionRouter,
}

impl Environment {
    pub fn load() -> Result<Self> {
        let layout = Layout::from_env().context("resolving the enact home directory")?;
        let env = EnvOverrides::from_env();

        let trust_config = enact_trust::config::load(&layout.config_path())
            .context("loading config.yaml's trust policy")?;
        let trust_config = env.apply_to_trust(trust_config);

        let exec_config = enact_core::config::load_execution_config(&layout.config_path())
            .context("loading config.yaml's execution policy")?;

        let router_config = RouterConfig {
            default_backend: exec_config.default_backend.clone(),
            fallback_backend: exec_config.fallback_backend.clone(),
            trusted_scopes: trust_config.trusted_scopes.clone(),
        };
        let mut router = ExecutionRouter::new(router_config);
        router.register(Arc::new(LocalProvider));
        router.register(Arc::new(ContainerProvider::new()));
        if let Some(endpoint) = &exec_config.remote_endpoint {
            router.register(Arc::new(RemoteProvider::new(endpoint.clone(), exec_config.remote_token.clone())));
        }

        Ok(Environment {
            layout,
            trust_config,
            exec_config,
            env,
            router,
        })
    }

    /// Builds a registry client and verifier, only when the caller has
    /// actually configured a registry URL (`ENACT_REGISTRY_URL` or
    /// `config.yaml`'s `registry_url`). Constructing a [`Verifier`]
    /// fetches the Sigstore TUF trust root over the network, so this
    /// is deliberately skipped for purely local/offline invocations.
    pub async fn registry(&self) -> Result<Option<(Arc<dyn RegistryClient>, Verifier)>> {
        let Some(registry_url) = &self.env.registry_url else {
            return Ok(None);
        };
        let base_url = Url::parse(registry_url).context("parsing ENACT_REGISTRY_URL")?;
        let oci_registry = self
            .exec_config
            .oci_registry
            .clone()
            .unwrap_or_else(|| base_url.host_str().unwrap_or("registry.enact.invalid").to_string());
        let client = HttpRegistryClient::new(base_url, oci_registry, self.env.auth_token.clone())?;

        let repo = tokio::task::spawn_blocking(enact_trust::fetch_trust_root)
            .await
            .context("sigstore trust root fetch task panicked")??;
        let verifier = Verifier::new(&repo)?;

        Ok(Some((Arc::new(client), verifier)))
    }
}
