//! Selects which registered execution provider handles an invocation:
//! force hints, trusted scopes, then a configured default/fallback pair,
//! falling back to the local provider as a last resort.

use crate::contract::{ErrorCode, ExecutionError, ExecutionProvider};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Caller-supplied hints that can force a specific backend, bypassing
/// the rest of the selection order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterHints {
    pub force_local: bool,
    pub force_remote: bool,
}

/// The subset of trust/execution configuration the router consults.
/// `container` here stands in for whichever container runtime the
/// registered `ContainerProvider` detects (docker/podman/nerdctl); this
/// system has no separate dagger client, so a configured default of
/// `"container"` simply asks the container provider whether it has a
/// usable runtime.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    pub default_backend: Option<String>,
    pub fallback_backend: Option<String>,
    pub trusted_scopes: Vec<String>,
}

/// Registry of named providers plus the selection config. Built once
/// per process and shared across concurrent invocations.
pub struct ExecutionRouter {
    providers: BTreeMap<String, Arc<dyn ExecutionProvider>>,
    config: RouterConfig,
}

impl ExecutionRouter {
    pub fn new(config: RouterConfig) -> Self {
        ExecutionRouter {
            providers: BTreeMap::new(),
            config,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn ExecutionProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn provider(&self, name: &str) -> Option<&Arc<dyn ExecutionProvider>> {
        self.providers.get(name)
    }

    /// Runs the selection order, short-circuiting on the first step
    /// that yields a usable provider.
    pub async fn select(
        &self,
        tool_name: &str,
        hints: RouterHints,
    ) -> Result<Arc<dyn ExecutionProvider>, ExecutionError> {
        if hints.force_local {
            if let Some(provider) = self.providers.get("local") {
                debug!(tool = tool_name, "routed by --local hint");
                return Ok(provider.clone());
            }
        }

        if hints.force_remote {
            if let Some(provider) = self.providers.get("remote") {
                if provider.is_available().await {
                    debug!(tool = tool_name, "routed by --remote hint");
                    return Ok(provider.clone());
                }
            }
        }

        if self
            .config
            .trusted_scopes
            .iter()
            .any(|pattern| scope_matches(pattern, tool_name))
        {
            if let Some(provider) = self.providers.get("local") {
                debug!(tool = tool_name, "routed local by trusted scope");
                return Ok(provider.clone());
            }
        }

        if let Some(backend) = &self.config.default_backend {
            if let Some(provider) = self.resolve_named_backend(backend).await {
                debug!(tool = tool_name, backend, "routed to default backend");
                return Ok(provider);
            }
        }

        if let Some(backend) = &self.config.fallback_backend {
            if let Some(provider) = self.resolve_named_backend(backend).await {
                debug!(tool = tool_name, backend, "default backend unavailable, routed to fallback");
                return Ok(provider);
            }
        }

        if let Some(provider) = self.providers.get("local") {
            debug!(tool = tool_name, "no backend configured or available, routed local as last resort");
            return Ok(provider.clone());
        }

        Err(ExecutionError::new(
            ErrorCode::ContainerError,
            "no execution provider available",
        ))
    }

    async fn resolve_named_backend(&self, backend: &str) -> Option<Arc<dyn ExecutionProvider>> {
        let provider = self.providers.get(backend)?;
        if provider.is_available().await {
            Some(provider.clone())
        } else {
            None
        }
    }
}

/// A trailing `/*` matches by prefix (`"@acme/*"` matches
/// `"@acme/lint"`); anything else must match exactly.
fn scope_matches(pattern: &str, tool_name: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => tool_name.starts_with(prefix) && tool_name[prefix.len()..].starts_with('/'),
        None => pattern == tool_name,
    }
}
