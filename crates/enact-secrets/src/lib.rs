//! Secret broker: resolves named secrets for a tool by walking up its
//! namespace chain through the OS credential store.
//!
//! Values are never logged. Verbose callers get only the secret name
//! and the namespace in which it was found.

mod namespace;
mod store;

pub use namespace::{derive_namespace, namespace_chain};
pub use store::{KeyringStore, SecretStore};

use std::collections::BTreeMap;
use tracing::debug;

/// Resolves secrets for one tool invocation against the OS keychain,
/// under a fixed service name shared by every lookup.
pub struct SecretBroker<S: SecretStore = KeyringStore> {
    service: String,
    store: S,
}

impl SecretBroker<KeyringStore> {
    pub fn new(service: impl Into<String>) -> Self {
        SecretBroker {
            service: service.into(),
            store: KeyringStore,
        }
    }
}

impl<S: SecretStore> SecretBroker<S> {
    pub fn with_store(service: impl Into<String>, store: S) -> Self {
        SecretBroker {
            service: service.into(),
            store,
        }
    }

    /// Resolves `secret_names` for `tool_name`. Missing secrets are
    /// simply absent from the returned map; whether that absence is
    /// fatal is the caller's decision.
    pub fn resolve(&self, tool_name: &str, secret_names: &[String]) -> BTreeMap<String, String> {
        let chain = namespace_chain(&derive_namespace(tool_name));
        let mut resolved = BTreeMap::new();

        for name in secret_names {
            for ns in &chain {
                let user = keyring_user(ns, name);
                if let Some(value) = self.store.get(&self.service, &user) {
                    debug!(secret = name.as_str(), namespace = ns.as_str(), "secret resolved");
                    resolved.insert(name.clone(), value);
                    break;
                }
            }
        }
        resolved
    }
}

fn keyring_user(namespace: &str, secret_name: &str) -> String {
    if namespace.is_empty() {
        secret_name.to_string()
    } else {
        format!("{namespace}/{secret_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::test_support::InMemoryStore;

    #[test]
    fn resolves_from_the_most_specific_namespace_first() {
        let store = InMemoryStore::default();
        store.set("enact", "acme/API_KEY", "specific-value");
        store.set("enact", "API_KEY", "global-value");
        let broker = SecretBroker::with_store("enact", store);

        let resolved = broker.resolve("acme/lint", &["API_KEY".to_string()]);
        assert_eq!(resolved.get("API_KEY").map(String::as_str), Some("specific-value"));
    }

    #[test]
    fn falls_back_to_global_namespace() {
        let store = InMemoryStore::with("enact", "API_KEY", "global-value");
        let broker = SecretBroker::with_store("enact", store);

        let resolved = broker.resolve("acme/lint", &["API_KEY".to_string()]);
        assert_eq!(resolved.get("API_KEY").map(String::as_str), Some("global-value"));
    }

    #[test]
    fn missing_secret_is_absent_not_an_error() {
        let store = InMemoryStore::default();
        let broker = SecretBroker::with_store("enact", store);

        let resolved = broker.resolve("acme/lint", &["MISSING".to_string()]);
        assert!(!resolved.contains_key("MISSING"));
    }

    #[test]
    fn resolves_several_secrets_independently() {
        let store = InMemoryStore::default();
        store.set("enact", "acme/A", "a-value");
        store.set("enact", "B", "b-global");
        let broker = SecretBroker::with_store("enact", store);

        let resolved = broker.resolve(
            "acme/lint",
            &["A".to_string(), "B".to_string(), "C".to_string()],
        );
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get("A").map(String::as_str), Some("a-value"));
        assert_eq!(resolved.get("B").map(String::as_str), Some("b-global"));
    }
}
