/// Abstraction over the OS credential store so the broker's namespace
/// walk can be tested without touching a real keychain.
pub trait SecretStore: Send + Sync {
    fn get(&self, service: &str, user: &str) -> Option<String>;
}

/// OS keychain-backed store: macOS Keychain, Windows Credential Manager
/// or the Linux Secret Service, via the `keyring` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn get(&self, service: &str, user: &str) -> Option<String> {
        keyring::Entry::new(service, user).ok()?.get_password().ok()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SecretStore;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryStore {
        entries: Mutex<BTreeMap<(String, String), String>>,
    }

    impl InMemoryStore {
        pub fn with(service: &str, user: &str, value: &str) -> Self {
            let store = Self::default();
            store.set(service, user, value);
            store
        }

        pub fn set(&self, service: &str, user: &str, value: &str) {
            self.entries
                .lock()
                .unwrap()
                .insert((service.to_string(), user.to_string()), value.to_string());
        }
    }

    impl SecretStore for InMemoryStore {
        fn get(&self, service: &str, user: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .get(&(service.to_string(), user.to_string()))
                .cloned()
        }
    }
}
