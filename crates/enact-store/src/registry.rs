use crate::errors::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Which `tools.json` a registry operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryScope {
    Global,
    Project,
}

/// On-disk `tools.json`: the set of installed tools and the aliases
/// pointing at them. Read-modify-write with full-file replacement;
/// concurrent writers are serialized by an exclusive advisory lock file
/// sitting next to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsRegistry {
    #[serde(default)]
    pub tools: BTreeMap<String, String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl ToolsRegistry {
    /// Loads the registry at `path`, returning an empty registry if the
    /// file does not exist yet.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| StoreError::ReadRegistry(path.to_path_buf(), e))?;
        serde_json::from_str(&raw).map_err(|e| StoreError::ParseRegistry(path.to_path_buf(), e))
    }

    fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir(parent.to_path_buf(), e))?;
        }
        let serialized =
            serde_json::to_string_pretty(self).expect("ToolsRegistry serialization cannot fail");
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized).map_err(|e| StoreError::WriteRegistry(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, path).map_err(|e| StoreError::WriteRegistry(path.to_path_buf(), e))
    }

    /// Records that `name` is installed at `version`.
    pub fn install(&mut self, name: &str, version: &str) {
        self.tools.insert(name.to_string(), version.to_string());
    }

    /// Removes `name` and every alias pointing at it.
    pub fn uninstall(&mut self, name: &str) -> StoreResult<()> {
        if self.tools.remove(name).is_none() {
            return Err(StoreError::NotInstalled(name.to_string()));
        }
        self.aliases.retain(|_, target| target != name);
        Ok(())
    }

    /// Adds `alias -> name`. Rejects reassigning an alias that already
    /// points somewhere else.
    pub fn add_alias(&mut self, alias: &str, name: &str) -> StoreResult<()> {
        if let Some(existing) = self.aliases.get(alias) {
            if existing != name {
                return Err(StoreError::AliasConflict(alias.to_string(), existing.clone()));
            }
            return Ok(());
        }
        self.aliases.insert(alias.to_string(), name.to_string());
        Ok(())
    }

    /// Resolves a single-segment alias to the tool name it points at.
    pub fn resolve_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }
}

/// Acquires an exclusive advisory lock on `path.lock`, runs `f` against
/// the freshly loaded registry at `path`, persists the result, and
/// releases the lock. Concurrent writers retry on contention; a loser
/// under `timeout` gives up with [`StoreError::LockTimeout`].
pub fn with_exclusive_lock<F>(path: &Path, timeout: Duration, f: F) -> StoreResult<()>
where
    F: FnOnce(&mut ToolsRegistry) -> StoreResult<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir(parent.to_path_buf(), e))?;
    }
    let lock_path = lock_path_for(path);
    let started = Instant::now();
    let lock_file = loop {
        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(file) => break file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if started.elapsed() > timeout {
                    return Err(StoreError::LockTimeout(path.to_path_buf()));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => return Err(StoreError::WriteRegistry(lock_path, e)),
        }
    };
    drop(lock_file);

    let result = (|| {
        let mut registry = ToolsRegistry::load(path)?;
        f(&mut registry)?;
        registry.save(path)
    })();

    let _ = fs::remove_file(&lock_path);
    result
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_tools_and_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        with_exclusive_lock(&path, Duration::from_secs(1), |registry| {
            registry.install("acme/lint", "0.3.1");
            registry.add_alias("lint", "acme/lint")
        })
        .unwrap();

        let reloaded = ToolsRegistry::load(&path).unwrap();
        assert_eq!(reloaded.tools.get("acme/lint").map(String::as_str), Some("0.3.1"));
        assert_eq!(reloaded.resolve_alias("lint"), Some("acme/lint"));
    }

    #[test]
    fn alias_conflict_is_rejected() {
        let mut registry = ToolsRegistry::default();
        registry.install("acme/lint", "0.3.1");
        registry.install("acme/fmt", "1.0.0");
        registry.add_alias("tool", "acme/lint").unwrap();
        let err = registry.add_alias("tool", "acme/fmt");
        assert!(matches!(err, Err(StoreError::AliasConflict(_, _))));
    }

    #[test]
    fn uninstall_removes_aliases() {
        let mut registry = ToolsRegistry::default();
        registry.install("acme/lint", "0.3.1");
        registry.add_alias("lint", "acme/lint").unwrap();
        registry.uninstall("acme/lint").unwrap();
        assert!(registry.resolve_alias("lint").is_none());
        assert!(registry.tools.is_empty());
    }

    #[test]
    fn uninstall_unknown_tool_is_an_error() {
        let mut registry = ToolsRegistry::default();
        assert!(registry.uninstall("acme/lint").is_err());
    }

    #[test]
    fn install_then_uninstall_then_install_is_idempotent() {
        let mut registry = ToolsRegistry::default();
        registry.install("acme/lint", "0.3.1");
        registry.uninstall("acme/lint").unwrap();
        registry.install("acme/lint", "0.3.1");
        assert_eq!(registry.tools.get("acme/lint").map(String::as_str), Some("0.3.1"));
    }
}
