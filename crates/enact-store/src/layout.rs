use crate::errors::{StoreError, StoreResult};
use directories::UserDirs;
use std::path::{Path, PathBuf};

/// Rooted filesystem layout for the `.enact` tree, both the user-global
/// one at `<home>/.enact` and, where applicable, a project-local
/// `<project>/.enact`. A root, plus pure functions computing sub-paths
/// from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub home_root: PathBuf,
}

impl Layout {
    pub fn new(home_root: PathBuf) -> Self {
        Layout { home_root }
    }

    /// Resolves the layout from the current user's home directory.
    pub fn from_env() -> StoreResult<Self> {
        let home = UserDirs::new().ok_or(StoreError::NoHomeDirectory)?;
        Ok(Layout::new(home.home_dir().join(".enact")))
    }

    pub fn config_path(&self) -> PathBuf {
        self.home_root.join("config.yaml")
    }

    pub fn user_tools_json(&self) -> PathBuf {
        self.home_root.join("tools.json")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.home_root.join("cache")
    }

    /// `<home>/.enact/cache/<name>/v<version>/`
    pub fn cache_dir(&self, name: &str, version: &str) -> PathBuf {
        self.cache_root().join(name).join(format!("v{version}"))
    }

    /// Every `v*` directory currently cached for `name`, regardless of
    /// version, used by the resolver's "highest cached version" search.
    pub fn cached_versions(&self, name: &str) -> Vec<String> {
        let dir = self.cache_root().join(name);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter_map(|name| name.strip_prefix('v').map(str::to_string))
            .collect()
    }

    pub fn ensure_cache_root(&self) -> StoreResult<()> {
        std::fs::create_dir_all(self.cache_root())
            .map_err(|e| StoreError::CreateDir(self.cache_root(), e))
    }
}

/// `<project>/.enact/tools.json`
pub fn project_tools_json(project_root: &Path) -> PathBuf {
    project_root.join(".enact").join("tools.json")
}

/// `<project>/.enact/tools/<name>/`
pub fn project_vendor_dir(project_root: &Path, name: &str) -> PathBuf {
    project_root.join(".enact").join("tools").join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_follows_name_v_version_layout() {
        let layout = Layout::new(PathBuf::from("/home/alice/.enact"));
        assert_eq!(
            layout.cache_dir("acme/lint", "1.2.3"),
            PathBuf::from("/home/alice/.enact/cache/acme/lint/v1.2.3")
        );
    }

    #[test]
    fn project_paths_are_rooted_under_dot_enact() {
        let root = PathBuf::from("/work/myproj");
        assert_eq!(
            project_tools_json(&root),
            PathBuf::from("/work/myproj/.enact/tools.json")
        );
        assert_eq!(
            project_vendor_dir(&root, "acme/lint"),
            PathBuf::from("/work/myproj/.enact/tools/acme/lint")
        );
    }

    #[test]
    fn cached_versions_lists_v_prefixed_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path().to_path_buf());
        let tool_dir = layout.cache_root().join("acme/lint");
        std::fs::create_dir_all(tool_dir.join("v1.0.0")).unwrap();
        std::fs::create_dir_all(tool_dir.join("v1.2.0")).unwrap();
        let mut versions = layout.cached_versions("acme/lint");
        versions.sort();
        assert_eq!(versions, vec!["1.0.0".to_string(), "1.2.0".to_string()]);
    }
}
