use crate::errors::{ResolverError, ResolverResult};
use crate::specifier::{self, Specifier};
use enact_manifest::{Manifest, DOC_FILE_NAME, MANIFEST_FILE_NAMES};
use enact_store::{highest_cached_version, project_tools_json, project_vendor_dir, Layout, ToolsRegistry};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a resolved tool's files came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Project,
    User,
    Cache,
    File,
}

/// A fully-resolved tool, ready to be handed to the execution
/// controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResolution {
    pub manifest: Manifest,
    pub source_dir: PathBuf,
    pub origin: Origin,
    pub manifest_path: PathBuf,
    pub version: Option<String>,
    pub action: Option<String>,
}

/// Resolves `raw` against the project, user, and cache namespaces, in
/// that order. `project_root` is `None` when invoked outside a project
/// directory.
pub fn resolve(
    raw: &str,
    project_root: Option<&Path>,
    layout: &Layout,
) -> ResolverResult<ToolResolution> {
    match specifier::parse(raw) {
        Specifier::Path(path) => resolve_path(&path),
        Specifier::Alias {
            alias,
            action,
            version,
        } => resolve_alias(&alias, action, version, project_root, layout),
        Specifier::Name {
            name,
            action,
            version,
        } => resolve_name(&name, action, version, project_root, layout),
    }
}

fn resolve_path(path: &Path) -> ResolverResult<ToolResolution> {
    if path.is_file() {
        let manifest = enact_manifest::load_yaml_file(path)?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok(ToolResolution {
            manifest,
            source_dir,
            origin: Origin::File,
            manifest_path: path.to_path_buf(),
            version: None,
            action: None,
        });
    }

    let manifest = enact_manifest::load_dir(path)?;
    let manifest_path = find_manifest_path(path).unwrap_or_else(|| path.join(DOC_FILE_NAME));
    Ok(ToolResolution {
        manifest,
        source_dir: path.to_path_buf(),
        origin: Origin::File,
        manifest_path,
        version: None,
        action: None,
    })
}

fn resolve_alias(
    alias: &str,
    action: Option<String>,
    version: Option<String>,
    project_root: Option<&Path>,
    layout: &Layout,
) -> ResolverResult<ToolResolution> {
    if let Some(root) = project_root {
        let registry_path = project_tools_json(root);
        if let Ok(registry) = ToolsRegistry::load(&registry_path) {
            if let Some(target) = registry.resolve_alias(alias) {
                debug!(alias, target, "resolved project alias");
                return resolve_name(&target.to_string(), action, version, project_root, layout);
            }
        }
    }

    let registry = ToolsRegistry::load(&layout.user_tools_json())?;
    if let Some(target) = registry.resolve_alias(alias) {
        debug!(alias, target, "resolved global alias");
        return resolve_name(&target.to_string(), action, version, project_root, layout);
    }

    Err(ResolverError::AliasNotFound(alias.to_string()))
}

fn resolve_name(
    name: &str,
    action: Option<String>,
    version: Option<String>,
    project_root: Option<&Path>,
    layout: &Layout,
) -> ResolverResult<ToolResolution> {
    let mut searched = Vec::new();

    if let Some(root) = project_root {
        let dir = project_vendor_dir(root, name);
        searched.push(dir.clone());
        if let Ok(manifest) = enact_manifest::load_dir(&dir) {
            let manifest_path = find_manifest_path(&dir).unwrap_or_else(|| dir.join(DOC_FILE_NAME));
            return Ok(ToolResolution {
                manifest,
                source_dir: dir,
                origin: Origin::Project,
                manifest_path,
                version,
                action,
            });
        }
    }

    if let Ok(registry) = ToolsRegistry::load(&layout.user_tools_json()) {
        if let Some(registered_version) = registry.tools.get(name) {
            if version.as_deref().map_or(true, |v| v == registered_version) {
                let dir = layout.cache_dir(name, registered_version);
                searched.push(dir.clone());
                if let Ok(manifest) = enact_manifest::load_dir(&dir) {
                    let manifest_path =
                        find_manifest_path(&dir).unwrap_or_else(|| dir.join(DOC_FILE_NAME));
                    return Ok(ToolResolution {
                        manifest,
                        source_dir: dir,
                        origin: Origin::User,
                        manifest_path,
                        version: Some(registered_version.clone()),
                        action,
                    });
                }
            }
        }
    }

    let resolved_version = match &version {
        Some(v) => Some(v.clone()),
        None => highest_cached_version(&layout.cached_versions(name)),
    };
    if let Some(v) = resolved_version {
        let dir = layout.cache_dir(name, &v);
        searched.push(dir.clone());
        if let Ok(manifest) = enact_manifest::load_dir(&dir) {
            let manifest_path = find_manifest_path(&dir).unwrap_or_else(|| dir.join(DOC_FILE_NAME));
            return Ok(ToolResolution {
                manifest,
                source_dir: dir,
                origin: Origin::Cache,
                manifest_path,
                version: Some(v),
                action,
            });
        }
    }

    Err(ResolverError::NotFound {
        specifier: name.to_string(),
        searched,
    })
}

fn find_manifest_path(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .or_else(|| {
            let doc = dir.join(DOC_FILE_NAME);
            doc.is_file().then_some(doc)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn write_manifest(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("skill.yaml"),
            format!("name: {name}\ncommand: echo hi\n"),
        )
        .unwrap();
    }

    #[test]
    fn resolves_a_bare_directory_path() {
        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), "alice/greet");
        let resolution = resolve(tmp.path().to_str().unwrap(), None, &Layout::new(tmp.path().to_path_buf())).unwrap();
        assert_eq!(resolution.origin, Origin::File);
        assert_eq!(resolution.manifest.name, "alice/greet");
    }

    #[test]
    fn project_source_wins_over_cache() {
        let home = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path().to_path_buf());

        write_manifest(&layout.cache_dir("acme/lint", "1.0.0"), "acme/lint");
        enact_store::with_exclusive_lock(&layout.user_tools_json(), Duration::from_secs(1), |r| {
            r.install("acme/lint", "1.0.0");
            Ok(())
        })
        .unwrap();

        write_manifest(&project_vendor_dir(project.path(), "acme/lint"), "acme/lint-vendored");

        let resolution = resolve("acme/lint", Some(project.path()), &layout).unwrap();
        assert_eq!(resolution.origin, Origin::Project);
        assert_eq!(resolution.manifest.name, "acme/lint-vendored");
    }

    #[test]
    fn falls_back_from_user_registry_to_cache_when_version_pinned_differs() {
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path().to_path_buf());

        write_manifest(&layout.cache_dir("acme/lint", "1.0.0"), "acme/lint");
        write_manifest(&layout.cache_dir("acme/lint", "2.0.0"), "acme/lint");
        enact_store::with_exclusive_lock(&layout.user_tools_json(), Duration::from_secs(1), |r| {
            r.install("acme/lint", "1.0.0");
            Ok(())
        })
        .unwrap();

        let resolution = resolve("acme/lint@2.0.0", None, &layout).unwrap();
        assert_eq!(resolution.origin, Origin::Cache);
        assert_eq!(resolution.version.as_deref(), Some("2.0.0"));
    }

    #[test]
    fn picks_highest_cached_version_when_unpinned_and_unregistered() {
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path().to_path_buf());
        write_manifest(&layout.cache_dir("acme/lint", "1.0.0"), "acme/lint");
        write_manifest(&layout.cache_dir("acme/lint", "1.2.0"), "acme/lint");

        let resolution = resolve("acme/lint", None, &layout).unwrap();
        assert_eq!(resolution.version.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn not_found_lists_every_searched_path() {
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path().to_path_buf());
        let err = resolve("acme/missing", None, &layout).unwrap_err();
        match err {
            ResolverError::NotFound { searched, .. } => assert!(searched.is_empty()),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn alias_resolves_to_its_target_hierarchical_tool() {
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path().to_path_buf());
        write_manifest(&layout.cache_dir("acme/lint", "0.3.1"), "acme/lint");
        enact_store::with_exclusive_lock(&layout.user_tools_json(), Duration::from_secs(1), |r| {
            r.install("acme/lint", "0.3.1");
            r.add_alias("lint", "acme/lint")
        })
        .unwrap();

        let resolution = resolve("lint", None, &layout).unwrap();
        assert_eq!(resolution.manifest.name, "acme/lint");
        assert_eq!(resolution.version.as_deref(), Some("0.3.1"));
    }

    #[test]
    fn alias_identical_to_hierarchical_name_does_not_shadow_it() {
        // "acme/lint" has a slash, so it is parsed as a Name, never an
        // Alias, regardless of what aliases happen to be registered.
        let home = tempfile::tempdir().unwrap();
        let layout = Layout::new(home.path().to_path_buf());
        write_manifest(&layout.cache_dir("acme/lint", "1.0.0"), "acme/lint");

        let resolution = resolve("acme/lint", None, &layout).unwrap();
        assert_eq!(resolution.origin, Origin::Cache);
    }
}
