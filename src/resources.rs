//! Resource lookup for machine definitions, instances and profiles.
//!
//! Resources are resolved against an ordered list of base directories, with
//! earlier directories taking precedence:
//!
//! 1. **Explicit** (`--resources <dir>` / `MDEF_RESOURCES`)
//! 2. **User data** (`~/.local/share/machinedef`)
//!
//! Within each base directory the scope's subdirectory is searched first
//! (e.g. `machines/ultimaker2.json`), then the base directory itself.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Category of resource being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    MachineDefinitions,
    MachineInstances,
    Profiles,
}

impl ResourceScope {
    /// Subdirectory name used for this scope.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ResourceScope::MachineDefinitions => "machines",
            ResourceScope::MachineInstances => "instances",
            ResourceScope::Profiles => "profiles",
        }
    }
}

impl std::fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Resolves resource names to file paths.
pub trait ResourceLocator {
    /// Find `name` in `scope`. Fails with [`Error::NotFound`] when no
    /// candidate exists.
    fn resolve(&self, scope: ResourceScope, name: &str) -> Result<PathBuf>;
}

/// Directory-based resource lookup.
#[derive(Debug, Clone, Default)]
pub struct ResourcePaths {
    search_paths: Vec<PathBuf>,
}

impl ResourcePaths {
    /// Create a locator searching exactly the given directories.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Explicit directories first, then the user data directory.
    pub fn with_user_data(explicit: Vec<PathBuf>) -> Self {
        let mut search_paths = explicit;
        if let Some(dir) = Self::user_data_dir() {
            search_paths.push(dir);
        }
        Self { search_paths }
    }

    /// Get the user data directory (~/.local/share/machinedef).
    pub fn user_data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("machinedef"))
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Candidate paths for `name` in search order.
    pub fn candidates(&self, scope: ResourceScope, name: &str) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for base in &self.search_paths {
            out.push(base.join(scope.dir_name()).join(name));
            out.push(base.join(name));
        }
        out
    }
}

impl ResourceLocator for ResourcePaths {
    fn resolve(&self, scope: ResourceScope, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_absolute() {
            return if direct.is_file() {
                Ok(direct.to_path_buf())
            } else {
                Err(Error::NotFound(format!("{} resource '{}'", scope, name)))
            };
        }

        for candidate in self.candidates(scope, name) {
            if candidate.is_file() {
                tracing::debug!(scope = %scope, path = %candidate.display(), "resolved resource");
                return Ok(candidate);
            }
        }

        tracing::warn!(scope = %scope, name, "could not find the requested resource");
        Err(Error::NotFound(format!("{} resource '{}'", scope, name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_prefers_scope_subdirectory() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("machines")).unwrap();
        std::fs::write(temp.path().join("machines/printer.json"), "{}").unwrap();
        std::fs::write(temp.path().join("printer.json"), "{}").unwrap();

        let paths = ResourcePaths::new(vec![temp.path().to_path_buf()]);
        let resolved = paths
            .resolve(ResourceScope::MachineDefinitions, "printer.json")
            .unwrap();
        assert_eq!(resolved, temp.path().join("machines/printer.json"));
    }

    #[test]
    fn test_resolve_falls_back_to_base_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("printer.json"), "{}").unwrap();

        let paths = ResourcePaths::new(vec![temp.path().to_path_buf()]);
        let resolved = paths
            .resolve(ResourceScope::MachineDefinitions, "printer.json")
            .unwrap();
        assert_eq!(resolved, temp.path().join("printer.json"));
    }

    #[test]
    fn test_earlier_search_path_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("printer.json"), "{}").unwrap();
        std::fs::write(second.path().join("printer.json"), "{}").unwrap();

        let paths = ResourcePaths::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let resolved = paths
            .resolve(ResourceScope::MachineDefinitions, "printer.json")
            .unwrap();
        assert_eq!(resolved, first.path().join("printer.json"));
    }

    #[test]
    fn test_resolve_not_found() {
        let temp = TempDir::new().unwrap();
        let paths = ResourcePaths::new(vec![temp.path().to_path_buf()]);
        let err = paths
            .resolve(ResourceScope::Profiles, "missing.kdl")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_resolve_absolute_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("abs.json");
        std::fs::write(&file, "{}").unwrap();

        let paths = ResourcePaths::default();
        let resolved = paths
            .resolve(ResourceScope::MachineDefinitions, file.to_str().unwrap())
            .unwrap();
        assert_eq!(resolved, file);
    }

    #[test]
    fn test_with_user_data_keeps_explicit_first() {
        let paths = ResourcePaths::with_user_data(vec![PathBuf::from("/opt/machines")]);
        assert_eq!(paths.search_paths()[0], PathBuf::from("/opt/machines"));
    }

    #[test]
    fn test_scope_dir_names() {
        assert_eq!(ResourceScope::MachineDefinitions.dir_name(), "machines");
        assert_eq!(ResourceScope::MachineInstances.to_string(), "instances");
        assert_eq!(ResourceScope::Profiles.dir_name(), "profiles");
    }
}
