//! Module library access: defaults file, module metadata, compose fragments.
//!
//! The library is a versioned bundle installed separately from the CLI; its
//! total absence is a user error with an install hint, while corruption of
//! an installed library (bad JSON/YAML) is a system error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quarry_common::{ComposeFragment, ModuleKind, ModuleMetadata};

use crate::domain::UserError;

/// Flat `KEY=VALUE` defaults file at the library root.
pub const DEFAULTS_FILE: &str = "quarry.env";
/// Per-module metadata record.
pub const METADATA_FILE: &str = "metadata.json";
/// Per-module compose fragment.
pub const FRAGMENT_FILE: &str = "module.yaml";
/// Base compose file (coordinator and default services).
pub const BASE_COMPOSE_FILE: &str = "docker-compose.yaml";

/// Environment variable overriding the library location.
pub const LIB_PATH_ENV: &str = "QUARRY_LIB_PATH";

/// One installed module: metadata plus compose fragment.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub dir: PathBuf,
    pub metadata: ModuleMetadata,
    pub fragment: ComposeFragment,
}

impl Module {
    /// Path handed to `docker compose -f`.
    #[must_use]
    pub fn compose_file(&self) -> PathBuf {
        self.dir.join(FRAGMENT_FILE)
    }
}

/// Handle on an installed module library.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    /// Locate the library: explicit override, `QUARRY_LIB_PATH`, or
    /// `~/.quarry/lib`.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::MissingLibrary`] when the directory does not
    /// exist.
    pub fn locate(override_path: Option<PathBuf>) -> Result<Self, UserError> {
        let root = override_path
            .or_else(|| std::env::var(LIB_PATH_ENV).ok().map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|home| home.join(".quarry").join("lib")))
            .unwrap_or_else(|| PathBuf::from(".quarry/lib"));
        if !root.is_dir() {
            return Err(UserError::MissingLibrary(root.display().to_string()));
        }
        Ok(Self { root })
    }

    /// Create a handle on an explicit root (used in tests).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn base_compose(&self) -> PathBuf {
        self.root.join(BASE_COMPOSE_FILE)
    }

    /// Library version, from the `version` file at the root, if present.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        std::fs::read_to_string(self.root.join("version"))
            .ok()
            .map(|v| v.trim().to_string())
    }

    /// Read the flat `KEY=VALUE` defaults shipped with the library.
    /// Comment and blank lines are skipped; values may contain `=`.
    ///
    /// # Errors
    ///
    /// A missing defaults file is a user error — the one fatal condition in
    /// the resolution chain.
    pub fn defaults(&self) -> Result<Vec<(String, String)>> {
        let path = self.root.join(DEFAULTS_FILE);
        if !path.is_file() {
            return Err(UserError::MissingLibraryDefaults {
                root: self.root.display().to_string(),
                file: DEFAULTS_FILE.to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut pairs = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                pairs.push((key.trim().to_uppercase(), value.to_string()));
            }
        }
        Ok(pairs)
    }

    /// All installed modules, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error when a module directory cannot be read or its
    /// metadata/fragment files are corrupt.
    pub fn modules(&self) -> Result<Vec<Module>> {
        let mut modules = Vec::new();
        for kind in ModuleKind::ALL {
            let kind_dir = self.root.join("modules").join(kind.dir_name());
            if !kind_dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(&kind_dir)
                .with_context(|| format!("reading {}", kind_dir.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("reading {}", kind_dir.display()))?;
                let dir = entry.path();
                if !dir.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                modules.push(self.load_module(&name, dir)?);
            }
        }
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(modules)
    }

    /// Look up one module by name.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::UnknownModule`] listing the available modules.
    pub fn module(&self, name: &str) -> Result<Module> {
        let modules = self.modules()?;
        let available = modules
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        modules
            .into_iter()
            .find(|m| m.name == name)
            .ok_or_else(|| {
                UserError::UnknownModule {
                    module: name.to_string(),
                    available,
                }
                .into()
            })
    }

    fn load_module(&self, name: &str, dir: PathBuf) -> Result<Module> {
        let metadata_path = dir.join(METADATA_FILE);
        let metadata_raw = std::fs::read_to_string(&metadata_path)
            .with_context(|| format!("reading {}", metadata_path.display()))?;
        let metadata: ModuleMetadata = serde_json::from_str(&metadata_raw)
            .with_context(|| format!("parsing {}", metadata_path.display()))?;

        let fragment_path = dir.join(FRAGMENT_FILE);
        let fragment_raw = std::fs::read_to_string(&fragment_path)
            .with_context(|| format!("reading {}", fragment_path.display()))?;
        let fragment: ComposeFragment = serde_yaml::from_str(&fragment_raw)
            .with_context(|| format!("parsing {}", fragment_path.display()))?;

        Ok(Module {
            name: name.to_string(),
            dir,
            metadata,
            fragment,
        })
    }
}

/// Shared test helpers — available to all modules via
/// `crate::infra::library::test_helpers`.
#[cfg(test)]
pub mod test_helpers {
    use std::path::Path;

    /// Write a minimal library tree with one catalog module.
    pub fn write_library(root: &Path) {
        std::fs::create_dir_all(root.join("modules/catalog/postgres")).expect("mkdir");
        std::fs::write(
            root.join("quarry.env"),
            "# library defaults\nCLUSTER_DIST=trino\nCLUSTER_VER=476\n\nPORT_COORDINATOR=8080\n",
        )
        .expect("write defaults");
        std::fs::write(root.join("version"), "2.4.0\n").expect("write version");
        std::fs::write(root.join("docker-compose.yaml"), "services: {}\n").expect("write compose");
        std::fs::write(
            root.join("modules/catalog/postgres/metadata.json"),
            r#"{"description":"PostgreSQL catalog","type":"catalog"}"#,
        )
        .expect("write metadata");
        std::fs::write(
            root.join("modules/catalog/postgres/module.yaml"),
            "services:\n  postgres:\n    container_name: quarry-postgres\n    ports:\n      - \"${PORT_POSTGRES}:5432\"\n",
        )
        .expect("write fragment");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_library_is_a_user_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = Library::locate(Some(dir.path().join("nowhere"))).expect_err("missing");
        assert!(matches!(err, UserError::MissingLibrary(_)));
        assert!(err.hint().is_some());
    }

    #[test]
    fn defaults_skip_comments_and_blank_lines() {
        let dir = TempDir::new().expect("tempdir");
        test_helpers::write_library(dir.path());
        let lib = Library::with_root(dir.path().to_path_buf());
        let defaults = lib.defaults().expect("defaults");
        assert_eq!(defaults.len(), 3);
        assert!(defaults.contains(&("CLUSTER_VER".to_string(), "476".to_string())));
    }

    #[test]
    fn missing_defaults_file_is_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let lib = Library::with_root(dir.path().to_path_buf());
        let err = lib.defaults().expect_err("no quarry.env");
        let user = err.downcast_ref::<UserError>().expect("user error");
        assert!(matches!(user, UserError::MissingLibraryDefaults { .. }));
    }

    #[test]
    fn modules_are_discovered_and_sorted() {
        let dir = TempDir::new().expect("tempdir");
        test_helpers::write_library(dir.path());
        let lib = Library::with_root(dir.path().to_path_buf());
        let modules = lib.modules().expect("modules");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "postgres");
        assert_eq!(modules[0].metadata.kind, ModuleKind::Catalog);
        assert_eq!(modules[0].fragment.container_name("postgres"), "quarry-postgres");
    }

    #[test]
    fn unknown_module_lists_available() {
        let dir = TempDir::new().expect("tempdir");
        test_helpers::write_library(dir.path());
        let lib = Library::with_root(dir.path().to_path_buf());
        let err = lib.module("elastic").expect_err("unknown");
        let msg = err.to_string();
        assert!(msg.contains("elastic") && msg.contains("postgres"), "message: {msg}");
    }

    #[test]
    fn version_is_read_and_trimmed() {
        let dir = TempDir::new().expect("tempdir");
        test_helpers::write_library(dir.path());
        let lib = Library::with_root(dir.path().to_path_buf());
        assert_eq!(lib.version().as_deref(), Some("2.4.0"));
    }
}
