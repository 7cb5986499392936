use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of a module, derived from its position in the library tree
/// (`modules/admin/`, `modules/catalog/`, `modules/security/`) and declared
/// redundantly in its metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Admin,
    Catalog,
    Security,
}

impl ModuleKind {
    /// All known kinds, in library directory order.
    pub const ALL: [ModuleKind; 3] = [ModuleKind::Admin, ModuleKind::Catalog, ModuleKind::Security];

    /// Library subdirectory name for this kind.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            ModuleKind::Admin => "admin",
            ModuleKind::Catalog => "catalog",
            ModuleKind::Security => "security",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Error returned when a module kind string is not one of the known kinds.
#[derive(Debug, thiserror::Error)]
#[error("unknown module kind '{0}' (expected admin, catalog, or security)")]
pub struct UnknownModuleKind(pub String);

impl FromStr for ModuleKind {
    type Err = UnknownModuleKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ModuleKind::Admin),
            "catalog" => Ok(ModuleKind::Catalog),
            "security" => Ok(ModuleKind::Security),
            other => Err(UnknownModuleKind(other.to_string())),
        }
    }
}

/// A companion cluster a module requires alongside the one being provisioned.
///
/// The metadata record carries at least a name; any further per-cluster
/// settings are preserved untouched for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependentCluster {
    pub name: String,
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

/// Module metadata record, read from `metadata.json` in the module's
/// library directory. All list fields default to empty so a minimal record
/// only needs `description` and `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    #[serde(default)]
    pub incompatible_modules: Vec<String>,
    #[serde(default)]
    pub dependent_modules: Vec<String>,
    /// Supported cluster version window: `[min]` or `[min, max]`.
    /// Empty means unconstrained. More than two entries is a configuration
    /// error, rejected at validation time rather than parse time.
    #[serde(default)]
    pub versions: Vec<u32>,
    #[serde(default)]
    pub dependent_clusters: Vec<DependentCluster>,
    #[serde(default)]
    pub enterprise: bool,
}

/// One service entry of a module's compose fragment. Only the fields the
/// CLI core consumes are modeled; the full fragment is handed to
/// `docker compose` verbatim from disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    /// Host-port mappings in `"${VAR}:containerPort"` form.
    #[serde(default)]
    pub ports: Vec<String>,
}

/// A module's compose fragment: the `services:` listing of its
/// `module.yaml`. Iteration order over services is not guaranteed stable.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ComposeFragment {
    #[serde(default)]
    pub services: HashMap<String, ServiceFragment>,
}

impl ComposeFragment {
    /// Resolved container name for a service: explicit `container_name` if
    /// declared, the service name otherwise.
    #[must_use]
    pub fn container_name<'a>(&'a self, service: &'a str) -> &'a str {
        self.services
            .get(service)
            .and_then(|s| s.container_name.as_deref())
            .unwrap_or(service)
    }
}
