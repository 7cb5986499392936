//! Pure cluster-validation checks: version gates, module version windows,
//! module compatibility, dependent clusters, and duplicate-config scanning.
//!
//! Hard violations return [`UserError`]; soft anomalies come back as
//! [`ValidationFinding`]s carrying a severity, so callers decide
//! continuation explicitly instead of inferring it from whether something
//! raised.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use quarry_common::{DependentCluster, ModuleMetadata};

use crate::domain::error::UserError;

/// Minimum supported numeric major version, both distributions.
pub const MIN_CLUSTER_VER: u32 = 413;

/// Suffix marking an enterprise build of the starburst distribution.
pub const ENTERPRISE_SUFFIX: &str = "-e";

/// Prefix applied to companion clusters so their names cannot collide with
/// the cluster being provisioned.
pub const DEPENDENT_CLUSTER_PREFIX: &str = "aux-";

/// The query-engine distribution a cluster runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Trino,
    Starburst,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Trino => f.write_str("trino"),
            Distribution::Starburst => f.write_str("starburst"),
        }
    }
}

impl FromStr for Distribution {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trino" => Ok(Distribution::Trino),
            "starburst" => Ok(Distribution::Starburst),
            other => Err(UserError::UnknownDistribution(other.to_string())),
        }
    }
}

/// How serious a finding is. `Warning` never blocks provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One validation observation, severity attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub message: String,
}

/// Numeric major version: the first three digits of the version string.
/// `"476"` → 476, `"443-e"` → 443. Fewer than three leading digits means
/// the version is malformed.
#[must_use]
pub fn parse_major(version: &str) -> Option<u32> {
    let digits: String = version.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() < 3 {
        return None;
    }
    digits[..3].parse().ok()
}

/// Enforce the minimum cluster version for a distribution.
///
/// The starburst distribution additionally requires the enterprise suffix
/// on the version string.
///
/// # Errors
///
/// Returns a [`UserError`] naming the required minimum (or missing suffix)
/// when the version is malformed or unsupported.
pub fn check_cluster_ver(dist: &str, version: &str) -> Result<(), UserError> {
    let dist: Distribution = dist.parse()?;
    if dist == Distribution::Starburst && !version.ends_with(ENTERPRISE_SUFFIX) {
        return Err(UserError::MissingEnterpriseSuffix {
            version: version.to_string(),
            suffix: ENTERPRISE_SUFFIX.to_string(),
        });
    }
    let major =
        parse_major(version).ok_or_else(|| UserError::MalformedVersion(version.to_string()))?;
    if major < MIN_CLUSTER_VER {
        return Err(UserError::VersionBelowMinimum {
            dist: dist.to_string(),
            version: version.to_string(),
            minimum: MIN_CLUSTER_VER,
        });
    }
    Ok(())
}

/// Check every selected module's `[min, max?]` version window against the
/// cluster version.
///
/// # Errors
///
/// A window with more than two entries is itself a configuration error; a
/// cluster version outside a window fails naming the offending module and
/// the violated bound.
pub fn check_version_requirements(
    modules: &[(&str, &ModuleMetadata)],
    cluster_version: &str,
) -> Result<(), UserError> {
    let major = parse_major(cluster_version)
        .ok_or_else(|| UserError::MalformedVersion(cluster_version.to_string()))?;

    for (name, meta) in modules {
        match meta.versions.as_slice() {
            [] => {}
            [min] => {
                if major < *min {
                    return Err(UserError::VersionOutsideWindow {
                        module: (*name).to_string(),
                        version: major,
                        bound: format!("requires at least {min}"),
                    });
                }
            }
            [min, max] => {
                if major < *min {
                    return Err(UserError::VersionOutsideWindow {
                        module: (*name).to_string(),
                        version: major,
                        bound: format!("requires at least {min}"),
                    });
                }
                if major > *max {
                    return Err(UserError::VersionOutsideWindow {
                        module: (*name).to_string(),
                        version: major,
                        bound: format!("supports at most {max}"),
                    });
                }
            }
            window => {
                return Err(UserError::InvalidVersionWindow {
                    module: (*name).to_string(),
                    entries: window.len(),
                });
            }
        }
    }
    Ok(())
}

/// Fail when any selected module names another selected module as
/// incompatible.
///
/// # Errors
///
/// Returns [`UserError::IncompatibleModules`] naming both modules.
pub fn check_incompatible(modules: &[(&str, &ModuleMetadata)]) -> Result<(), UserError> {
    for (name, meta) in modules {
        for other in &meta.incompatible_modules {
            if modules.iter().any(|(n, _)| n == other) {
                return Err(UserError::IncompatibleModules {
                    a: (*name).to_string(),
                    b: other.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Enterprise-flagged modules require the starburst distribution.
///
/// # Errors
///
/// Returns [`UserError::EnterpriseModule`] naming the module.
pub fn check_enterprise(
    modules: &[(&str, &ModuleMetadata)],
    dist: Distribution,
) -> Result<(), UserError> {
    if dist == Distribution::Starburst {
        return Ok(());
    }
    for (name, meta) in modules {
        if meta.enterprise {
            return Err(UserError::EnterpriseModule {
                module: (*name).to_string(),
            });
        }
    }
    Ok(())
}

/// Collect the companion clusters the selected modules require, renamed
/// with the disambiguating prefix, deduplicated, in declaration order.
/// The orchestrator provisions these before the main cluster.
#[must_use]
pub fn check_dependent_clusters(modules: &[(&str, &ModuleMetadata)]) -> Vec<DependentCluster> {
    let mut seen: Vec<DependentCluster> = Vec::new();
    for (_, meta) in modules {
        for dep in &meta.dependent_clusters {
            let renamed = DependentCluster {
                name: format!("{DEPENDENT_CLUSTER_PREFIX}{}", dep.name),
                settings: dep.settings.clone(),
            };
            if !seen.iter().any(|d| d.name == renamed.name) {
                seen.push(renamed);
            }
        }
    }
    seen
}

/// Scan rendered engine/JVM configuration text for repeated property keys.
///
/// Groups lines by key (text before the first `=`, or the whole trimmed
/// line for flag-style entries) and, for any key occurring more than once,
/// emits exactly one warning per file listing every duplicate occurrence
/// verbatim. Always a warning — the engine resolves its own precedence.
#[must_use]
pub fn check_dup_config(files: &[(String, String)]) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();
    for (file, content) in files {
        let mut occurrences: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut key_order: Vec<&str> = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let key = line.split_once('=').map_or(line, |(k, _)| k.trim());
            let entry = occurrences.entry(key).or_default();
            if entry.is_empty() {
                key_order.push(key);
            }
            entry.push(line);
        }

        let mut duplicates = Vec::new();
        for key in key_order {
            let lines = &occurrences[key];
            if lines.len() > 1 {
                duplicates.extend(lines.iter().copied());
            }
        }
        if !duplicates.is_empty() {
            let mut message = format!("Duplicate configuration properties in {file}:");
            for line in duplicates {
                message.push_str("\n  ");
                message.push_str(line);
            }
            findings.push(ValidationFinding {
                severity: Severity::Warning,
                message,
            });
        }
    }
    findings
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn meta(json: &str) -> ModuleMetadata {
        serde_json::from_str(json).expect("metadata fixture")
    }

    fn catalog() -> ModuleMetadata {
        meta(r#"{"description":"d","type":"catalog"}"#)
    }

    #[test]
    fn trino_476_is_accepted() {
        check_cluster_ver("trino", "476").expect("476 meets the minimum");
    }

    #[test]
    fn trino_400_fails_naming_minimum() {
        let err = check_cluster_ver("trino", "400").expect_err("below minimum");
        assert!(err.to_string().contains("413"), "message: {err}");
    }

    #[test]
    fn starburst_without_suffix_fails() {
        let err = check_cluster_ver("starburst", "443").expect_err("missing -e");
        assert!(err.to_string().contains("-e"), "message: {err}");
    }

    #[test]
    fn starburst_with_suffix_is_accepted() {
        check_cluster_ver("starburst", "443-e").expect("443-e is valid");
    }

    #[test]
    fn malformed_version_fails() {
        assert!(check_cluster_ver("trino", "4x").is_err());
        assert!(check_cluster_ver("trino", "").is_err());
    }

    #[test]
    fn unknown_distribution_fails() {
        let err = check_cluster_ver("presto", "476").expect_err("unknown dist");
        assert!(err.to_string().contains("presto"));
    }

    #[test]
    fn version_window_with_three_entries_is_a_config_error() {
        let m = meta(r#"{"description":"d","type":"catalog","versions":[1,2,3]}"#);
        let err =
            check_version_requirements(&[("hive", &m)], "476").expect_err("bad window");
        assert!(matches!(err, UserError::InvalidVersionWindow { .. }));
    }

    #[test]
    fn version_below_window_names_module_and_bound() {
        let m = meta(r#"{"description":"d","type":"catalog","versions":[450]}"#);
        let err = check_version_requirements(&[("hive", &m)], "413").expect_err("below window");
        let msg = err.to_string();
        assert!(msg.contains("hive"), "message: {msg}");
        assert!(msg.contains("450"), "message: {msg}");
    }

    #[test]
    fn version_above_window_names_module_and_bound() {
        let m = meta(r#"{"description":"d","type":"catalog","versions":[413,450]}"#);
        let err = check_version_requirements(&[("hive", &m)], "476").expect_err("above window");
        assert!(err.to_string().contains("450"));
    }

    #[test]
    fn version_inside_window_passes() {
        let m = meta(r#"{"description":"d","type":"catalog","versions":[413,480]}"#);
        check_version_requirements(&[("hive", &m)], "476").expect("inside window");
    }

    #[test]
    fn empty_window_is_unconstrained() {
        let m = catalog();
        check_version_requirements(&[("hive", &m)], "413").expect("no window");
    }

    #[test]
    fn incompatible_pair_names_both_modules() {
        let a = meta(r#"{"description":"d","type":"security","incompatibleModules":["ldap"]}"#);
        let b = meta(r#"{"description":"d","type":"security"}"#);
        let err =
            check_incompatible(&[("file-auth", &a), ("ldap", &b)]).expect_err("incompatible");
        let msg = err.to_string();
        assert!(msg.contains("file-auth") && msg.contains("ldap"), "message: {msg}");
    }

    #[test]
    fn incompatibility_with_unselected_module_is_fine() {
        let a = meta(r#"{"description":"d","type":"security","incompatibleModules":["ldap"]}"#);
        check_incompatible(&[("file-auth", &a)]).expect("ldap not selected");
    }

    #[test]
    fn enterprise_module_on_trino_fails() {
        let m = meta(r#"{"description":"d","type":"admin","enterprise":true}"#);
        let err = check_enterprise(&[("insights", &m)], Distribution::Trino)
            .expect_err("enterprise needs starburst");
        assert!(err.to_string().contains("insights"));
    }

    #[test]
    fn enterprise_module_on_starburst_passes() {
        let m = meta(r#"{"description":"d","type":"admin","enterprise":true}"#);
        check_enterprise(&[("insights", &m)], Distribution::Starburst).expect("allowed");
    }

    #[test]
    fn dependent_clusters_get_prefixed_and_deduplicated() {
        let a = meta(
            r#"{"description":"d","type":"catalog","dependentClusters":[{"name":"metastore"}]}"#,
        );
        let b = meta(
            r#"{"description":"d","type":"catalog","dependentClusters":[{"name":"metastore"},{"name":"kdc"}]}"#,
        );
        let deps = check_dependent_clusters(&[("hive", &a), ("iceberg", &b)]);
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["aux-metastore", "aux-kdc"]);
    }

    #[test]
    fn dup_config_emits_one_warning_listing_both_occurrences() {
        let content = "query.max-stage-count=85\nquery.max-memory=1GB\nquery.max-stage-count=85\n";
        let findings = check_dup_config(&[("config.properties".to_string(), content.to_string())]);
        assert_eq!(findings.len(), 1, "exactly one warning block per file");
        let finding = &findings[0];
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(
            finding.message.matches("query.max-stage-count=85").count(),
            2,
            "both occurrences listed verbatim: {}",
            finding.message
        );
        assert!(!finding.message.contains("query.max-memory"));
    }

    #[test]
    fn dup_config_clean_file_yields_no_findings() {
        let content = "a=1\nb=2\n# a=1 again, but commented\n\n";
        assert!(check_dup_config(&[("config.properties".into(), content.into())]).is_empty());
    }

    #[test]
    fn dup_config_detects_repeated_jvm_flags() {
        let content = "-Xmx2G\n-XX:+UseG1GC\n-Xmx2G\n";
        let findings = check_dup_config(&[("jvm.config".to_string(), content.to_string())]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message.matches("-Xmx2G").count(), 2);
    }

    #[test]
    fn dup_config_reports_per_file() {
        let dup = "k=1\nk=2\n".to_string();
        let clean = "k=1\n".to_string();
        let findings = check_dup_config(&[
            ("config.properties".to_string(), dup),
            ("jvm.config".to_string(), clean),
        ]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("config.properties"));
    }
}
