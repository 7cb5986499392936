//! Cluster-scoped wrappers over raw runtime objects.
//!
//! One flat type composed around the runtime's own identifiers and label
//! map — containers, volumes, networks, and images all share it instead of
//! each growing its own wrapper hierarchy.

use std::collections::HashMap;

/// Label the compose files stamp on every object belonging to a cluster.
pub const CLUSTER_LABEL: &str = "com.quarry.cluster";

/// Label recording which module a container came from.
pub const MODULE_LABEL: &str = "com.quarry.module";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Container,
    Volume,
    Network,
    Image,
}

/// A runtime object that belongs (or may belong) to a cluster.
#[derive(Debug, Clone)]
pub struct ClusterResource {
    pub id: String,
    pub name: String,
    pub kind: ResourceKind,
    pub labels: HashMap<String, String>,
}

impl ClusterResource {
    /// The owning cluster, read from the cluster label. `None` for objects
    /// quarry did not create.
    #[must_use]
    pub fn cluster_name(&self) -> Option<&str> {
        self.labels.get(CLUSTER_LABEL).map(String::as_str)
    }

    /// The module this resource was provisioned by, if labeled.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.labels.get(MODULE_LABEL).map(String::as_str)
    }
}

/// Parse the `k=v,k=v` label string the runtime CLI prints in listings.
#[must_use]
pub fn parse_label_string(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let k = k.trim();
            if k.is_empty() {
                return None;
            }
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_name_reads_the_label() {
        let labels = parse_label_string("com.quarry.cluster=default,com.quarry.module=hive");
        let res = ClusterResource {
            id: "abc123".into(),
            name: "default-coordinator".into(),
            kind: ResourceKind::Container,
            labels,
        };
        assert_eq!(res.cluster_name(), Some("default"));
        assert_eq!(res.module(), Some("hive"));
    }

    #[test]
    fn unlabeled_resource_has_no_cluster() {
        let res = ClusterResource {
            id: "abc".into(),
            name: "postgres".into(),
            kind: ResourceKind::Volume,
            labels: HashMap::new(),
        };
        assert_eq!(res.cluster_name(), None);
    }

    #[test]
    fn parse_label_string_handles_empty_and_values_with_equals() {
        assert!(parse_label_string("").is_empty());
        let labels = parse_label_string("a=b=c,x=1");
        assert_eq!(labels.get("a").map(String::as_str), Some("b=c"));
        assert_eq!(labels.get("x").map(String::as_str), Some("1"));
    }
}
