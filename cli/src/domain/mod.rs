//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod environment;
pub mod error;
pub mod execution;
pub mod ports;
pub mod resource;
pub mod validation;

#[allow(unused_imports)]
pub use environment::{EnvironmentVariables, OS_ENV_ALLOWLIST, RESERVED_PORT_PREFIX, parse_user_env};
#[allow(unused_imports)]
pub use error::{USER_ERROR_EXIT, UserError};
#[allow(unused_imports)]
pub use execution::{CommandResult, ExecOptions, ExecutionTarget};
#[allow(unused_imports)]
pub use ports::{MAX_PORT_SCAN, PortAssignment, ServicePort, parse_port_spec};
#[allow(unused_imports)]
pub use resource::{CLUSTER_LABEL, ClusterResource, MODULE_LABEL, ResourceKind, parse_label_string};
#[allow(unused_imports)]
pub use validation::{
    DEPENDENT_CLUSTER_PREFIX, Distribution, ENTERPRISE_SUFFIX, MIN_CLUSTER_VER, Severity,
    ValidationFinding, check_cluster_ver, check_dependent_clusters, check_dup_config,
    check_enterprise, check_incompatible, check_version_requirements, parse_major,
};
