//! Application layer — port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and `quarry_common` — never
//! on `crate::infra`, `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

#[allow(unused_imports)]
pub use ports::{
    ClusterExecutor, CommandRunner, ContainerRuntime, ContainerStats, ContainerSummary,
    NullReporter, PortProbe, Reporter, RuntimeExec, RuntimeInspector, RuntimeLifecycle,
    VolumeSummary,
};
