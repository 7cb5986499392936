//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `quarry_common` — never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::collections::HashMap;
use std::process::Output;

use anyhow::Result;

use crate::domain::{CommandResult, ExecOptions, ExecutionTarget};

// ── Value Types ───────────────────────────────────────────────────────────────

/// One container row from a runtime listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    /// Runtime state string, e.g. `"running"` or `"exited"`.
    pub state: String,
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// One volume row from a runtime listing.
#[derive(Debug, Clone)]
pub struct VolumeSummary {
    pub name: String,
    pub labels: HashMap<String, String>,
}

/// Point-in-time statistics for one container.
#[derive(Debug, Clone)]
pub struct ContainerStats {
    pub name: String,
    /// CPU usage as the runtime reports it, e.g. `"1.25%"`.
    pub cpu: String,
    /// Memory usage as the runtime reports it, e.g. `"210MiB / 7.6GiB"`.
    pub memory: String,
}

// ── Runtime Port Traits ───────────────────────────────────────────────────────

/// Read-only queries against the container runtime.
#[allow(async_fn_in_trait)]
pub trait RuntimeInspector {
    /// List all containers (running and stopped) labeled for `cluster`.
    async fn list_containers(&self, cluster: &str) -> Result<Vec<ContainerSummary>>;
    /// List all volumes labeled for `cluster`.
    async fn list_volumes(&self, cluster: &str) -> Result<Vec<VolumeSummary>>;
    /// Host ports currently published by any running container.
    async fn published_ports(&self) -> Result<Vec<u16>>;
    /// One-shot statistics for a single container.
    async fn container_stats(&self, name: &str) -> Result<ContainerStats>;
}

/// Destructive runtime operations on a single object.
#[allow(async_fn_in_trait)]
pub trait RuntimeLifecycle {
    async fn stop_container(&self, name: &str) -> Result<()>;
    async fn remove_container(&self, name: &str) -> Result<()>;
    async fn remove_volume(&self, name: &str) -> Result<()>;
}

/// Command execution inside a running container.
#[allow(async_fn_in_trait)]
pub trait RuntimeExec {
    /// Execute `argv` inside `container` and capture output.
    async fn exec(&self, container: &str, argv: &[&str]) -> Result<Output>;
    /// Spawn `argv` inside `container` with piped stdout/stderr for
    /// line streaming.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn exec_spawn(&self, container: &str, argv: &[&str]) -> Result<tokio::process::Child>;
}

/// Composite trait — any type implementing the three runtime sub-traits is a
/// `ContainerRuntime`.
pub trait ContainerRuntime: RuntimeInspector + RuntimeLifecycle + RuntimeExec {}

impl<T> ContainerRuntime for T where T: RuntimeInspector + RuntimeLifecycle + RuntimeExec {}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts host process execution so infrastructure can be swapped or
/// mocked. There is deliberately no timeout: a hung command blocks until an
/// external signal cancels the invocation.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Spawn a program with piped stdout/stderr without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
}

// ── Executor Port ─────────────────────────────────────────────────────────────

/// Dual-mode command execution: host subprocess or in-container exec,
/// selected by the [`ExecutionTarget`] tag.
#[allow(async_fn_in_trait)]
pub trait ClusterExecutor {
    /// Execute each command in order against `target`. N input commands
    /// always produce N results unless `opts.trigger_error` aborts on a
    /// failing command; back-end failures are captured into results with
    /// exit code `-1` rather than propagated.
    async fn execute(
        &self,
        commands: &[String],
        target: &ExecutionTarget,
        opts: &ExecOptions,
        reporter: &dyn Reporter,
    ) -> Result<Vec<CommandResult>>;

    /// Execute one command and yield its output line by line. The caller
    /// pulls lines synchronously from the returned channel.
    async fn stream_execute(
        &self,
        command: &str,
        target: &ExecutionTarget,
        opts: &ExecOptions,
    ) -> Result<tokio::sync::mpsc::Receiver<String>>;
}

// ── Network Probe Port ────────────────────────────────────────────────────────

/// Abstracts local socket probing so port assignment can be tested without
/// real network access.
#[allow(async_fn_in_trait)]
pub trait PortProbe {
    /// Whether `127.0.0.1:port` can currently be bound.
    async fn can_bind(&self, port: u16) -> bool;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts log emission so application services can emit the fixed-prefix
/// log lines without depending on the Presentation layer. Sync and
/// object-safe — executor back-ends hold it as `&dyn Reporter`.
pub trait Reporter {
    /// `[i]` line.
    fn info(&self, message: &str);
    /// `[w]` line.
    fn warn(&self, message: &str);
    /// `[v]` line, shown only in verbose mode.
    fn verbose(&self, message: &str);
}

/// Reporter that discards everything — for probes and tests.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn verbose(&self, _: &str) {}
}
