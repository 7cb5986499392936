//! Docker CLI adapter — routes all runtime calls through a `CommandRunner`.
//!
//! Generic over `R: CommandRunner` so that tests can inject a mock runner
//! without spawning real processes.

use std::process::Output;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::application::ports::{
    CommandRunner, ContainerStats, ContainerSummary, RuntimeExec, RuntimeInspector,
    RuntimeLifecycle, VolumeSummary,
};
use crate::domain::{CLUSTER_LABEL, parse_label_string};
use crate::infra::command_runner::TokioCommandRunner;

/// The container runtime binary on PATH.
pub const DOCKER_BIN: &str = "docker";

/// Infrastructure adapter shelling out to the `docker` binary.
pub struct DockerCli<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> DockerCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl DockerCli<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner() -> Self {
        Self::new(TokioCommandRunner)
    }
}

fn ensure_success(what: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("{what} failed: {}", stderr.trim())
}

fn cluster_filter(cluster: &str) -> String {
    format!("label={CLUSTER_LABEL}={cluster}")
}

// ── Listing output parsing ────────────────────────────────────────────────────

/// One `docker ps --format '{{json .}}'` line.
#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

/// One `docker volume ls --format '{{json .}}'` line.
#[derive(Deserialize)]
struct VolumeLine {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

/// One `docker stats --no-stream --format '{{json .}}'` line.
#[derive(Deserialize)]
struct StatsLine {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "CPUPerc", default)]
    cpu: String,
    #[serde(rename = "MemUsage", default)]
    memory: String,
}

pub(crate) fn parse_container_listing(raw: &str) -> Result<Vec<ContainerSummary>> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let row: PsLine =
                serde_json::from_str(line).context("parsing container listing line")?;
            Ok(ContainerSummary {
                id: row.id,
                name: row.names,
                state: row.state,
                labels: parse_label_string(&row.labels),
            })
        })
        .collect()
}

pub(crate) fn parse_volume_listing(raw: &str) -> Result<Vec<VolumeSummary>> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let row: VolumeLine =
                serde_json::from_str(line).context("parsing volume listing line")?;
            Ok(VolumeSummary {
                name: row.name,
                labels: parse_label_string(&row.labels),
            })
        })
        .collect()
}

/// Extract host ports from `docker ps --format '{{.Ports}}'` output, e.g.
/// `0.0.0.0:8080->8080/tcp, [::]:8080->8080/tcp`.
pub(crate) fn parse_published_ports(raw: &str) -> Vec<u16> {
    static PORT_RE: OnceLock<Regex> = OnceLock::new();
    let re = PORT_RE.get_or_init(|| {
        Regex::new(r":(\d+)->").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    });
    let mut ports: Vec<u16> = re
        .captures_iter(raw)
        .filter_map(|cap| cap[1].parse().ok())
        .collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}

impl<R: CommandRunner> RuntimeInspector for DockerCli<R> {
    async fn list_containers(&self, cluster: &str) -> Result<Vec<ContainerSummary>> {
        let filter = cluster_filter(cluster);
        let output = self
            .runner
            .run(
                DOCKER_BIN,
                &["ps", "-a", "--filter", &filter, "--format", "{{json .}}"],
            )
            .await
            .context("failed to run docker ps")?;
        ensure_success("docker ps", &output)?;
        parse_container_listing(&String::from_utf8_lossy(&output.stdout))
    }

    async fn list_volumes(&self, cluster: &str) -> Result<Vec<VolumeSummary>> {
        let filter = cluster_filter(cluster);
        let output = self
            .runner
            .run(
                DOCKER_BIN,
                &["volume", "ls", "--filter", &filter, "--format", "{{json .}}"],
            )
            .await
            .context("failed to run docker volume ls")?;
        ensure_success("docker volume ls", &output)?;
        parse_volume_listing(&String::from_utf8_lossy(&output.stdout))
    }

    async fn published_ports(&self) -> Result<Vec<u16>> {
        let output = self
            .runner
            .run(DOCKER_BIN, &["ps", "--format", "{{.Ports}}"])
            .await
            .context("failed to run docker ps")?;
        ensure_success("docker ps", &output)?;
        Ok(parse_published_ports(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn container_stats(&self, name: &str) -> Result<ContainerStats> {
        let output = self
            .runner
            .run(
                DOCKER_BIN,
                &["stats", "--no-stream", "--format", "{{json .}}", name],
            )
            .await
            .context("failed to run docker stats")?;
        ensure_success("docker stats", &output)?;
        let text = String::from_utf8_lossy(&output.stdout);
        let line = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .with_context(|| format!("docker stats returned nothing for {name}"))?;
        let row: StatsLine = serde_json::from_str(line).context("parsing docker stats line")?;
        Ok(ContainerStats {
            name: row.name,
            cpu: row.cpu,
            memory: row.memory,
        })
    }
}

impl<R: CommandRunner> RuntimeLifecycle for DockerCli<R> {
    async fn stop_container(&self, name: &str) -> Result<()> {
        let output = self
            .runner
            .run(DOCKER_BIN, &["stop", name])
            .await
            .context("failed to run docker stop")?;
        ensure_success("docker stop", &output)
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        let output = self
            .runner
            .run(DOCKER_BIN, &["rm", "-f", name])
            .await
            .context("failed to run docker rm")?;
        ensure_success("docker rm", &output)
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        let output = self
            .runner
            .run(DOCKER_BIN, &["volume", "rm", name])
            .await
            .context("failed to run docker volume rm")?;
        ensure_success("docker volume rm", &output)
    }
}

impl<R: CommandRunner> RuntimeExec for DockerCli<R> {
    async fn exec(&self, container: &str, argv: &[&str]) -> Result<Output> {
        let mut args: Vec<&str> = vec!["exec", container];
        args.extend_from_slice(argv);
        self.runner
            .run(DOCKER_BIN, &args)
            .await
            .context("failed to run docker exec")
    }

    fn exec_spawn(&self, container: &str, argv: &[&str]) -> Result<tokio::process::Child> {
        let mut args: Vec<&str> = vec!["exec", container];
        args.extend_from_slice(argv);
        self.runner
            .spawn(DOCKER_BIN, &args)
            .context("failed to spawn docker exec")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_container_listing_reads_labels_and_state() {
        let raw = concat!(
            r#"{"ID":"1a2b3c","Names":"default-coordinator","State":"running","Labels":"com.quarry.cluster=default,com.quarry.module=hive"}"#,
            "\n",
            r#"{"ID":"4d5e6f","Names":"default-postgres","State":"exited","Labels":"com.quarry.cluster=default"}"#,
            "\n",
        );
        let containers = parse_container_listing(raw).expect("listing");
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "default-coordinator");
        assert!(containers[0].is_running());
        assert_eq!(
            containers[0].labels.get("com.quarry.module").map(String::as_str),
            Some("hive")
        );
        assert!(!containers[1].is_running());
    }

    #[test]
    fn parse_container_listing_skips_blank_lines() {
        let containers = parse_container_listing("\n\n").expect("empty listing");
        assert!(containers.is_empty());
    }

    #[test]
    fn parse_published_ports_extracts_and_dedupes() {
        let raw = "0.0.0.0:8080->8080/tcp, [::]:8080->8080/tcp\n0.0.0.0:5432->5432/tcp\n\n";
        assert_eq!(parse_published_ports(raw), vec![5432, 8080]);
    }

    #[test]
    fn parse_published_ports_ignores_container_side_ports() {
        // An unpublished port renders without the arrow form.
        assert!(parse_published_ports("8080/tcp").is_empty());
    }

    #[test]
    fn parse_volume_listing_reads_names() {
        let raw = r#"{"Name":"default-data","Labels":"com.quarry.cluster=default"}"#;
        let volumes = parse_volume_listing(raw).expect("listing");
        assert_eq!(volumes[0].name, "default-data");
    }
}
