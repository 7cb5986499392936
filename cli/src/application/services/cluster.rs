//! Cluster lifecycle use-cases: provision, down, remove, statistics.
//!
//! Free functions generic over the port traits so tests can inject stubs.
//! Imports only from `crate::domain`, `crate::application::ports`, and
//! `quarry_common`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use futures_util::StreamExt as _;
use quarry_common::{ComposeFragment, ModuleMetadata};

use crate::application::ports::{
    ClusterExecutor, ContainerRuntime, ContainerStats, ContainerSummary, PortProbe, Reporter,
    RuntimeInspector, RuntimeLifecycle,
};
use crate::application::services::port_manager::PortManager;
use crate::domain::{
    Distribution, EnvironmentVariables, ExecOptions, ExecutionTarget, MODULE_LABEL, Severity,
    check_cluster_ver, check_dependent_clusters, check_dup_config, check_enterprise,
    check_incompatible, check_version_requirements,
};

/// Bounded worker pool size for bulk stop/remove and stats collection.
pub const TEARDOWN_CONCURRENCY: usize = 8;

/// Engine configuration files scanned for duplicate properties after
/// provisioning.
const CONFIG_FILES: [&str; 2] = ["config.properties", "jvm.config"];

/// One module chosen for provisioning, as the services layer sees it.
#[derive(Debug, Clone)]
pub struct SelectedModule {
    pub name: String,
    pub metadata: ModuleMetadata,
    pub fragment: ComposeFragment,
    /// Path of the module's compose fragment on disk, handed to
    /// `docker compose -f` verbatim.
    pub compose_file: PathBuf,
}

/// Everything one provisioning pass needs, assembled by the command layer.
#[derive(Debug)]
pub struct ProvisionPlan {
    pub cluster: String,
    pub dist: String,
    pub version: String,
    pub modules: Vec<SelectedModule>,
    /// The library's base compose file (coordinator + default services).
    pub base_compose: PathBuf,
}

/// Validate the plan and bring the cluster up.
///
/// Sequencing: validation → port assignment → `docker compose up` on the
/// host with the environment mapping exported → duplicate-config scan
/// (warnings only). Environment resolution has already completed when this
/// runs; `env` is only mutated through the port manager.
///
/// # Errors
///
/// Returns a user error for validation failures and a system error when
/// the runtime or compose invocation fails.
pub async fn provision(
    plan: &ProvisionPlan,
    executor: &impl ClusterExecutor,
    runtime: &impl ContainerRuntime,
    probe: &impl PortProbe,
    env: &mut EnvironmentVariables,
    reporter: &dyn Reporter,
) -> Result<()> {
    let metadata: Vec<(&str, &ModuleMetadata)> = plan
        .modules
        .iter()
        .map(|m| (m.name.as_str(), &m.metadata))
        .collect();

    check_cluster_ver(&plan.dist, &plan.version)?;
    check_version_requirements(&metadata, &plan.version)?;
    check_incompatible(&metadata)?;
    let dist: Distribution = plan.dist.parse()?;
    check_enterprise(&metadata, dist)?;
    for dep in check_dependent_clusters(&metadata) {
        reporter.info(&format!(
            "companion cluster '{}' is required and must be provisioned first",
            dep.name
        ));
    }

    let published = runtime
        .published_ports()
        .await
        .context("scanning published container ports")?;
    let fragments: Vec<(&str, &ComposeFragment)> = plan
        .modules
        .iter()
        .map(|m| (m.name.as_str(), &m.fragment))
        .collect();
    let mut ports = PortManager::new(probe, published);
    ports.set_external_ports(&fragments, env, reporter).await?;

    let compose = compose_up_command(plan);
    let mut opts = ExecOptions {
        env: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        ..ExecOptions::default()
    };
    opts.env
        .push(("COMPOSE_PROJECT_NAME".to_string(), plan.cluster.clone()));
    let results = executor
        .execute(&[compose], &ExecutionTarget::Host, &opts, reporter)
        .await
        .context("bringing the cluster up")?;
    if let Some(result) = results.first() {
        reporter.verbose(&format!(
            "compose up finished in {:.1}s",
            result.duration.as_secs_f64()
        ));
    }

    scan_rendered_config(executor, &plan.cluster, dist, reporter).await;
    Ok(())
}

fn compose_up_command(plan: &ProvisionPlan) -> String {
    let mut cmd = format!("docker compose -f {}", plan.base_compose.display());
    for module in &plan.modules {
        cmd.push_str(&format!(" -f {}", module.compose_file.display()));
    }
    cmd.push_str(" up -d");
    cmd
}

/// Read the rendered engine configuration out of the coordinator and warn
/// about duplicated property keys. Never fails the provision: a missing
/// file or exec failure is simply skipped.
async fn scan_rendered_config(
    executor: &impl ClusterExecutor,
    cluster: &str,
    dist: Distribution,
    reporter: &dyn Reporter,
) {
    let coordinator = format!("{cluster}-coordinator");
    let dir = match dist {
        Distribution::Trino => "/etc/trino",
        Distribution::Starburst => "/etc/starburst",
    };
    let target = ExecutionTarget::container(&coordinator);

    let mut files = Vec::new();
    for file in CONFIG_FILES {
        let Ok(results) = executor
            .execute(
                &[format!("cat {dir}/{file}")],
                &target,
                &ExecOptions::quiet_probe(),
                reporter,
            )
            .await
        else {
            continue;
        };
        if let Some(result) = results.first()
            && result.is_success()
        {
            files.push((file.to_string(), result.output.clone()));
        }
    }

    for finding in check_dup_config(&files) {
        // Duplicate keys are advisory; the engine resolves its own precedence.
        debug_assert_eq!(finding.severity, Severity::Warning);
        reporter.warn(&finding.message);
    }
}

/// Stop all running cluster containers through a bounded worker pool.
/// One container's failure is logged and does not abort the batch.
///
/// # Errors
///
/// Returns an error only when the container listing itself fails.
pub async fn down(
    runtime: &impl ContainerRuntime,
    cluster: &str,
    reporter: &dyn Reporter,
) -> Result<usize> {
    let running: Vec<ContainerSummary> = runtime
        .list_containers(cluster)
        .await
        .context("listing cluster containers")?
        .into_iter()
        .filter(ContainerSummary::is_running)
        .collect();

    if running.is_empty() {
        reporter.info(&format!("no running containers for cluster '{cluster}'"));
        return Ok(0);
    }

    let outcomes: Vec<bool> = futures_util::stream::iter(running.iter().map(|container| async move {
        match runtime.stop_container(&container.name).await {
            Ok(()) => {
                reporter.info(&format!("stopped {}", container.name));
                true
            }
            Err(e) => {
                reporter.warn(&format!("failed to stop {}: {e}", container.name));
                false
            }
        }
    }))
    .buffer_unordered(TEARDOWN_CONCURRENCY)
    .collect()
    .await;

    Ok(outcomes.into_iter().filter(|ok| *ok).count())
}

/// Remove all cluster containers (and, optionally, cluster volumes).
/// Same bounded pool and per-item isolation as [`down`].
///
/// # Errors
///
/// Returns an error only when a listing fails.
pub async fn remove(
    runtime: &impl ContainerRuntime,
    cluster: &str,
    volumes: bool,
    reporter: &dyn Reporter,
) -> Result<()> {
    let containers = runtime
        .list_containers(cluster)
        .await
        .context("listing cluster containers")?;

    futures_util::stream::iter(containers.iter().map(|container| async move {
        match runtime.remove_container(&container.name).await {
            Ok(()) => reporter.info(&format!("removed {}", container.name)),
            Err(e) => reporter.warn(&format!("failed to remove {}: {e}", container.name)),
        }
    }))
    .buffer_unordered(TEARDOWN_CONCURRENCY)
    .collect::<Vec<()>>()
    .await;

    if volumes {
        let named = runtime
            .list_volumes(cluster)
            .await
            .context("listing cluster volumes")?;
        futures_util::stream::iter(named.iter().map(|volume| async move {
            match runtime.remove_volume(&volume.name).await {
                Ok(()) => reporter.info(&format!("removed volume {}", volume.name)),
                Err(e) => reporter.warn(&format!("failed to remove volume {}: {e}", volume.name)),
            }
        }))
        .buffer_unordered(TEARDOWN_CONCURRENCY)
        .collect::<Vec<()>>()
        .await;
    }

    Ok(())
}

/// List cluster containers with per-container statistics, collected in
/// parallel with per-item exception isolation: a container whose stats
/// call fails is listed without them.
///
/// # Errors
///
/// Returns an error only when the container listing fails.
pub async fn collect_stats(
    runtime: &impl ContainerRuntime,
    cluster: &str,
    reporter: &dyn Reporter,
) -> Result<Vec<(ContainerSummary, Option<ContainerStats>)>> {
    let containers = runtime
        .list_containers(cluster)
        .await
        .context("listing cluster containers")?;

    let rows: Vec<(ContainerSummary, Option<ContainerStats>)> =
        futures_util::stream::iter(containers.into_iter().map(|container| async move {
            if !container.is_running() {
                return (container, None);
            }
            match runtime.container_stats(&container.name).await {
                Ok(stats) => (container, Some(stats)),
                Err(e) => {
                    reporter.warn(&format!("no statistics for {}: {e}", container.name));
                    (container, None)
                }
            }
        }))
        .buffer_unordered(TEARDOWN_CONCURRENCY)
        .collect()
        .await;

    Ok(rows)
}

/// Module names recorded on a cluster's containers, for `restart` to
/// re-provision the same selection.
#[must_use]
pub fn module_selection(containers: &[ContainerSummary]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for container in containers {
        if let Some(module) = container.labels.get(MODULE_LABEL)
            && !names.iter().any(|n| n == module)
        {
            names.push(module.clone());
        }
    }
    names
}
