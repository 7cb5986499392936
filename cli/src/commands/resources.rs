//! `quarry resources` — list cluster containers and volumes with
//! per-container statistics.

use anyhow::{Context, Result};
use serde_json::json;

use crate::app::AppContext;
use crate::application::ports::RuntimeInspector as _;
use crate::application::services::cluster;
use crate::domain::{ClusterResource, ResourceKind};

/// Run `quarry resources`.
///
/// # Errors
///
/// Returns an error if a listing fails; a single container's statistics
/// failure is logged and the container is listed without them.
pub async fn run(app: &AppContext) -> Result<()> {
    let pb = (app.output.show_progress() && !app.json)
        .then(|| crate::output::progress::spinner("collecting statistics..."));
    let rows = cluster::collect_stats(&app.runtime, &app.cluster_name, &app.reporter()).await?;
    let volumes = app.runtime.list_volumes(&app.cluster_name).await?;
    if let Some(pb) = pb {
        crate::output::progress::finish_ok(&pb, &format!("{} container(s)", rows.len()));
    }

    if app.json {
        let containers: Vec<_> = rows
            .iter()
            .map(|(container, stats)| {
                json!({
                    "name": container.name,
                    "state": container.state,
                    "cpu": stats.as_ref().map(|s| s.cpu.clone()),
                    "memory": stats.as_ref().map(|s| s.memory.clone()),
                })
            })
            .collect();
        let volume_names: Vec<&str> = volumes.iter().map(|v| v.name.as_str()).collect();
        let doc = json!({ "containers": containers, "volumes": volume_names });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("serializing resource listing")?
        );
        return Ok(());
    }

    if rows.is_empty() && volumes.is_empty() {
        app.output.info(&format!(
            "no resources for cluster '{}'",
            app.cluster_name
        ));
        return Ok(());
    }

    if !rows.is_empty() {
        app.output.header("containers");
        for (container, stats) in &rows {
            let resource = ClusterResource {
                id: container.id.clone(),
                name: container.name.clone(),
                kind: ResourceKind::Container,
                labels: container.labels.clone(),
            };
            let mut detail = match stats {
                Some(s) => format!("{}  cpu {}  mem {}", container.state, s.cpu, s.memory),
                None => container.state.clone(),
            };
            if let Some(module) = resource.module() {
                detail.push_str(&format!("  [{module}]"));
            }
            app.output.kv(&resource.name, &detail);
        }
    }
    if !volumes.is_empty() {
        app.output.header("volumes");
        for volume in &volumes {
            let resource = ClusterResource {
                id: volume.name.clone(),
                name: volume.name.clone(),
                kind: ResourceKind::Volume,
                labels: volume.labels.clone(),
            };
            app.output.kv(
                &resource.name,
                resource.cluster_name().unwrap_or_default(),
            );
        }
    }
    Ok(())
}
