//! `quarry down` — stop cluster containers, preserving all data.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::cluster;

/// Run `quarry down`.
///
/// # Errors
///
/// Returns an error if the container listing fails; per-container stop
/// failures are logged and do not abort the batch.
pub async fn run(app: &AppContext) -> Result<()> {
    let stopped = cluster::down(&app.runtime, &app.cluster_name, &app.reporter()).await?;
    if stopped > 0 {
        app.output.info(&format!(
            "stopped {stopped} container(s); data is preserved"
        ));
    }
    Ok(())
}
