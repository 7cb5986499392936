//! `quarry remove` — remove cluster containers and, optionally, volumes.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::cluster;

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Also remove cluster volumes (destroys catalog data)
    #[arg(long)]
    pub volumes: bool,
}

/// Run `quarry remove`.
///
/// # Errors
///
/// Returns an error if a listing fails or the confirmation prompt cannot
/// be shown; per-item removal failures are logged and do not abort.
pub async fn run(app: &AppContext, args: &RemoveArgs) -> Result<()> {
    if args.volumes {
        let confirmed = app.confirm(
            &format!(
                "Remove volumes for cluster '{}'? Data will be lost",
                app.cluster_name
            ),
            false,
        )?;
        if !confirmed {
            app.output.info("nothing removed");
            return Ok(());
        }
    }
    cluster::remove(&app.runtime, &app.cluster_name, args.volumes, &app.reporter()).await?;
    app.output
        .info(&format!("cluster '{}' removed", app.cluster_name));
    Ok(())
}
