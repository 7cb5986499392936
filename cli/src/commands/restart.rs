//! `quarry restart` — stop the cluster, then re-provision it with the
//! module selection recorded on its containers.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::RuntimeInspector as _;
use crate::application::services::cluster;
use crate::commands::provision::provision_cluster;

/// Run `quarry restart`.
///
/// # Errors
///
/// Returns an error if the listing, teardown, or re-provision fails.
pub async fn run(app: &AppContext) -> Result<()> {
    let containers = app.runtime.list_containers(&app.cluster_name).await?;
    let modules = cluster::module_selection(&containers);

    cluster::down(&app.runtime, &app.cluster_name, &app.reporter()).await?;
    provision_cluster(app, &modules).await
}
