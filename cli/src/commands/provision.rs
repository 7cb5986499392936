//! `quarry provision` — bring up a cluster with the selected modules.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::cluster::{self, ProvisionPlan, SelectedModule};

/// Arguments for the provision command.
#[derive(Args)]
pub struct ProvisionArgs {
    /// Module to include (repeatable)
    #[arg(short = 'm', long = "module", value_name = "NAME")]
    pub modules: Vec<String>,
}

/// Assemble a provisioning plan for the named modules, pulling in any
/// modules they declare as dependencies.
///
/// # Errors
///
/// Returns a user error for an unknown module name (selected or depended
/// upon).
pub(crate) fn build_plan(app: &AppContext, module_names: &[String]) -> Result<ProvisionPlan> {
    let mut queue: Vec<String> = module_names.to_vec();
    let mut modules: Vec<SelectedModule> = Vec::new();
    while let Some(name) = queue.pop() {
        if modules.iter().any(|m| m.name == name) {
            continue;
        }
        let module = app.library.module(&name)?;
        for dep in &module.metadata.dependent_modules {
            if !modules.iter().any(|m| m.name == *dep) {
                app.output
                    .info(&format!("module '{name}' pulls in dependent module '{dep}'"));
                queue.push(dep.clone());
            }
        }
        let compose_file = module.compose_file();
        modules.push(SelectedModule {
            name: module.name,
            metadata: module.metadata,
            fragment: module.fragment,
            compose_file,
        });
    }
    Ok(ProvisionPlan {
        cluster: app.cluster_name.clone(),
        dist: app.dist(),
        version: app.version(),
        modules,
        base_compose: app.library.base_compose(),
    })
}

/// Validate, assign ports, and bring the cluster up.
///
/// # Errors
///
/// Returns an error if validation, port assignment, or compose fails.
pub(crate) async fn provision_cluster(app: &AppContext, module_names: &[String]) -> Result<()> {
    let plan = build_plan(app, module_names)?;
    let mut env = app.env.clone();
    cluster::provision(
        &plan,
        &app.executor,
        &app.runtime,
        &app.probe,
        &mut env,
        &app.reporter(),
    )
    .await?;
    app.output
        .info(&format!("cluster '{}' is up", app.cluster_name));
    Ok(())
}

/// Run `quarry provision`.
///
/// # Errors
///
/// Returns an error if the cluster cannot be provisioned.
pub async fn run(app: &AppContext, args: &ProvisionArgs) -> Result<()> {
    provision_cluster(app, &args.modules).await
}
