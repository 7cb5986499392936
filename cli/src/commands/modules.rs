//! `quarry modules` — list installed library modules.

use anyhow::{Context, Result};
use serde_json::json;

use crate::app::AppContext;

/// Run `quarry modules`.
///
/// # Errors
///
/// Returns an error if the library cannot be read.
pub fn run(app: &AppContext) -> Result<()> {
    let modules = app.library.modules()?;

    if app.json {
        let listing: Vec<_> = modules
            .iter()
            .map(|m| json!({ "name": m.name, "metadata": m.metadata }))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).context("serializing module listing")?
        );
        return Ok(());
    }

    if modules.is_empty() {
        app.output.info("no modules installed");
        return Ok(());
    }
    for module in &modules {
        let marker = if module.metadata.enterprise { " (enterprise)" } else { "" };
        app.output.kv(
            &format!("{} [{}]{marker}", module.name, module.metadata.kind),
            &module.metadata.description,
        );
    }
    Ok(())
}
