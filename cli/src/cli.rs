//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Local SQL query-engine clusters on Docker
#[derive(Parser)]
#[command(
    name = "quarry",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Show per-line command output and error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip interactive prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Target cluster (defaults to CLUSTER_NAME, then "default")
    #[arg(long, global = true)]
    pub cluster: Option<String>,

    /// Set an environment variable (repeatable)
    #[arg(long = "env", global = true, value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bring up a cluster with the selected modules
    Provision(commands::provision::ProvisionArgs),

    /// Stop cluster containers (preserves state)
    Down,

    /// Remove cluster containers and, optionally, volumes
    Remove(commands::remove::RemoveArgs),

    /// Stop and re-provision with the same module selection
    Restart,

    /// List cluster containers and volumes with statistics
    Resources,

    /// List installed library modules
    Modules,

    /// Show CLI and library versions
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails; `main` maps user errors and
    /// system errors to their exit codes.
    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Command::Version) {
            commands::version::run(self.json);
            return Ok(());
        }

        let flags = AppFlags {
            no_color: self.no_color,
            quiet: self.quiet,
            verbose: self.verbose,
            json: self.json,
            yes: self.yes,
            cluster: self.cluster,
            env: self.env,
        };
        let app = AppContext::new(&flags)?;

        match self.command {
            Command::Provision(args) => commands::provision::run(&app, &args).await,
            Command::Down => commands::down::run(&app).await,
            Command::Remove(args) => commands::remove::run(&app, &args).await,
            Command::Restart => commands::restart::run(&app).await,
            Command::Resources => commands::resources::run(&app).await,
            Command::Modules => commands::modules::run(&app),
            Command::Version => unreachable!("handled above"),
        }
    }
}
