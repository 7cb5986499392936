//! Application context — unified state passed to every command handler.
//!
//! Constructed once in `Cli::run()` and exclusively owned by that one
//! invocation: the environment mapping, the Docker adapter, and the
//! executor never cross a thread boundary.

use anyhow::Result;

use crate::domain::{EnvironmentVariables, parse_user_env};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::docker::DockerCli;
use crate::infra::executor::CommandExecutor;
use crate::infra::library::Library;
use crate::infra::network::TokioPortProbe;
use crate::infra::resolver::{default_config_path, resolve_environment};
use crate::output::{OutputContext, TerminalReporter};

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Show `[v]` lines and error chains.
    pub verbose: bool,
    /// Enable JSON output mode.
    pub json: bool,
    /// Skip interactive prompts (also set by `CI` / `QUARRY_YES` env vars).
    pub yes: bool,
    /// Explicit cluster name; falls back to `CLUSTER_NAME`, then "default".
    pub cluster: Option<String>,
    /// Repeated `--env KEY=VALUE` flags.
    pub env: Vec<String>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet, verbose).
    pub output: OutputContext,
    /// The cluster this invocation targets.
    pub cluster_name: String,
    /// Fully resolved environment mapping.
    pub env: EnvironmentVariables,
    /// The installed module library.
    pub library: Library,
    /// Docker CLI adapter.
    pub runtime: DockerCli<TokioCommandRunner>,
    /// Dual-mode command executor.
    pub executor: CommandExecutor<DockerCli<TokioCommandRunner>>,
    /// Loopback bind probe for port assignment.
    pub probe: TokioPortProbe,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    /// When `true`, commands emit machine-readable JSON.
    pub json: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// `--env` pairs are parsed first (they are the highest-precedence
    /// source and their errors must surface before anything else), then the
    /// library is located and the environment resolved.
    ///
    /// # Errors
    ///
    /// Returns a user error for unparsable `--env` pairs or a missing
    /// module library.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let output = OutputContext::new(flags.no_color, flags.quiet, flags.verbose);
        let user_env = parse_user_env(&flags.env)?;
        let library = Library::locate(None)?;
        let env = {
            let reporter = TerminalReporter::new(&output);
            resolve_environment(user_env, &default_config_path(), &library, &reporter)?
        };
        output.verbose(&format!("resolved {} environment variables", env.len()));

        let cluster_name = flags
            .cluster
            .clone()
            .unwrap_or_else(|| env.get("CLUSTER_NAME", "default"));
        let ci_env = std::env::var("CI").is_ok() || std::env::var("QUARRY_YES").is_ok();

        Ok(Self {
            output,
            cluster_name,
            env,
            library,
            runtime: DockerCli::default_runner(),
            executor: CommandExecutor::default_runtime(),
            probe: TokioPortProbe,
            non_interactive: flags.yes || ci_env,
            json: flags.json,
        })
    }

    /// Reporter view over this context's output.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// The cluster's distribution, from the environment mapping.
    #[must_use]
    pub fn dist(&self) -> String {
        self.env.get("CLUSTER_DIST", "trino")
    }

    /// The cluster's version string, from the environment mapping.
    #[must_use]
    pub fn version(&self) -> String {
        self.env.get("CLUSTER_VER", "")
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `QUARRY_YES`
    /// env), returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
