//! Command-execution value types shared by the host and container back-ends.

use std::time::Duration;

/// Where a command runs: the host, or inside a named running container.
///
/// Dispatch pattern-matches exhaustively on this — there is no
/// keyword-presence sniffing anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionTarget {
    Host,
    Container(String),
}

impl ExecutionTarget {
    #[must_use]
    pub fn container(name: impl Into<String>) -> Self {
        ExecutionTarget::Container(name.into())
    }
}

/// Per-call execution options. `Default` gives the common case: raise on
/// failure, log output incrementally, non-interactive.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Raise a system error on non-zero exit instead of returning the
    /// result. Callers wanting inspection-without-raising set this false.
    pub trigger_error: bool,
    /// Disable incremental line logging. `CommandResult::output` is
    /// populated either way.
    pub suppress_output: bool,
    /// Host only: attach the subprocess to the controlling terminal with no
    /// capture.
    pub interactive: bool,
    /// Extra environment exported to the subprocess (host only).
    pub env: Vec<(String, String)>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            trigger_error: true,
            suppress_output: false,
            interactive: false,
            env: Vec::new(),
        }
    }
}

impl ExecOptions {
    /// Options for plumbing calls: no raise, no incremental logging.
    #[must_use]
    pub fn quiet_probe() -> Self {
        Self {
            trigger_error: false,
            suppress_output: true,
            ..Self::default()
        }
    }
}

/// Outcome of one execution attempt. Immutable once constructed; batch
/// calls produce exactly one instance per input command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// The command string as submitted.
    pub command: String,
    /// Combined stdout and stderr, terminal control codes stripped.
    pub output: String,
    /// Process exit code; `-1` when the back-end failed before or during
    /// the run (spawn failure, exec setup failure, killed by signal).
    pub exit_code: i32,
    pub duration: Duration,
    /// Populated on non-zero exit or back-end failure.
    pub error: Option<String>,
}

impl CommandResult {
    /// Result for a command that never produced an exit status.
    #[must_use]
    pub fn backend_failure(command: &str, error: String) -> Self {
        Self {
            command: command.to_string(),
            output: String::new(),
            exit_code: -1,
            duration: Duration::ZERO,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_raise_and_log() {
        let opts = ExecOptions::default();
        assert!(opts.trigger_error);
        assert!(!opts.suppress_output);
        assert!(!opts.interactive);
    }

    #[test]
    fn backend_failure_uses_sentinel_exit_code() {
        let result = CommandResult::backend_failure("docker ps", "spawn failed".to_string());
        assert_eq!(result.exit_code, -1);
        assert!(!result.is_success());
        assert_eq!(result.error.as_deref(), Some("spawn failed"));
    }
}
