//! The dispatching command executor: host subprocess or in-container exec,
//! selected by pattern-matching the execution target.
//!
//! The container back-end resolves a working shell per container by probing
//! a fixed preference order, retrying for a bounded window because a
//! just-started container may not yet accept exec calls. The resolved shell
//! is memoized for the lifetime of the executor instance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::application::ports::{ClusterExecutor, Reporter, RuntimeExec};
use crate::domain::{CommandResult, ExecOptions, ExecutionTarget};
use crate::infra::command_runner::{
    TokioCommandRunner, run_shell_captured, run_shell_interactive, spawn_shell,
};
use crate::infra::docker::DockerCli;

/// Shells probed inside a container, in preference order.
pub const SHELL_CANDIDATES: [&str; 5] = [
    "/usr/bin/bash",
    "/bin/bash",
    "/usr/local/bin/bash",
    "/bin/sh",
    "sh",
];

const SHELL_PROBE_WINDOW: Duration = Duration::from_secs(10);
const SHELL_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Dual-mode command executor over a container runtime.
pub struct CommandExecutor<D: RuntimeExec> {
    runtime: D,
    /// Container name → resolved shell, memoized once per executor instance.
    shells: Mutex<HashMap<String, String>>,
    probe_window: Duration,
    probe_interval: Duration,
}

impl CommandExecutor<DockerCli<TokioCommandRunner>> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runtime() -> Self {
        Self::new(DockerCli::default_runner())
    }
}

impl<D: RuntimeExec> CommandExecutor<D> {
    pub fn new(runtime: D) -> Self {
        Self {
            runtime,
            shells: Mutex::new(HashMap::new()),
            probe_window: SHELL_PROBE_WINDOW,
            probe_interval: SHELL_PROBE_INTERVAL,
        }
    }

    /// Override the shell-probe retry budget (tests).
    #[must_use]
    pub fn with_probe_window(mut self, window: Duration, interval: Duration) -> Self {
        self.probe_window = window;
        self.probe_interval = interval;
        self
    }

    fn cached_shell(&self, container: &str) -> Option<String> {
        self.shells
            .lock()
            .ok()
            .and_then(|cache| cache.get(container).cloned())
    }

    /// Find a shell that responds inside `container`, retrying until the
    /// probe window closes.
    async fn resolve_shell(&self, container: &str) -> Result<String> {
        if let Some(shell) = self.cached_shell(container) {
            return Ok(shell);
        }
        let deadline = Instant::now() + self.probe_window;
        loop {
            for candidate in SHELL_CANDIDATES {
                let probe = self
                    .runtime
                    .exec(container, &[candidate, "-c", "true"])
                    .await;
                if let Ok(output) = probe
                    && output.status.success()
                {
                    if let Ok(mut cache) = self.shells.lock() {
                        cache.insert(container.to_string(), candidate.to_string());
                    }
                    return Ok(candidate.to_string());
                }
            }
            if Instant::now() >= deadline {
                anyhow::bail!(
                    "no working shell responded in container '{container}' within {}s",
                    self.probe_window.as_secs_f64()
                );
            }
            tokio::time::sleep(self.probe_interval).await;
        }
    }

    async fn run_host(
        &self,
        command: &str,
        opts: &ExecOptions,
        reporter: &dyn Reporter,
    ) -> Result<CommandResult> {
        if opts.interactive {
            run_shell_interactive(command, opts).await
        } else {
            run_shell_captured(command, opts, reporter).await
        }
    }

    async fn run_container(
        &self,
        container: &str,
        command: &str,
        opts: &ExecOptions,
        reporter: &dyn Reporter,
    ) -> Result<CommandResult> {
        let shell = self.resolve_shell(container).await?;
        let start = Instant::now();
        let output = self
            .runtime
            .exec(container, &[shell.as_str(), "-c", command])
            .await
            .with_context(|| format!("exec in container '{container}'"))?;

        // The exec stream arrives as raw byte chunks; reassemble into
        // complete lines before anything line-oriented sees them.
        let mut combined = String::new();
        combined.push_str(&String::from_utf8_lossy(&output.stdout));
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let mut text = String::new();
        for line in combined.lines() {
            let clean = console::strip_ansi_codes(line);
            text.push_str(&clean);
            text.push('\n');
            if !opts.suppress_output {
                reporter.verbose(&clean);
            }
        }

        let exit_code = output.status.code().unwrap_or(-1);
        Ok(CommandResult {
            command: command.to_string(),
            output: text,
            exit_code,
            duration: start.elapsed(),
            error: (exit_code != 0).then(|| format!("exit code {exit_code}")),
        })
    }

    async fn run_one(
        &self,
        command: &str,
        target: &ExecutionTarget,
        opts: &ExecOptions,
        reporter: &dyn Reporter,
    ) -> Result<CommandResult> {
        match target {
            ExecutionTarget::Host => self.run_host(command, opts, reporter).await,
            ExecutionTarget::Container(name) => {
                self.run_container(name, command, opts, reporter).await
            }
        }
    }
}

impl<D: RuntimeExec> ClusterExecutor for CommandExecutor<D> {
    async fn execute(
        &self,
        commands: &[String],
        target: &ExecutionTarget,
        opts: &ExecOptions,
        reporter: &dyn Reporter,
    ) -> Result<Vec<CommandResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            // Back-end failures become results, not propagated errors, so
            // N commands always yield N results in non-raising mode.
            let result = match self.run_one(command, target, opts, reporter).await {
                Ok(result) => result,
                Err(e) => CommandResult::backend_failure(command, format!("{e:#}")),
            };
            if !result.is_success() && opts.trigger_error {
                anyhow::bail!(
                    "command '{}' failed with exit code {}\n{}",
                    result.command,
                    result.exit_code,
                    result.error.as_deref().unwrap_or_default()
                );
            }
            results.push(result);
        }
        Ok(results)
    }

    async fn stream_execute(
        &self,
        command: &str,
        target: &ExecutionTarget,
        opts: &ExecOptions,
    ) -> Result<mpsc::Receiver<String>> {
        let child = match target {
            ExecutionTarget::Host => spawn_shell(command, opts)?,
            ExecutionTarget::Container(name) => {
                let shell = self.resolve_shell(name).await?;
                self.runtime.exec_spawn(name, &[shell.as_str(), "-c", command])?
            }
        };
        Ok(pump_lines(child))
    }
}

/// Pipe a child's stdout and stderr into a line channel, ANSI-stripped.
/// The caller pulls lines; the child is reaped when its pipes close.
fn pump_lines(mut child: tokio::process::Child) -> mpsc::Receiver<String> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let (tx, rx) = mpsc::channel(64);
    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(console::strip_ansi_codes(&line).into_owned()).await.is_err() {
                    break;
                }
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(console::strip_ansi_codes(&line).into_owned()).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);
    tokio::spawn(async move {
        let _ = child.wait().await;
    });
    rx
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::process::Output;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::application::ports::NullReporter;

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    fn ok_output(stdout: &[u8]) -> Output {
        Output {
            status: exit_status(0),
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
        }
    }

    fn fail_output() -> Output {
        Output {
            status: exit_status(1),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Runtime stub: `working_shell` answers probes; every other shell
    /// fails. Non-probe commands return `canned` with exit 0.
    struct ExecStub {
        working_shell: Option<&'static str>,
        canned: Vec<u8>,
        probes: StdMutex<u32>,
    }

    impl ExecStub {
        fn new(working_shell: Option<&'static str>) -> Self {
            Self {
                working_shell,
                canned: b"hello\n".to_vec(),
                probes: StdMutex::new(0),
            }
        }
    }

    impl RuntimeExec for ExecStub {
        async fn exec(&self, _: &str, argv: &[&str]) -> anyhow::Result<Output> {
            if argv.get(2) == Some(&"true") {
                *self.probes.lock().expect("lock") += 1;
                return if Some(argv[0]) == self.working_shell {
                    Ok(ok_output(b""))
                } else {
                    Ok(fail_output())
                };
            }
            Ok(ok_output(&self.canned))
        }
        fn exec_spawn(&self, _: &str, _: &[&str]) -> anyhow::Result<tokio::process::Child> {
            anyhow::bail!("not expected")
        }
    }

    fn tight_executor(stub: ExecStub) -> CommandExecutor<ExecStub> {
        CommandExecutor::new(stub)
            .with_probe_window(Duration::from_millis(50), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn container_execution_uses_the_resolved_shell() {
        let exec = tight_executor(ExecStub::new(Some("/bin/sh")));
        let results = exec
            .execute(
                &["cat /etc/hostname".to_string()],
                &ExecutionTarget::container("default-coordinator"),
                &ExecOptions::default(),
                &NullReporter,
            )
            .await
            .expect("execute");
        assert_eq!(results[0].output, "hello\n");
        assert_eq!(results[0].exit_code, 0);
    }

    #[tokio::test]
    async fn shell_is_memoized_per_executor_instance() {
        let exec = tight_executor(ExecStub::new(Some("/usr/bin/bash")));
        let target = ExecutionTarget::container("c1");
        for _ in 0..3 {
            exec.execute(
                &["echo x".to_string()],
                &target,
                &ExecOptions::default(),
                &NullReporter,
            )
            .await
            .expect("execute");
        }
        // "/usr/bin/bash" is first in preference order, so exactly one
        // probe round resolves it; later calls hit the cache.
        assert_eq!(*exec.runtime.probes.lock().expect("lock"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shell_detection_fails_within_the_retry_budget() {
        let exec = CommandExecutor::new(ExecStub::new(None))
            .with_probe_window(Duration::from_secs(2), Duration::from_millis(100));
        let err = exec
            .resolve_shell("stubborn-container")
            .await
            .expect_err("no shell anywhere");
        assert!(
            err.to_string().contains("stubborn-container"),
            "error must name the container: {err}"
        );
    }

    #[tokio::test]
    async fn host_false_raises_a_system_error_by_default() {
        let exec = tight_executor(ExecStub::new(None));
        let err = exec
            .execute(
                &["false".to_string()],
                &ExecutionTarget::Host,
                &ExecOptions::default(),
                &NullReporter,
            )
            .await
            .expect_err("trigger_error raises");
        assert!(err.to_string().contains("exit code 1"), "message: {err}");
    }

    #[tokio::test]
    async fn host_false_returns_result_when_not_raising() {
        let exec = tight_executor(ExecStub::new(None));
        let opts = ExecOptions {
            trigger_error: false,
            ..ExecOptions::default()
        };
        let results = exec
            .execute(
                &["false".to_string()],
                &ExecutionTarget::Host,
                &opts,
                &NullReporter,
            )
            .await
            .expect("no raise");
        assert_eq!(results[0].exit_code, 1);
        assert!(results[0].error.is_some());
    }

    #[tokio::test]
    async fn batch_yields_one_result_per_command_even_on_backend_failure() {
        // No shell ever answers, so the container back-end fails outright;
        // each failure is captured as an exit_code=-1 result.
        let exec = CommandExecutor::new(ExecStub::new(None))
            .with_probe_window(Duration::from_millis(20), Duration::from_millis(5));
        let opts = ExecOptions {
            trigger_error: false,
            ..ExecOptions::default()
        };
        let commands = vec!["echo a".to_string(), "echo b".to_string()];
        let results = exec
            .execute(
                &commands,
                &ExecutionTarget::container("gone"),
                &opts,
                &NullReporter,
            )
            .await
            .expect("captured");
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.exit_code == -1));
        assert!(results.iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn batch_runs_all_commands_in_order() {
        let exec = tight_executor(ExecStub::new(None));
        let opts = ExecOptions {
            trigger_error: false,
            ..ExecOptions::default()
        };
        let commands = vec!["echo one".to_string(), "echo two".to_string()];
        let results = exec
            .execute(&commands, &ExecutionTarget::Host, &opts, &NullReporter)
            .await
            .expect("execute");
        assert_eq!(results[0].output, "one\n");
        assert_eq!(results[1].output, "two\n");
    }

    #[tokio::test]
    async fn stream_execute_yields_lines_in_order() {
        let exec = tight_executor(ExecStub::new(None));
        let mut rx = exec
            .stream_execute(
                "printf 'alpha\\nbeta\\n'",
                &ExecutionTarget::Host,
                &ExecOptions::default(),
            )
            .await
            .expect("stream");
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(lines, vec!["alpha", "beta"]);
    }
}
