//! Host subprocess execution.
//!
//! Two entry points: [`TokioCommandRunner`] is the plumbing-grade runner the
//! Docker CLI adapter routes through (capture everything, return `Output`),
//! and the `run_shell_*` functions are the user-facing host back-end with
//! incremental line capture, ANSI stripping, and interrupt handling.
//!
//! There is deliberately no timeout anywhere in this module: a hung command
//! blocks until an external signal cancels it.

use std::process::{Output, Stdio};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::application::ports::{CommandRunner, Reporter};
use crate::domain::{CommandResult, ExecOptions};

/// Production `CommandRunner` — tokio process execution with piped capture.
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        // Read stdout/stderr CONCURRENTLY with wait() to avoid pipe deadlock:
        // a child writing more than the OS pipe buffer blocks on write, and
        // wait() alone would never resolve.
        let (status, stdout, stderr) = tokio::join!(
            child.wait(),
            async {
                let mut buf = Vec::new();
                if let Some(ref mut h) = stdout_handle {
                    let _ = h.read_to_end(&mut buf).await;
                }
                buf
            },
            async {
                let mut buf = Vec::new();
                if let Some(ref mut h) = stderr_handle {
                    let _ = h.read_to_end(&mut buf).await;
                }
                buf
            },
        );
        Ok(Output {
            status: status.with_context(|| format!("waiting for {program}"))?,
            stdout,
            stderr,
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child> {
        tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))
    }
}

/// Resolves when the process receives SIGTERM. Pends forever where the
/// signal (or its registration) is unavailable.
#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(_) => std::future::pending().await,
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await
}

fn append_line(output: &mut String, line: &str, opts: &ExecOptions, reporter: &dyn Reporter) {
    let clean = console::strip_ansi_codes(line);
    output.push_str(&clean);
    output.push('\n');
    if !opts.suppress_output {
        reporter.verbose(&clean);
    }
}

/// Run `command` through the host shell, capturing combined stdout/stderr
/// line by line as it arrives.
///
/// Interrupt and terminate signals are raced against child completion for
/// the duration of this call only — the async equivalent of installing
/// temporary handlers and restoring the previous ones afterward. On a
/// signal the child is killed and a system error is returned.
///
/// # Errors
///
/// Returns an error if the shell cannot be spawned, a pipe read fails, or
/// the run is interrupted. A non-zero exit is NOT an error here; it is
/// recorded on the returned [`CommandResult`].
pub async fn run_shell_captured(
    command: &str,
    opts: &ExecOptions,
    reporter: &dyn Reporter,
) -> Result<CommandResult> {
    let start = Instant::now();
    let mut child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .envs(opts.env.iter().map(|(k, v)| (k.clone(), v.clone())))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn shell for '{command}'"))?;

    let mut out_lines =
        BufReader::new(child.stdout.take().context("stdout not captured")?).lines();
    let mut err_lines =
        BufReader::new(child.stderr.take().context("stderr not captured")?).lines();

    let ctrl_c = tokio::signal::ctrl_c();
    let term = terminate_signal();
    tokio::pin!(ctrl_c, term);

    let mut output = String::new();
    let (mut out_done, mut err_done) = (false, false);
    while !(out_done && err_done) {
        tokio::select! {
            line = out_lines.next_line(), if !out_done => match line.context("reading stdout")? {
                Some(l) => append_line(&mut output, &l, opts, reporter),
                None => out_done = true,
            },
            line = err_lines.next_line(), if !err_done => match line.context("reading stderr")? {
                Some(l) => append_line(&mut output, &l, opts, reporter),
                None => err_done = true,
            },
            _ = &mut ctrl_c => {
                let _ = child.kill().await;
                anyhow::bail!("command '{command}' interrupted");
            }
            () = &mut term => {
                let _ = child.kill().await;
                anyhow::bail!("command '{command}' terminated");
            }
        }
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for '{command}'"))?;
    let exit_code = status.code().unwrap_or(-1);
    Ok(CommandResult {
        command: command.to_string(),
        output,
        exit_code,
        duration: start.elapsed(),
        error: (exit_code != 0).then(|| format!("exit code {exit_code}")),
    })
}

/// Run `command` attached to the controlling terminal — no capture, no
/// incremental logging, no timeout.
///
/// # Errors
///
/// Returns an error if the shell cannot be spawned or waited on.
pub async fn run_shell_interactive(command: &str, opts: &ExecOptions) -> Result<CommandResult> {
    let start = Instant::now();
    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .envs(opts.env.iter().map(|(k, v)| (k.clone(), v.clone())))
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("failed to run '{command}'"))?;
    let exit_code = status.code().unwrap_or(-1);
    Ok(CommandResult {
        command: command.to_string(),
        output: String::new(),
        exit_code,
        duration: start.elapsed(),
        error: (exit_code != 0).then(|| format!("exit code {exit_code}")),
    })
}

/// Spawn `command` through the host shell with piped stdout/stderr, for
/// line streaming.
///
/// # Errors
///
/// Returns an error if the shell cannot be spawned.
pub fn spawn_shell(command: &str, opts: &ExecOptions) -> Result<tokio::process::Child> {
    tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .envs(opts.env.iter().map(|(k, v)| (k.clone(), v.clone())))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn shell for '{command}'"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::ports::NullReporter;

    #[tokio::test]
    async fn captures_stdout_lines() {
        let result = run_shell_captured("echo hello", &ExecOptions::default(), &NullReporter)
            .await
            .expect("echo");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "hello\n");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn combines_stdout_and_stderr() {
        let result = run_shell_captured(
            "echo out; echo err 1>&2",
            &ExecOptions::default(),
            &NullReporter,
        )
        .await
        .expect("run");
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[tokio::test]
    async fn nonzero_exit_populates_error_without_raising() {
        let result = run_shell_captured("false", &ExecOptions::default(), &NullReporter)
            .await
            .expect("false runs");
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.error.as_deref(), Some("exit code 1"));
    }

    #[tokio::test]
    async fn strips_ansi_control_codes() {
        let result = run_shell_captured(
            "printf '\\033[31mred\\033[0m\\n'",
            &ExecOptions::default(),
            &NullReporter,
        )
        .await
        .expect("printf");
        assert_eq!(result.output, "red\n");
    }

    #[tokio::test]
    async fn exports_extra_environment() {
        let opts = ExecOptions {
            env: vec![("QUARRY_TEST_VALUE".to_string(), "beryl".to_string())],
            ..ExecOptions::default()
        };
        let result = run_shell_captured("echo $QUARRY_TEST_VALUE", &opts, &NullReporter)
            .await
            .expect("echo env");
        assert_eq!(result.output, "beryl\n");
    }

    #[tokio::test]
    async fn interactive_reports_exit_status_with_empty_output() {
        let result = run_shell_interactive("true", &ExecOptions::default())
            .await
            .expect("true");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn runner_captures_output_of_program() {
        let output = TokioCommandRunner
            .run("echo", &["plumbing"])
            .await
            .expect("echo");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), "plumbing\n");
    }
}
