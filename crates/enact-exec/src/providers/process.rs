//! Shared process-management shape for the local and container
//! providers: spawn via `tokio::process::Command`, capture stdout/
//! stderr concurrently, and enforce the cancellation/timeout/
//! grace-kill sequence — a SIGTERM-equivalent, then SIGKILL after a
//! 5-second grace window.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

const GRACE_WINDOW: Duration = Duration::from_secs(5);

/// How a managed child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(Option<i32>),
    TimedOut,
    Cancelled,
}

#[derive(Debug)]
pub struct ManagedOutput {
    pub outcome: ProcessOutcome,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns `command`, captures its stdout/stderr, and races its exit
/// against `timeout` and `cancellation`. On expiry or cancellation, a
/// SIGTERM-equivalent is sent; if the child is still alive after the
/// grace window, it is killed outright.
pub async fn run_managed(
    mut command: Command,
    timeout: Option<Duration>,
    cancellation: &CancellationToken,
) -> std::io::Result<ManagedOutput> {
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);

    let mut child = command.spawn()?;
    let mut stdout_pipe = child.stdout.take().expect("stdout is piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr is piped");

    let stdout_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stdout_pipe.read_to_string(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr_pipe.read_to_string(&mut buf).await;
        buf
    });

    let outcome = tokio::select! {
        biased;
        _ = cancellation.cancelled() => {
            escalate_kill(&mut child).await;
            ProcessOutcome::Cancelled
        }
        outcome = wait_with_timeout(&mut child, timeout) => outcome,
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    Ok(ManagedOutput {
        outcome,
        stdout,
        stderr,
    })
}

async fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> ProcessOutcome {
    match timeout {
        None => ProcessOutcome::Exited(child.wait().await.ok().and_then(|s| s.code())),
        Some(duration) => match tokio::time::timeout(duration, child.wait()).await {
            Ok(Ok(status)) => ProcessOutcome::Exited(status.code()),
            Ok(Err(_)) => ProcessOutcome::Exited(None),
            Err(_) => {
                escalate_kill(child).await;
                ProcessOutcome::TimedOut
            }
        },
    }
}

async fn escalate_kill(child: &mut Child) {
    graceful_terminate(child);
    if tokio::time::timeout(GRACE_WINDOW, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(unix)]
fn graceful_terminate(child: &Child) {
    if let Some(pid) = child.id() {
        let _ = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .status();
    }
}

#[cfg(not(unix))]
fn graceful_terminate(child: &mut Child) {
    let _ = child.start_kill();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_a_successful_command() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo hello");
        let output = run_managed(cmd, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.outcome, ProcessOutcome::Exited(Some(0)));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 7");
        let output = run_managed(cmd, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(output.outcome, ProcessOutcome::Exited(Some(7)));
    }

    #[tokio::test]
    async fn timeout_kills_a_long_running_command() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let output = run_managed(cmd, Some(Duration::from_millis(100)), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.outcome, ProcessOutcome::TimedOut);
    }

    #[tokio::test]
    async fn cancellation_token_stops_the_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let token = CancellationToken::new();
        let token_clone = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token_clone.cancel();
        });
        let output = run_managed(cmd, None, &token).await.unwrap();
        assert_eq!(output.outcome, ProcessOutcome::Cancelled);
    }
}
