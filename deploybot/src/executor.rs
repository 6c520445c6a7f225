//! Subprocess execution for kubectl invocations.
//!
//! Commands are plain whitespace-split lines: no shell, no quoting. Output is
//! read from the child's own stdout/stderr pipes, so any number of commands
//! may run at once.

use std::process::Stdio;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::process::Command;

/// Marker kubectl prints when a targeted resource does not exist.
pub const NOT_FOUND_MARKER: &str = "NotFound";

/// True if kubectl output reports a missing resource.
pub fn is_not_found(output: &str) -> bool {
    output.contains(NOT_FOUND_MARKER)
}

/// Runs a command line and returns its combined output.
///
/// Failures are never surfaced as errors: a command that cannot be spawned
/// yields empty output, and a non-zero exit is only visible in the text.
pub trait Executor: Send + Sync {
    fn execute<'a>(&'a self, command_line: &'a str) -> BoxFuture<'a, String>;
}

/// Production executor backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for ShellExecutor {
    fn execute<'a>(&'a self, command_line: &'a str) -> BoxFuture<'a, String> {
        run(command_line).boxed()
    }
}

async fn run(command_line: &str) -> String {
    let mut parts = command_line.split_whitespace();
    let Some(program) = parts.next() else {
        return String::new();
    };

    tracing::info!(command = %command_line, "Executing");

    let output = match Command::new(program)
        .args(parts)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(command = %command_line, error = %e, "Failed to execute command");
            return String::new();
        }
    };

    if !output.status.success() {
        tracing::debug!(
            command = %command_line,
            code = output.status.code().unwrap_or(-1),
            "Command exited unsuccessfully"
        );
    }

    let mut result = String::from_utf8_lossy(&output.stdout).into_owned();
    result.push_str(&String::from_utf8_lossy(&output.stderr));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_a_plain_substring_match() {
        assert!(is_not_found(
            "Error from server (NotFound): deployments.apps \"web\" not found"
        ));
        assert!(!is_not_found("deployment.apps/web image updated"));
        assert!(!is_not_found("not found"));
    }

    #[tokio::test]
    async fn captures_stdout() {
        let out = ShellExecutor::new().execute("echo hello world").await;
        assert_eq!(out, "hello world\n");
    }

    #[tokio::test]
    async fn captures_stderr_after_stdout() {
        let out = ShellExecutor::new()
            .execute("ls /definitely-not-a-real-path-for-deploybot")
            .await;
        assert!(out.contains("definitely-not-a-real-path-for-deploybot"), "got: {out}");
    }

    #[tokio::test]
    async fn spawn_failure_yields_empty_output() {
        let out = ShellExecutor::new()
            .execute("deploybot-no-such-binary --version")
            .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn blank_command_line_yields_empty_output() {
        assert!(ShellExecutor::new().execute("   ").await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_invocations_keep_their_own_output() {
        let exec = ShellExecutor::new();
        let (a, b) = tokio::join!(exec.execute("echo first"), exec.execute("echo second"));
        assert_eq!(a, "first\n");
        assert_eq!(b, "second\n");
    }
}
