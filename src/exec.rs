use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

/// Run a program with arguments in `dir`. Fails if it exits non-zero.
pub fn run_in<S: AsRef<str>>(dir: &Path, program: &str, args: &[S]) -> Result<ExecResult> {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(AsRef::as_ref)).current_dir(dir);
    execute_checked(cmd, program)
}

/// Check if a program is available on PATH.
#[must_use]
pub fn is_available(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(windows))]
    fn run_in_captures_stdout() {
        let dir = std::env::temp_dir();
        let result = run_in(&dir, "echo", &["hello"]).unwrap();
        assert!(result.success, "echo should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    #[cfg(not(windows))]
    fn run_in_uses_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let result = run_in(dir.path(), "ls", &[] as &[&str]).unwrap();
        assert!(result.stdout.contains("marker.txt"));
    }

    #[test]
    #[cfg(not(windows))]
    fn run_in_failure() {
        let result = run_in(&std::env::temp_dir(), "false", &[] as &[&str]);
        assert!(result.is_err(), "non-zero exit should produce an error");
    }

    #[test]
    fn missing_program_is_not_available() {
        assert!(
            !is_available("this-program-does-not-exist-12345"),
            "non-existent program should not be found"
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn echo_is_available() {
        assert!(is_available("echo"), "echo should be found on Unix");
    }
}
