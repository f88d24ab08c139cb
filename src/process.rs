//! Process execution seam
//!
//! Concrete commands never spawn programs directly; they go through
//! `ProcessRunner` so that tests can substitute a recording fake and the
//! daemon never shuts down a developer workstation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

/// Outcome of running an external program to completion
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub return_code: i32,
    /// Combined stdout/stderr text
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.return_code == 0
    }

    /// Map a non-zero exit into an error describing the failed step
    pub fn expect_success(self, what: &str) -> Result<ProcessOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(anyhow!(
                "{what} failed (exit code {}): {}",
                self.return_code,
                self.output.trim()
            ))
        }
    }
}

/// Runs external programs on behalf of commands
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` and wait for it to exit.
    ///
    /// An `Err` means the program could not be spawned or waited on; a
    /// non-zero exit is reported through `ProcessOutput`, not as an error.
    async fn run(&self, program: &str, args: &[&str]) -> Result<ProcessOutput>;
}

/// Production runner backed by `tokio::process`
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ProcessOutput> {
        debug!("running {} {:?}", program, args);
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        Ok(ProcessOutput {
            // Killed by signal reports as -1
            return_code: output.status.code().unwrap_or(-1),
            output: text,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_exit_code() {
        let runner = SystemProcessRunner;
        let out = runner.run("false", &[]).await.expect("spawn failed");
        assert!(!out.success());
        assert!(out.expect_success("false").is_err());
    }

    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let runner = SystemProcessRunner;
        let out = runner.run("echo", &["hi"]).await.expect("spawn failed");
        assert!(out.success());
        assert_eq!(out.output.trim(), "hi");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let runner = SystemProcessRunner;
        assert!(runner.run("/nonexistent/program", &[]).await.is_err());
    }
}
