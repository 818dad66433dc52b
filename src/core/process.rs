//! Process boundary: run one job's command line and capture what it did.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use crate::job::Job;

/// Captured result of a process that was started and ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty() || !self.stderr.trim().is_empty()
    }
}

/// The process could not be started at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnError {
    pub message: String,
}

impl SpawnError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SpawnError {}

/// Starts a job and blocks until it exits.
///
/// A clean non-zero exit is `Ok` with `success == false`; `Err` is reserved
/// for jobs that never started.
pub trait ProcessSpawner {
    fn spawn(&self, job: &Job) -> Result<CommandOutput, SpawnError>;
}

/// Runs job commands through the platform shell (`sh -c`, or `cmd /C` on Windows).
#[derive(Debug, Clone, Default)]
pub struct ShellSpawner {
    current_dir: Option<PathBuf>,
}

impl ShellSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn command(&self, line: &str) -> Command {
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", line]);
            cmd
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", line]);
            cmd
        };

        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}

impl ProcessSpawner for ShellSpawner {
    fn spawn(&self, job: &Job) -> Result<CommandOutput, SpawnError> {
        let out = self
            .command(job.command())
            .output()
            .map_err(|e| SpawnError::new(format!("Command error: {}", e)))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            // Killed by a signal: no exit code
            exit_code: out.status.code().unwrap_or(-1),
        })
    }
}
