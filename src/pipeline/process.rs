//! Process execution seam for the external stages.
//!
//! The pipeline only needs "run this command in that directory and tell me
//! the exit code and what it printed". [`ProcessRunner`] captures exactly
//! that contract so tests (and hosts with their own sandboxing) can swap in
//! a different implementation without touching the stage logic.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

/// A fully resolved command line for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl StageCommand {
    /// Render the command for log lines.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Result of running one external program to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Combined output: stdout followed by stderr, lossily decoded.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs an external program and waits for it to exit.
///
/// An `Err` means the program could not be launched at all; a program that
/// ran and failed is an `Ok` with a non-zero `exit_code`.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, cwd: &Path, command: &StageCommand) -> std::io::Result<ProcessOutput>;
}

/// Default runner backed by `tokio::process`.
///
/// The child is killed if the future driving it is dropped, so cancelling a
/// job also stops its external stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, cwd: &Path, command: &StageCommand) -> std::io::Result<ProcessOutput> {
        debug!("Spawning `{}` in {}", command.display(), cwd.display());

        let out = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));

        Ok(ProcessOutput {
            exit_code: out.status.code(),
            output,
        })
    }
}
