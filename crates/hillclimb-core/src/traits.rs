//! Trait for running the external model and scorer programs.
//!
//! Implemented by `hillclimb-runner` with real subprocesses and by
//! [`crate::mock::MockRunner`] in tests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Where a program's stdout and stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect both streams in memory.
    Capture,
    /// Connect both streams to this process's own stdout and stderr.
    Inherit,
}

/// Request to run one program to completion.
#[derive(Debug, Clone)]
pub struct ProgramRequest {
    /// Executable to run.
    pub program: PathBuf,
    /// Positional arguments, always `<input> <working output>` here.
    pub args: Vec<PathBuf>,
    /// Stream handling.
    pub output: OutputMode,
    /// Kill the program if it runs longer than this.
    pub timeout: Option<Duration>,
}

/// What a finished program left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramOutput {
    /// Exit code, `None` if killed by a signal.
    pub exit_code: Option<i32>,
    /// Whether the program exited with status 0.
    pub success: bool,
    /// Captured stdout (empty when inherited).
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when inherited).
    pub stderr: Vec<u8>,
}

impl ProgramOutput {
    /// Human-readable exit description, e.g. `exit status: 3`.
    pub fn exit_description(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// Stdout followed by stderr, lossily decoded.
    ///
    /// The streams are captured separately, so lines are grouped by stream
    /// rather than interleaved in the order the program wrote them.
    pub fn combined_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text
    }
}

/// Runs external programs for the evaluation worker.
///
/// An `Err` means the program could not be run at all (spawn failure or
/// timeout). A program that ran and exited non-zero is an `Ok` with
/// `success == false`.
#[async_trait]
pub trait ProgramRunner: Send + Sync {
    async fn run(&self, request: &ProgramRequest) -> anyhow::Result<ProgramOutput>;
}
