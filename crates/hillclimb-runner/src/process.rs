//! Subprocess execution for model and scorer programs.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use hillclimb_core::traits::{OutputMode, ProgramOutput, ProgramRequest};

/// Reasons a program could not be run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {}: {source}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} timed out after {}s and was killed", program.display(), timeout.as_secs_f64())]
    Timeout { program: PathBuf, timeout: Duration },
}

/// Run a program and wait for it to exit.
///
/// Stdin is closed. With [`OutputMode::Inherit`] the returned stdout and
/// stderr are empty. On timeout the child is killed.
pub async fn run_program(request: &ProgramRequest) -> Result<ProgramOutput, RunError> {
    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    match request.output {
        OutputMode::Capture => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        OutputMode::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
    }

    debug!(program = %request.program.display(), args = ?request.args, "spawning");

    let child = cmd.spawn().map_err(|source| RunError::Spawn {
        program: request.program.clone(),
        source,
    })?;

    let waited = match request.timeout {
        Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| RunError::Timeout {
                program: request.program.clone(),
                timeout,
            })?,
        None => child.wait_with_output().await,
    };

    let output = waited.map_err(|source| RunError::Wait {
        program: request.program.clone(),
        source,
    })?;

    Ok(ProgramOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(program: &str, args: &[&str], output: OutputMode) -> ProgramRequest {
        ProgramRequest {
            program: PathBuf::from(program),
            args: args.iter().map(PathBuf::from).collect(),
            output,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn captures_both_streams() {
        let req = request(
            "sh",
            &["-c", "echo out; echo err >&2; exit 3"],
            OutputMode::Capture,
        );

        let output = run_program(&req).await.unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr, b"err\n");
    }

    #[tokio::test]
    async fn passes_arguments_in_order() {
        let req = request("echo", &["data/A.in", "subs-tmp/A.out.tmp"], OutputMode::Capture);

        let output = run_program(&req).await.unwrap();

        assert!(output.success);
        assert_eq!(output.stdout, b"data/A.in subs-tmp/A.out.tmp\n");
    }

    #[tokio::test]
    async fn inherited_output_is_not_captured() {
        let req = request("sh", &["-c", "echo streamed"], OutputMode::Inherit);

        let output = run_program(&req).await.unwrap();

        assert!(output.success);
        assert!(output.stdout.is_empty());
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let req = request("./definitely-not-here.sh", &[], OutputMode::Capture);

        let err = run_program(&req).await.unwrap_err();

        assert!(matches!(err, RunError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-here.sh"));
    }

    #[tokio::test]
    async fn timeout_kills_the_program() {
        let mut req = request("sleep", &["5"], OutputMode::Capture);
        req.timeout = Some(Duration::from_millis(100));

        let start = std::time::Instant::now();
        let err = run_program(&req).await.unwrap_err();

        assert!(matches!(err, RunError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
