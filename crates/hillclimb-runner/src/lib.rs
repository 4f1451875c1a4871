//! hillclimb-runner: Subprocess execution of model and scorer programs.
//!
//! Implements [`ProgramRunner`] on top of `tokio::process`.

pub mod process;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use hillclimb_core::traits::{ProgramOutput, ProgramRequest, ProgramRunner};

pub use process::{run_program, RunError};

/// Program runner that spawns real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner {
    /// Timeout applied when a request carries none.
    default_timeout: Option<Duration>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ProgramRunner for LocalRunner {
    async fn run(&self, request: &ProgramRequest) -> Result<ProgramOutput> {
        if request.timeout.is_none() && self.default_timeout.is_some() {
            let mut request = request.clone();
            request.timeout = self.default_timeout;
            return Ok(run_program(&request).await?);
        }
        Ok(run_program(request).await?)
    }
}
