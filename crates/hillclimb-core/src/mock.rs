//! Mock program runner and file mover for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::promote::{move_file, FileMover};
use crate::traits::{ProgramOutput, ProgramRequest, ProgramRunner};

/// Scripted behavior of the model for one dataset.
#[derive(Debug, Clone)]
pub enum MockModel {
    /// Write this content to the working output and exit 0.
    Writes(String),
    /// Exit 0 without writing anything.
    Silent,
    /// Print `output` and exit with `code`.
    Fails { code: i32, output: String },
    /// Fail to start.
    SpawnError,
}

/// Scripted behavior of the scorer for one dataset.
#[derive(Debug, Clone)]
pub enum MockScorer {
    /// Print this to stdout and exit 0.
    Prints(String),
    /// Print to both streams and exit 0.
    PrintsWithStderr { stdout: String, stderr: String },
    /// Print `stderr` and exit with `code`.
    Fails { code: i32, stderr: String },
    /// Fail to start.
    SpawnError,
}

/// A program runner that never spawns anything.
///
/// Requests are dispatched on the program path (model or scorer) and on the
/// dataset token, taken from the input file's stem.
pub struct MockRunner {
    model: PathBuf,
    scorer: PathBuf,
    models: HashMap<String, MockModel>,
    scorers: HashMap<String, MockScorer>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<ProgramRequest>>,
}

impl MockRunner {
    pub fn new(model: impl Into<PathBuf>, scorer: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scorer: scorer.into(),
            models: HashMap::new(),
            scorers: HashMap::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model(mut self, token: &str, behavior: MockModel) -> Self {
        self.models.insert(token.to_string(), behavior);
        self
    }

    pub fn with_scorer(mut self, token: &str, behavior: MockScorer) -> Self {
        self.scorers.insert(token.to_string(), behavior);
        self
    }

    /// Make the model for `token` take `delay` before finishing.
    pub fn with_delay(mut self, token: &str, delay: Duration) -> Self {
        self.delays.insert(token.to_string(), delay);
        self
    }

    /// Every request received, in arrival order.
    pub fn calls(&self) -> Vec<ProgramRequest> {
        self.calls.lock().unwrap().clone()
    }

    async fn run_model(&self, token: &str, working: Option<&Path>) -> anyhow::Result<ProgramOutput> {
        if let Some(delay) = self.delays.get(token) {
            tokio::time::sleep(*delay).await;
        }

        let behavior = self
            .models
            .get(token)
            .cloned()
            .unwrap_or(MockModel::Writes(String::new()));

        match behavior {
            MockModel::Writes(content) => {
                if let Some(path) = working {
                    tokio::fs::write(path, content).await?;
                }
                Ok(exited(0, "", ""))
            }
            MockModel::Silent => Ok(exited(0, "", "")),
            MockModel::Fails { code, output } => Ok(exited(code, &output, "")),
            MockModel::SpawnError => anyhow::bail!("no such file or directory"),
        }
    }

    fn run_scorer(&self, token: &str) -> anyhow::Result<ProgramOutput> {
        let behavior = self
            .scorers
            .get(token)
            .cloned()
            .unwrap_or(MockScorer::Prints("0".into()));

        match behavior {
            MockScorer::Prints(stdout) => Ok(exited(0, &stdout, "")),
            MockScorer::PrintsWithStderr { stdout, stderr } => Ok(exited(0, &stdout, &stderr)),
            MockScorer::Fails { code, stderr } => Ok(exited(code, "", &stderr)),
            MockScorer::SpawnError => anyhow::bail!("no such file or directory"),
        }
    }
}

fn exited(code: i32, stdout: &str, stderr: &str) -> ProgramOutput {
    ProgramOutput {
        exit_code: Some(code),
        success: code == 0,
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

#[async_trait]
impl ProgramRunner for MockRunner {
    async fn run(&self, request: &ProgramRequest) -> anyhow::Result<ProgramOutput> {
        self.calls.lock().unwrap().push(request.clone());

        let token = request
            .args
            .first()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let working = request.args.get(1).map(PathBuf::as_path);

        if request.program == self.model {
            self.run_model(&token, working).await
        } else if request.program == self.scorer {
            self.run_scorer(&token)
        } else {
            anyhow::bail!("unknown program: {}", request.program.display())
        }
    }
}

/// A file mover that refuses every move out of one source path.
#[derive(Debug, Clone)]
pub struct FailingMover {
    fail_from: PathBuf,
}

impl FailingMover {
    pub fn new(path: &Path) -> Self {
        Self {
            fail_from: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileMover for FailingMover {
    async fn move_file(&self, src: &Path, dst: &Path) -> std::io::Result<()> {
        if src == self.fail_from {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("refusing to move {}", src.display()),
            ));
        }
        move_file(src, dst).await
    }
}
