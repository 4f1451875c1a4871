//! Run orchestrator.
//!
//! Launches one task per dataset, waits for all of them, and returns the
//! results in the order the datasets were given.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::EvalError;
use crate::model::{Dataset, EvaluationResult};
use crate::report::RunReport;
use crate::traits::ProgramRunner;
use crate::worker;

/// Configuration shared by every dataset of a run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model executable.
    pub model: PathBuf,
    /// Scorer executable.
    pub scorer: PathBuf,
    /// Folder holding `<D>.in` files.
    pub data_folder: PathBuf,
    /// Folder holding `<D>.score` and `<D>.out` files.
    pub submissions_folder: PathBuf,
    /// Stream the model's output to the terminal instead of capturing it.
    pub realtime_output: bool,
    /// Upper bound on each model and scorer invocation.
    pub timeout: Option<Duration>,
    /// Treat a missing ledger as a baseline score of 0.
    pub bootstrap_missing_ledger: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("./model.sh"),
            scorer: PathBuf::from("./scorer.sh"),
            data_folder: PathBuf::from("data"),
            submissions_folder: PathBuf::from("submissions"),
            realtime_output: false,
            timeout: None,
            bootstrap_missing_ledger: false,
        }
    }
}

/// Progress reporting trait.
///
/// Called from inside the dataset tasks, so implementations must be
/// thread-safe.
pub trait ProgressReporter: Send + Sync {
    fn on_dataset_start(&self, dataset: &Dataset, streaming: bool);
    fn on_dataset_complete(&self, result: &EvaluationResult);
    fn on_run_complete(&self, results: &[EvaluationResult], elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_dataset_start(&self, _: &Dataset, _: bool) {}
    fn on_dataset_complete(&self, _: &EvaluationResult) {}
    fn on_run_complete(&self, _: &[EvaluationResult], _: Duration) {}
}

/// Runs every dataset of a run concurrently.
pub struct Orchestrator {
    runner: Arc<dyn ProgramRunner>,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn ProgramRunner>, config: EngineConfig) -> Self {
        Self { runner, config }
    }

    /// Whether model output is streamed for a run over `dataset_count`
    /// datasets. A single dataset always streams.
    pub fn streams_output(&self, dataset_count: usize) -> bool {
        self.config.realtime_output || dataset_count == 1
    }

    /// Evaluate all datasets and collect their results in input order.
    pub async fn run(
        &self,
        datasets: &[Dataset],
        progress: Arc<dyn ProgressReporter>,
    ) -> RunReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4();

        let mut config = self.config.clone();
        config.realtime_output = self.streams_output(datasets.len());
        let config = Arc::new(config);

        info!(
            run_id = %run_id,
            datasets = datasets.len(),
            streaming = config.realtime_output,
            "starting run"
        );

        // Handle i is the only writer of slot i.
        let handles: Vec<_> = datasets
            .iter()
            .cloned()
            .map(|dataset| {
                let runner = Arc::clone(&self.runner);
                let config = Arc::clone(&config);
                let progress = Arc::clone(&progress);
                tokio::spawn(async move {
                    progress.on_dataset_start(&dataset, config.realtime_output);
                    let result = worker::evaluate(&dataset, &config, runner.as_ref()).await;
                    progress.on_dataset_complete(&result);
                    result
                })
            })
            .collect();

        let results: Vec<EvaluationResult> = join_all(handles)
            .await
            .into_iter()
            .zip(datasets)
            .map(|(joined, dataset)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(dataset = %dataset, error = %e, "evaluation task failed");
                    let mut result = EvaluationResult::pending(dataset.clone());
                    result.fail(&EvalError::TaskPanicked(e.to_string()));
                    result
                }
            })
            .collect();

        let elapsed = start.elapsed();
        progress.on_run_complete(&results, elapsed);

        RunReport {
            id: run_id,
            created_at: chrono::Utc::now(),
            streamed_output: config.realtime_output,
            duration_ms: elapsed.as_millis() as u64,
            results,
        }
    }
}
