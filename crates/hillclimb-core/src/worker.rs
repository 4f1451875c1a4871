//! Per-dataset evaluation worker.
//!
//! Reads the ledger, runs the model, scores its output, and promotes the
//! output when the score improved. Every failure stays inside the dataset's
//! own result.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::engine::EngineConfig;
use crate::error::EvalError;
use crate::ledger;
use crate::model::{Dataset, DatasetPaths, EvaluationResult, ModelOutput, Status};
use crate::promote::{self, CopyThenRemove, FileMover};
use crate::traits::{OutputMode, ProgramRequest, ProgramRunner};

/// Evaluate one dataset.
///
/// Never fails: an aborted evaluation is returned as a result with status
/// [`Status::Failed`] and the error message filled in.
pub async fn evaluate(
    dataset: &Dataset,
    config: &EngineConfig,
    runner: &dyn ProgramRunner,
) -> EvaluationResult {
    evaluate_with(dataset, config, runner, &CopyThenRemove).await
}

/// [`evaluate`] with promotion moves performed by `mover`.
pub async fn evaluate_with(
    dataset: &Dataset,
    config: &EngineConfig,
    runner: &dyn ProgramRunner,
    mover: &dyn FileMover,
) -> EvaluationResult {
    let start = Instant::now();
    let paths = dataset.paths(&config.data_folder, &config.submissions_folder);
    let mut result = EvaluationResult::pending(dataset.clone());

    if let Err(e) = run_pipeline(&mut result, &paths, config, runner, mover).await {
        error!(dataset = %dataset, error = %e, "evaluation aborted");
        result.fail(&e);
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

async fn run_pipeline(
    result: &mut EvaluationResult,
    paths: &DatasetPaths,
    config: &EngineConfig,
    runner: &dyn ProgramRunner,
    mover: &dyn FileMover,
) -> Result<(), EvalError> {
    let dataset = result.dataset.clone();

    let old_score = match ledger::read_score(&paths.score).await {
        Ok(score) => {
            result.old_score = score;
            score
        }
        Err(e) if config.bootstrap_missing_ledger && e.is_ledger_missing() => {
            warn!(dataset = %dataset, path = %paths.score.display(), "no ledger yet, using baseline 0");
            0
        }
        Err(e) => return Err(e),
    };

    prepare_workspace(paths).await?;

    // Model
    let mode = if config.realtime_output {
        OutputMode::Inherit
    } else {
        OutputMode::Capture
    };
    let model_run = runner
        .run(&ProgramRequest {
            program: config.model.clone(),
            args: vec![paths.input.clone(), paths.working.clone()],
            output: mode,
            timeout: config.timeout,
        })
        .await
        .map_err(|e| EvalError::ModelExec(format!("{e:#}")))?;

    result.model_output = match mode {
        OutputMode::Inherit => ModelOutput::Streamed,
        OutputMode::Capture => ModelOutput::Captured(model_run.combined_text()),
    };
    if !model_run.success {
        return Err(EvalError::ModelExec(model_run.exit_description()));
    }

    // Scorer
    let scorer_run = runner
        .run(&ProgramRequest {
            program: config.scorer.clone(),
            args: vec![paths.input.clone(), paths.working.clone()],
            output: OutputMode::Capture,
            timeout: config.timeout,
        })
        .await
        .map_err(|e| EvalError::ScorerExec(format!("{e:#}")))?;

    result.scorer_stderr = String::from_utf8_lossy(&scorer_run.stderr).into_owned();
    if !scorer_run.success {
        return Err(EvalError::ScorerExec(scorer_run.exit_description()));
    }

    let new_score = ledger::parse_score(&scorer_run.stdout).ok_or_else(|| {
        EvalError::ScoreParse(String::from_utf8_lossy(&scorer_run.stdout).into_owned())
    })?;
    result.new_score = new_score;

    let status = Status::decide(old_score, new_score);
    if status == Status::Better {
        promote::promote_with(&paths.working, &paths.output, mover).await?;
        ledger::write_score(&paths.score, &scorer_run.stdout).await?;
        info!(dataset = %dataset, old_score, new_score, "new best promoted");
    }
    result.status = status;

    Ok(())
}

/// Create the submissions and working folders if they are missing.
async fn prepare_workspace(paths: &DatasetPaths) -> Result<(), EvalError> {
    for file in [&paths.output, &paths.working] {
        if let Some(dir) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| EvalError::Workspace {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::mock::{FailingMover, MockModel, MockRunner, MockScorer};
    use crate::promote::backup_path;
    use crate::model::SENTINEL_SCORE;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let data = dir.path().join("data");
            let subs = dir.path().join("submissions");
            std::fs::create_dir_all(&data).unwrap();
            std::fs::create_dir_all(&subs).unwrap();
            let config = EngineConfig {
                model: "model".into(),
                scorer: "scorer".into(),
                data_folder: data,
                submissions_folder: subs,
                ..Default::default()
            };
            Self { _dir: dir, config }
        }

        fn paths(&self, token: &str) -> DatasetPaths {
            dataset(token).paths(&self.config.data_folder, &self.config.submissions_folder)
        }

        fn seed(&self, token: &str, score: &str, output: &str) {
            let paths = self.paths(token);
            std::fs::write(&paths.input, "input").unwrap();
            std::fs::write(&paths.score, score).unwrap();
            std::fs::write(&paths.output, output).unwrap();
        }

        fn read(&self, path: &Path) -> String {
            std::fs::read_to_string(path).unwrap()
        }
    }

    fn dataset(token: &str) -> Dataset {
        Dataset::new(token).unwrap()
    }

    #[tokio::test]
    async fn ledger_write_failure_after_promotion() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let paths = fx.paths("A");
        // a directory in the staging slot makes the ledger write fail
        let mut staged = paths.score.clone().into_os_string();
        staged.push(".tmp");
        std::fs::create_dir(&staged).unwrap();
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("new output".into()))
            .with_scorer("A", MockScorer::Prints("15".into()));

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error_kind.as_deref(), Some("ledger_write"));
        assert_eq!(result.old_score, 10);
        assert_eq!(result.new_score, 15);
        assert!(result.error.unwrap().contains("promoted"));
        assert_eq!(fx.read(&paths.output), "new output");
        assert_eq!(fx.read(&paths.score), "10");
    }

    #[tokio::test]
    async fn stranded_backup_still_records_score() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let paths = fx.paths("A");
        let backup = backup_path(&paths.output);
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("new output".into()))
            .with_scorer("A", MockScorer::Prints("15".into()));

        let result = evaluate_with(
            &dataset("A"),
            &fx.config,
            &runner,
            &FailingMover::new(&backup),
        )
        .await;

        assert_eq!(result.status, Status::Better);
        assert!(result.error.is_none());
        assert_eq!(fx.read(&paths.score), "15");
        assert_eq!(fx.read(&paths.output), "new output");
        assert_eq!(fx.read(&backup), "old output");
        assert!(!paths.working.exists());
    }

    #[tokio::test]
    async fn better_score_promotes_and_updates_ledger() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("new output".into()))
            .with_scorer("A", MockScorer::Prints("15\n".into()));

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.status, Status::Better);
        assert_eq!(result.old_score, 10);
        assert_eq!(result.new_score, 15);
        let paths = fx.paths("A");
        assert_eq!(fx.read(&paths.score), "15\n");
        assert_eq!(fx.read(&paths.output), "new output");
        assert_eq!(fx.read(&paths.working), "old output");
    }

    #[tokio::test]
    async fn same_score_leaves_files_untouched() {
        let fx = Fixture::new();
        fx.seed("A", "10\n", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("other output".into()))
            .with_scorer("A", MockScorer::Prints("10".into()));

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.status, Status::Same);
        let paths = fx.paths("A");
        assert_eq!(fx.read(&paths.score), "10\n");
        assert_eq!(fx.read(&paths.output), "old output");
    }

    #[tokio::test]
    async fn worse_score_leaves_files_untouched() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("bad output".into()))
            .with_scorer("A", MockScorer::Prints("3".into()));

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.status, Status::Worse);
        assert_eq!(result.new_score, 3);
        let paths = fx.paths("A");
        assert_eq!(fx.read(&paths.score), "10");
        assert_eq!(fx.read(&paths.output), "old output");
        assert_eq!(fx.read(&paths.working), "bad output");
    }

    #[tokio::test]
    async fn missing_ledger_aborts_before_running_model() {
        let fx = Fixture::new();
        std::fs::write(fx.paths("B").input, "input").unwrap();
        let runner = MockRunner::new("model", "scorer");

        let result = evaluate(&dataset("B"), &fx.config, &runner).await;

        assert!(result.is_failed());
        assert_eq!(result.old_score, SENTINEL_SCORE);
        assert_eq!(result.new_score, SENTINEL_SCORE);
        assert_eq!(result.error_kind.as_deref(), Some("ledger_read"));
        assert_eq!(result.model_output, ModelOutput::NotRun);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_treats_missing_ledger_as_zero() {
        let mut fx = Fixture::new();
        fx.config.bootstrap_missing_ledger = true;
        std::fs::write(fx.paths("B").input, "input").unwrap();
        let runner = MockRunner::new("model", "scorer")
            .with_model("B", MockModel::Writes("first".into()))
            .with_scorer("B", MockScorer::Prints("4".into()));

        let result = evaluate(&dataset("B"), &fx.config, &runner).await;

        assert_eq!(result.status, Status::Better);
        assert_eq!(result.old_score, SENTINEL_SCORE);
        let paths = fx.paths("B");
        assert_eq!(fx.read(&paths.score), "4");
        assert_eq!(fx.read(&paths.output), "first");
    }

    #[tokio::test]
    async fn unparsable_ledger_aborts_even_with_bootstrap() {
        let mut fx = Fixture::new();
        fx.config.bootstrap_missing_ledger = true;
        fx.seed("A", "ten", "old output");
        let runner = MockRunner::new("model", "scorer");

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert!(result.is_failed());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn failing_model_leaves_files_untouched() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Fails { code: 2, output: "boom".into() });

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert!(result.is_failed());
        assert_eq!(result.error_kind.as_deref(), Some("model_exec"));
        assert_eq!(result.model_output, ModelOutput::Captured("boom".into()));
        assert_eq!(result.old_score, 10);
        let paths = fx.paths("A");
        assert_eq!(fx.read(&paths.score), "10");
        assert_eq!(fx.read(&paths.output), "old output");
        // Scorer never ran.
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn model_spawn_failure_is_model_exec() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner =
            MockRunner::new("model", "scorer").with_model("A", MockModel::SpawnError);

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.error_kind.as_deref(), Some("model_exec"));
    }

    #[tokio::test]
    async fn scorer_failures_leave_files_untouched() {
        for scorer in [
            MockScorer::Fails { code: 1, stderr: "bad format".into() },
            MockScorer::Prints("eleven".into()),
        ] {
            let fx = Fixture::new();
            fx.seed("A", "10", "old output");
            let runner = MockRunner::new("model", "scorer")
                .with_model("A", MockModel::Writes("new output".into()))
                .with_scorer("A", scorer);

            let result = evaluate(&dataset("A"), &fx.config, &runner).await;

            assert!(result.is_failed());
            assert_eq!(result.error_kind.as_deref(), Some("scorer_exec"));
            let paths = fx.paths("A");
            assert_eq!(fx.read(&paths.score), "10");
            assert_eq!(fx.read(&paths.output), "old output");
        }
    }

    #[tokio::test]
    async fn scorer_stderr_is_kept() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("x".into()))
            .with_scorer(
                "A",
                MockScorer::PrintsWithStderr {
                    stdout: "9".into(),
                    stderr: "3 constraints violated\n".into(),
                },
            );

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.scorer_stderr, "3 constraints violated\n");
    }

    #[tokio::test]
    async fn model_not_writing_output_fails_promotion() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Silent)
            .with_scorer("A", MockScorer::Prints("20".into()));

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert!(result.is_failed());
        assert_eq!(result.error_kind.as_deref(), Some("swap"));
        assert_eq!(result.new_score, 20);
        let paths = fx.paths("A");
        assert_eq!(fx.read(&paths.score), "10");
        assert_eq!(fx.read(&paths.output), "old output");
    }

    #[tokio::test]
    async fn streaming_mode_keeps_no_output() {
        let mut fx = Fixture::new();
        fx.config.realtime_output = true;
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("x".into()))
            .with_scorer("A", MockScorer::Prints("1".into()));

        let result = evaluate(&dataset("A"), &fx.config, &runner).await;

        assert_eq!(result.model_output, ModelOutput::Streamed);
        let calls = runner.calls();
        assert_eq!(calls[0].output, OutputMode::Inherit);
        assert_eq!(calls[1].output, OutputMode::Capture);
    }

    #[tokio::test]
    async fn programs_get_input_and_working_paths() {
        let fx = Fixture::new();
        fx.seed("A", "10", "old output");
        let runner = MockRunner::new("model", "scorer")
            .with_model("A", MockModel::Writes("x".into()))
            .with_scorer("A", MockScorer::Prints("1".into()));

        evaluate(&dataset("A"), &fx.config, &runner).await;

        let paths = fx.paths("A");
        for call in runner.calls() {
            assert_eq!(call.args, vec![paths.input.clone(), paths.working.clone()]);
        }
        assert!(paths.working.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn promotion_round_trip_keeps_previous_best_in_working_slot() {
        let fx = Fixture::new();
        fx.seed("C", "5", "five");
        let runner = MockRunner::new("model", "scorer")
            .with_model("C", MockModel::Writes("eight".into()))
            .with_scorer("C", MockScorer::Prints("8".into()));

        let result = evaluate(&dataset("C"), &fx.config, &runner).await;
        assert_eq!(result.status, Status::Better);

        let paths = fx.paths("C");
        assert_eq!(fx.read(&paths.working), "five");
        assert_eq!(
            ledger::read_score(&paths.score).await.unwrap(),
            8,
            "ledger must match the canonical output"
        );
    }
}
