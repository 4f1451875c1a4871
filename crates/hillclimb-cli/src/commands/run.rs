//! The `hillclimb run` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use hillclimb_core::config::{load_config_from, HillclimbConfig};
use hillclimb_core::engine::{Orchestrator, ProgressReporter};
use hillclimb_core::model::{Dataset, EvaluationResult};
use hillclimb_core::report::RunReport;
use hillclimb_report::table::render_tally;
use hillclimb_report::{render_diagnostics, render_summary, Palette};
use hillclimb_runner::LocalRunner;

/// Command-line values that take precedence over the config file.
pub struct RunOverrides {
    pub datasets: Option<String>,
    pub model: Option<PathBuf>,
    pub scorer: Option<PathBuf>,
    pub data_folder: Option<PathBuf>,
    pub submissions_folder: Option<PathBuf>,
    pub realtime_output: bool,
    pub bootstrap: bool,
    pub timeout: Option<u64>,
    pub report_dir: Option<PathBuf>,
    pub no_color: bool,
    pub config: Option<PathBuf>,
}

impl RunOverrides {
    fn apply(self, config: &mut HillclimbConfig) {
        if let Some(datasets) = self.datasets {
            config.datasets = datasets;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(scorer) = self.scorer {
            config.scorer = scorer;
        }
        if let Some(data) = self.data_folder {
            config.data_folder = data;
        }
        if let Some(subs) = self.submissions_folder {
            config.submissions_folder = subs;
        }
        if self.timeout.is_some() {
            config.timeout_secs = self.timeout;
        }
        if self.report_dir.is_some() {
            config.report_dir = self.report_dir;
        }
        config.realtime_output |= self.realtime_output;
        config.bootstrap_missing_ledger |= self.bootstrap;
    }
}

/// Console progress reporter.
struct ConsoleReporter {
    palette: Palette,
}

impl ProgressReporter for ConsoleReporter {
    fn on_dataset_start(&self, dataset: &Dataset, streaming: bool) {
        if streaming {
            eprintln!("  Starting: {dataset} (model output follows)");
        } else {
            eprintln!("  Starting: {dataset}");
        }
    }

    fn on_dataset_complete(&self, result: &EvaluationResult) {
        // One write per block so concurrent datasets don't interleave.
        let block = render_diagnostics(result, self.palette);
        let _stdout = std::io::stdout().lock();
        print!("{block}");
    }

    fn on_run_complete(&self, results: &[EvaluationResult], elapsed: Duration) {
        let failed = results.iter().filter(|r| r.is_failed()).count();
        eprintln!(
            "\nComplete: {}/{} evaluated, {failed} failed ({:.1}s)",
            results.len() - failed,
            results.len(),
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(overrides: RunOverrides) -> Result<()> {
    let no_color = overrides.no_color;
    let mut config = load_config_from(overrides.config.as_deref())?;
    overrides.apply(&mut config);

    let datasets = Dataset::parse_list(&config.datasets)
        .with_context(|| format!("invalid dataset list {:?}", config.datasets))?;
    if let Some(secs) = config.timeout_secs {
        anyhow::ensure!(secs >= 1, "timeout must be at least 1 second");
    }

    let palette = Palette::from_env(no_color);
    let orchestrator = Orchestrator::new(Arc::new(LocalRunner::new()), config.engine_config());

    eprintln!(
        "hillclimb v{}: evaluating {} dataset(s) with {}",
        env!("CARGO_PKG_VERSION"),
        datasets.len(),
        config.model.display()
    );
    eprintln!();

    let reporter = Arc::new(ConsoleReporter { palette });
    let report = orchestrator.run(&datasets, reporter).await;

    print_summary(&report, palette);

    if let Some(dir) = &config.report_dir {
        let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");
        let path = dir.join(format!("report-{timestamp}.json"));
        report.save_json(&path)?;
        eprintln!("Results saved to: {}", path.display());
    }

    Ok(())
}

fn print_summary(report: &RunReport, palette: Palette) {
    println!("{}", render_summary(&report.results, palette));
    println!("{}", render_tally(&report.tally(), palette));
}
