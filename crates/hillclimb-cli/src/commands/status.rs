//! The `hillclimb status` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use hillclimb_core::config::load_config_from;
use hillclimb_core::ledger;
use hillclimb_core::model::Dataset;
use hillclimb_report::table::{render_ledger, LedgerRow};

pub async fn execute(
    datasets: Option<String>,
    submissions_folder: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config.as_deref())?;
    if let Some(datasets) = datasets {
        config.datasets = datasets;
    }
    if let Some(subs) = submissions_folder {
        config.submissions_folder = subs;
    }

    let datasets = Dataset::parse_list(&config.datasets)
        .with_context(|| format!("invalid dataset list {:?}", config.datasets))?;

    let mut rows = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let paths = dataset.paths(&config.data_folder, &config.submissions_folder);
        let state = ledger::inspect(&paths.score).await;
        let has_output = tokio::fs::try_exists(&paths.output).await.unwrap_or(false);
        rows.push(LedgerRow {
            dataset,
            state,
            has_output,
        });
    }

    println!("Submissions: {}", config.submissions_folder.display());
    println!("{}", render_ledger(&rows));

    Ok(())
}
