//! hillclimb CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hillclimb",
    version,
    about = "Keep-the-best benchmark harness: run a model, score it, promote improvements"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the model on every dataset and promote improved outputs
    Run {
        /// Datasets to evaluate: one token per character ("ABC") or comma-separated
        #[arg(long)]
        datasets: Option<String>,

        /// Model executable, invoked as `model <input> <output>`
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scorer executable, invoked as `scorer <input> <output>`
        #[arg(long)]
        scorer: Option<PathBuf>,

        /// Folder containing the <dataset>.in inputs
        #[arg(long)]
        data_folder: Option<PathBuf>,

        /// Folder containing <dataset>.score and <dataset>.out
        #[arg(long)]
        submissions_folder: Option<PathBuf>,

        /// Stream model output live (always on for a single dataset)
        #[arg(long)]
        realtime_output: bool,

        /// Treat a missing score file as score 0
        #[arg(long)]
        bootstrap: bool,

        /// Kill model or scorer after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Write a JSON report of the run into this directory
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the recorded best score of each dataset
    Status {
        /// Datasets to show
        #[arg(long)]
        datasets: Option<String>,

        /// Folder containing <dataset>.score and <dataset>.out
        #[arg(long)]
        submissions_folder: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and the folder layout
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hillclimb=info".parse().unwrap())
                .add_directive("hillclimb_core=info".parse().unwrap())
                .add_directive("hillclimb_runner=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            datasets,
            model,
            scorer,
            data_folder,
            submissions_folder,
            realtime_output,
            bootstrap,
            timeout,
            report_dir,
            no_color,
            config,
        } => {
            commands::run::execute(commands::run::RunOverrides {
                datasets,
                model,
                scorer,
                data_folder,
                submissions_folder,
                realtime_output,
                bootstrap,
                timeout,
                report_dir,
                no_color,
                config,
            })
            .await
        }
        Commands::Status {
            datasets,
            submissions_folder,
            config,
        } => commands::status::execute(datasets, submissions_folder, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
