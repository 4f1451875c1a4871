//! The `hillclimb init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("hillclimb.toml").exists() {
        println!("hillclimb.toml already exists, skipping.");
    } else {
        std::fs::write("hillclimb.toml", SAMPLE_CONFIG)?;
        println!("Created hillclimb.toml");
    }

    for folder in ["data", "submissions", "submissions-tmp"] {
        if Path::new(folder).is_dir() {
            println!("{folder}/ already exists, skipping.");
        } else {
            std::fs::create_dir_all(folder)?;
            println!("Created {folder}/");
        }
    }

    println!("\nNext steps:");
    println!("  1. Put one <dataset>.in file per dataset into data/");
    println!("  2. Point `model` and `scorer` in hillclimb.toml at your executables");
    println!("  3. Run: hillclimb run --bootstrap");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# hillclimb configuration

# One dataset per character, or comma-separated names ("small,large").
datasets = "A"

# Both are invoked as `<program> <input file> <output file>`.
# The scorer prints a non-negative integer on stdout.
model = "./model.sh"
scorer = "./scorer.sh"

data_folder = "data"
submissions_folder = "submissions"

# Stream model output live even when several datasets run.
realtime_output = false

# Treat a missing <dataset>.score as score 0.
bootstrap_missing_ledger = false

# Kill model or scorer after this many seconds.
# timeout_secs = 600

# Write a JSON report of each run here.
# report_dir = "reports"
"#;
