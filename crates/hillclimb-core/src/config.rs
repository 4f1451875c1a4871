//! hillclimb configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;

/// Top-level hillclimb configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HillclimbConfig {
    /// Dataset tokens, one per character or comma-separated.
    #[serde(default = "default_datasets")]
    pub datasets: String,
    /// Model executable.
    #[serde(default = "default_model")]
    pub model: PathBuf,
    /// Scorer executable.
    #[serde(default = "default_scorer")]
    pub scorer: PathBuf,
    /// Folder containing the `<D>.in` inputs.
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,
    /// Folder containing ledgers and best outputs.
    #[serde(default = "default_submissions_folder")]
    pub submissions_folder: PathBuf,
    /// Stream model output even when several datasets run.
    #[serde(default)]
    pub realtime_output: bool,
    /// Per-invocation timeout in seconds (None = wait forever).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Treat a missing ledger as score 0 instead of skipping the dataset.
    #[serde(default)]
    pub bootstrap_missing_ledger: bool,
    /// Where to write JSON run reports (None = don't write them).
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
}

fn default_datasets() -> String {
    "A".to_string()
}
fn default_model() -> PathBuf {
    PathBuf::from("./model.sh")
}
fn default_scorer() -> PathBuf {
    PathBuf::from("./scorer.sh")
}
fn default_data_folder() -> PathBuf {
    PathBuf::from("data")
}
fn default_submissions_folder() -> PathBuf {
    PathBuf::from("submissions")
}

impl Default for HillclimbConfig {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
            model: default_model(),
            scorer: default_scorer(),
            data_folder: default_data_folder(),
            submissions_folder: default_submissions_folder(),
            realtime_output: false,
            timeout_secs: None,
            bootstrap_missing_ledger: false,
            report_dir: None,
        }
    }
}

impl HillclimbConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            model: self.model.clone(),
            scorer: self.scorer.clone(),
            data_folder: self.data_folder.clone(),
            submissions_folder: self.submissions_folder.clone(),
            realtime_output: self.realtime_output,
            timeout: self.timeout_secs.map(Duration::from_secs),
            bootstrap_missing_ledger: self.bootstrap_missing_ledger,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if s.contains("${") => PathBuf::from(resolve_env_vars(s)),
        _ => path.to_path_buf(),
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without an explicit path:
/// 1. `hillclimb.toml` in the current directory
/// 2. `~/.config/hillclimb/config.toml`
///
/// Environment variable overrides: `HILLCLIMB_MODEL`, `HILLCLIMB_SCORER`,
/// `HILLCLIMB_DATA_FOLDER`, `HILLCLIMB_SUBMISSIONS_FOLDER`.
pub fn load_config_from(path: Option<&Path>) -> Result<HillclimbConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("hillclimb.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => parse_config_file(&path)?,
        None => HillclimbConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.model = resolve_path(&config.model);
    config.scorer = resolve_path(&config.scorer);
    config.data_folder = resolve_path(&config.data_folder);
    config.submissions_folder = resolve_path(&config.submissions_folder);
    config.report_dir = config.report_dir.as_deref().map(resolve_path);

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<HillclimbConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<HillclimbConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn apply_env_overrides(config: &mut HillclimbConfig) {
    if let Ok(model) = std::env::var("HILLCLIMB_MODEL") {
        config.model = PathBuf::from(model);
    }
    if let Ok(scorer) = std::env::var("HILLCLIMB_SCORER") {
        config.scorer = PathBuf::from(scorer);
    }
    if let Ok(data) = std::env::var("HILLCLIMB_DATA_FOLDER") {
        config.data_folder = PathBuf::from(data);
    }
    if let Ok(subs) = std::env::var("HILLCLIMB_SUBMISSIONS_FOLDER") {
        config.submissions_folder = PathBuf::from(subs);
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("hillclimb"))
}
