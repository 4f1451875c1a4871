//! Core data model types for hillclimb.
//!
//! Datasets, their on-disk file sets, scores, and per-dataset results.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, EvalError};

/// A score assigned by the scorer. Higher is always better.
pub type Score = i64;

/// Placeholder for a score that was never determined.
pub const SENTINEL_SCORE: Score = -1;

/// A benchmark case, identified by a short token such as `A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dataset(String);

impl Dataset {
    /// Create a dataset from its token.
    ///
    /// The token names files inside the data and submissions folders, so it
    /// must be non-empty and must not contain path separators or `..`.
    pub fn new(token: impl Into<String>) -> Result<Self, DatasetError> {
        let token = token.into();
        if token.is_empty()
            || token == "."
            || token == ".."
            || token.contains(['/', '\\'])
            || token.chars().any(char::is_whitespace)
        {
            return Err(DatasetError::InvalidToken(token));
        }
        Ok(Self(token))
    }

    /// The dataset token.
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Parse a dataset list.
    ///
    /// A list containing commas is split on them (`"easy,hard"`); otherwise
    /// every character is its own token (`"ABC"` → `A`, `B`, `C`). Tokens must
    /// be unique within one run.
    pub fn parse_list(list: &str) -> Result<Vec<Dataset>, DatasetError> {
        let tokens: Vec<String> = if list.contains(',') {
            list.split(',').map(|s| s.trim().to_string()).collect()
        } else {
            list.trim().chars().map(String::from).collect()
        };

        if tokens.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut seen = HashSet::new();
        let mut datasets = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !seen.insert(token.clone()) {
                return Err(DatasetError::Duplicate(token));
            }
            datasets.push(Dataset::new(token)?);
        }
        Ok(datasets)
    }

    /// Derive this dataset's file set.
    pub fn paths(&self, data_folder: &Path, submissions_folder: &Path) -> DatasetPaths {
        DatasetPaths::derive(self, data_folder, submissions_folder)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Dataset {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::new(s)
    }
}

impl TryFrom<String> for Dataset {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Dataset::new(value)
    }
}

impl From<Dataset> for String {
    fn from(dataset: Dataset) -> Self {
        dataset.0
    }
}

/// The four files that belong to one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    /// `<data>/<D>.in`, read-only input.
    pub input: PathBuf,
    /// `<submissions>/<D>.score`, the ledger.
    pub score: PathBuf,
    /// `<submissions>/<D>.out`, the canonical best output.
    pub output: PathBuf,
    /// `<submissions>-tmp/<D>.out.tmp`, the working output.
    pub working: PathBuf,
}

impl DatasetPaths {
    pub fn derive(dataset: &Dataset, data_folder: &Path, submissions_folder: &Path) -> Self {
        let token = dataset.token();
        Self {
            input: data_folder.join(format!("{token}.in")),
            score: submissions_folder.join(format!("{token}.score")),
            output: submissions_folder.join(format!("{token}.out")),
            working: working_folder(submissions_folder).join(format!("{token}.out.tmp")),
        }
    }
}

/// The working folder that sits next to the submissions folder.
pub fn working_folder(submissions_folder: &Path) -> PathBuf {
    // components() drops a trailing separator so "subs/" becomes "subs-tmp"
    let mut name = submissions_folder.components().as_path().as_os_str().to_owned();
    name.push("-tmp");
    PathBuf::from(name)
}

/// Outcome of comparing a new score against the recorded best.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Better,
    Same,
    #[default]
    Worse,
    Failed,
}

impl Status {
    /// Compare a new score with the previous best.
    pub fn decide(old: Score, new: Score) -> Self {
        use std::cmp::Ordering;
        match new.cmp(&old) {
            Ordering::Greater => Status::Better,
            Ordering::Equal => Status::Same,
            Ordering::Less => Status::Worse,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Better => "better",
            Status::Same => "same",
            Status::Worse => "worse",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the model printed while it ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "text", rename_all = "lowercase")]
pub enum ModelOutput {
    /// The model never ran.
    #[default]
    NotRun,
    /// Output went straight to the terminal and was not kept.
    Streamed,
    /// Captured stdout followed by stderr.
    Captured(String),
}

/// Result of evaluating one dataset.
///
/// Created with sentinel scores before the evaluation starts and only ever
/// mutated by that dataset's own worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub dataset: Dataset,
    pub old_score: Score,
    pub new_score: Score,
    pub status: Status,
    #[serde(default)]
    pub model_output: ModelOutput,
    #[serde(default)]
    pub scorer_stderr: String,
    /// Why the evaluation stopped early, if it did.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_kind: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl EvaluationResult {
    /// A fresh result with sentinel scores and the default status.
    pub fn pending(dataset: Dataset) -> Self {
        Self {
            dataset,
            old_score: SENTINEL_SCORE,
            new_score: SENTINEL_SCORE,
            status: Status::default(),
            model_output: ModelOutput::NotRun,
            scorer_stderr: String::new(),
            error: None,
            error_kind: None,
            duration_ms: 0,
        }
    }

    /// Mark this result as aborted by `err`. Scores already determined are kept.
    pub fn fail(&mut self, err: &EvalError) {
        self.status = Status::Failed;
        self.error = Some(err.to_string());
        self.error_kind = Some(err.kind().to_string());
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// Score to show in the one-line summary: the new score if one was
    /// determined, otherwise the sentinel.
    pub fn final_score(&self) -> Score {
        self.new_score
    }
}
