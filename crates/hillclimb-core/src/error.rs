//! Error types for dataset evaluation.
//!
//! Every `EvalError` is local to one dataset: the worker records it on that
//! dataset's result and the rest of the run carries on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort the evaluation of a single dataset.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The score ledger file could not be read.
    #[error("couldn't load {}: {source}", path.display())]
    LedgerMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The score ledger file exists but does not hold an integer.
    #[error("couldn't parse {} as a score: {content:?}", path.display())]
    LedgerParse { path: PathBuf, content: String },

    /// Writing the new score failed after the output was already promoted.
    #[error(
        "error writing new score to {}: {source} (canonical output was promoted, ledger still holds the previous score)",
        path.display()
    )]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The model could not be spawned or exited unsuccessfully.
    #[error("error executing model: {0}")]
    ModelExec(String),

    /// The scorer could not be spawned or exited unsuccessfully.
    #[error("error computing new score: {0}")]
    ScorerExec(String),

    /// The scorer's standard output is not an integer score.
    #[error("couldn't parse new score as int: {0:?}")]
    ScoreParse(String),

    /// Moving the new output into the canonical slot failed.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Swap {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A submissions directory could not be created.
    #[error("failed to prepare {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The dataset's task panicked or was aborted before producing a result.
    #[error("evaluation task did not complete: {0}")]
    TaskPanicked(String),
}

impl EvalError {
    /// Returns `true` if the ledger file simply does not exist yet.
    pub fn is_ledger_missing(&self) -> bool {
        matches!(
            self,
            EvalError::LedgerMissing { source, .. } if source.kind() == io::ErrorKind::NotFound
        )
    }

    /// Short machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::LedgerMissing { .. } | EvalError::LedgerParse { .. } => "ledger_read",
            EvalError::LedgerWrite { .. } => "ledger_write",
            EvalError::ModelExec(_) => "model_exec",
            EvalError::ScorerExec(_) | EvalError::ScoreParse(_) => "scorer_exec",
            EvalError::Swap { .. } => "swap",
            EvalError::Workspace { .. } => "workspace",
            EvalError::TaskPanicked(_) => "task",
        }
    }
}

/// Errors in the list of dataset tokens handed to a run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    /// No dataset tokens were given.
    #[error("no datasets to evaluate")]
    Empty,

    /// A token is empty or would escape its folder.
    #[error("invalid dataset token {0:?}")]
    InvalidToken(String),

    /// The same token appears twice; both tasks would write the same files.
    #[error("dataset {0:?} listed more than once")]
    Duplicate(String),
}
