//! Score ledger: the persisted best score of a dataset.
//!
//! The ledger file holds the exact bytes the scorer printed. Reads trim
//! whitespace before parsing; writes keep the bytes verbatim.

use std::path::{Path, PathBuf};

use crate::error::EvalError;
use crate::model::Score;

/// Parse raw scorer or ledger bytes as a score.
///
/// Surrounding whitespace is ignored. Negative values are rejected.
pub fn parse_score(raw: &[u8]) -> Option<Score> {
    let text = std::str::from_utf8(raw).ok()?;
    let value: u64 = text.trim().parse().ok()?;
    Score::try_from(value).ok()
}

/// Read the recorded best score from `path`.
pub async fn read_score(path: &Path) -> Result<Score, EvalError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| EvalError::LedgerMissing {
            path: path.to_path_buf(),
            source,
        })?;

    parse_score(&raw).ok_or_else(|| EvalError::LedgerParse {
        path: path.to_path_buf(),
        content: String::from_utf8_lossy(&raw).into_owned(),
    })
}

/// What a ledger file currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerState {
    /// No ledger file.
    Missing,
    /// A ledger file that cannot be read as a score.
    Invalid(String),
    /// A recorded best score.
    Recorded(Score),
}

/// Inspect the ledger at `path` without failing.
pub async fn inspect(path: &Path) -> LedgerState {
    match read_score(path).await {
        Ok(score) => LedgerState::Recorded(score),
        Err(e) if e.is_ledger_missing() => LedgerState::Missing,
        Err(e) => LedgerState::Invalid(e.to_string()),
    }
}

/// Replace the ledger at `path` with `raw`.
///
/// The bytes are staged next to the ledger and renamed over it, so readers
/// see either the old or the new score, never a partial write.
pub async fn write_score(path: &Path, raw: &[u8]) -> Result<(), EvalError> {
    let staged = staging_path(path);
    let to_err = |source| EvalError::LedgerWrite {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(&staged, raw).await.map_err(to_err)?;
    if let Err(source) = tokio::fs::rename(&staged, path).await {
        let _ = tokio::fs::remove_file(&staged).await;
        return Err(to_err(source));
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
