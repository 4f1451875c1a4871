//! Promotion of a better output into the canonical slot.
//!
//! Three moves, in order:
//!
//! 1. canonical → `<canonical>.tmp` (back up the current best)
//! 2. working → canonical (promote the candidate)
//! 3. `<canonical>.tmp` → working (the old best takes the working slot)
//!
//! Each move is a copy followed by removing the source, since the working
//! folder may live on a different filesystem. The sequence is not crash-safe:
//! a crash between steps 2 and 3 leaves the backup at `<canonical>.tmp`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::EvalError;

/// Where the previous canonical output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backup {
    /// There was no previous canonical output to back up.
    None,
    /// The previous best now sits in the working slot.
    Working(PathBuf),
    /// Step 3 failed and the previous best was left at `<canonical>.tmp`.
    Stranded(PathBuf),
}

/// A completed promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub canonical: PathBuf,
    pub backup: Backup,
}

/// Move a file by copying it and then removing the source.
pub async fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    tokio::fs::copy(src, dst).await?;
    tokio::fs::remove_file(src).await
}

/// Performs the individual moves of a promotion.
#[async_trait]
pub trait FileMover: Send + Sync {
    async fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// [`move_file`] on the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyThenRemove;

#[async_trait]
impl FileMover for CopyThenRemove {
    async fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        move_file(src, dst).await
    }
}

/// Path used to hold the canonical output during a swap.
pub fn backup_path(canonical: &Path) -> PathBuf {
    let mut name = canonical.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Swap `new_output` into `canonical`, keeping the old canonical output in
/// `new_output`'s place.
///
/// Only a failure of the promote step itself is an error. When it fails
/// after the backup was taken, the backup is moved back so the canonical
/// slot keeps its previous content.
pub async fn promote(new_output: &Path, canonical: &Path) -> Result<Promotion, EvalError> {
    promote_with(new_output, canonical, &CopyThenRemove).await
}

/// [`promote`] with the moves performed by `mover`.
pub async fn promote_with(
    new_output: &Path,
    canonical: &Path,
    mover: &dyn FileMover,
) -> Result<Promotion, EvalError> {
    let backup = backup_path(canonical);

    let backed_up = match mover.move_file(canonical, &backup).await {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %canonical.display(), "no canonical output yet");
            false
        }
        Err(e) => {
            warn!(
                path = %canonical.display(),
                error = %e,
                "failed to back up canonical output, promoting without a backup"
            );
            false
        }
    };

    if let Err(source) = mover.move_file(new_output, canonical).await {
        if backed_up {
            if let Err(e) = mover.move_file(&backup, canonical).await {
                warn!(
                    path = %backup.display(),
                    error = %e,
                    "failed to restore canonical output from backup"
                );
            }
        }
        return Err(EvalError::Swap {
            from: new_output.to_path_buf(),
            to: canonical.to_path_buf(),
            source,
        });
    }

    if !backed_up {
        return Ok(Promotion {
            canonical: canonical.to_path_buf(),
            backup: Backup::None,
        });
    }

    match mover.move_file(&backup, new_output).await {
        Ok(()) => {
            debug!(path = %new_output.display(), "previous best moved to working slot");
            Ok(Promotion {
                canonical: canonical.to_path_buf(),
                backup: Backup::Working(new_output.to_path_buf()),
            })
        }
        Err(e) => {
            warn!(
                path = %backup.display(),
                error = %e,
                "previous best left stranded at backup path"
            );
            Ok(Promotion {
                canonical: canonical.to_path_buf(),
                backup: Backup::Stranded(backup),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FailingMover;

    #[tokio::test]
    async fn swap_exchanges_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("A.out");
        let working = dir.path().join("A.out.tmp");
        std::fs::write(&canonical, "old best").unwrap();
        std::fs::write(&working, "new best").unwrap();

        let promotion = promote(&working, &canonical).await.unwrap();

        assert_eq!(std::fs::read_to_string(&canonical).unwrap(), "new best");
        assert_eq!(std::fs::read_to_string(&working).unwrap(), "old best");
        assert_eq!(promotion.backup, Backup::Working(working.clone()));
        assert!(!backup_path(&canonical).exists());
    }

    #[tokio::test]
    async fn first_promotion_has_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("A.out");
        let working = dir.path().join("A.out.tmp");
        std::fs::write(&working, "first").unwrap();

        let promotion = promote(&working, &canonical).await.unwrap();

        assert_eq!(promotion.backup, Backup::None);
        assert_eq!(std::fs::read_to_string(&canonical).unwrap(), "first");
        assert!(!working.exists());
    }

    #[tokio::test]
    async fn missing_candidate_restores_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("A.out");
        let working = dir.path().join("A.out.tmp");
        std::fs::write(&canonical, "keep me").unwrap();

        let err = promote(&working, &canonical).await.unwrap_err();

        assert!(matches!(err, EvalError::Swap { .. }));
        assert_eq!(std::fs::read_to_string(&canonical).unwrap(), "keep me");
        assert!(!backup_path(&canonical).exists());
    }

    #[tokio::test]
    async fn works_across_directories() {
        let subs = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let canonical = subs.path().join("C.out");
        let working = work.path().join("C.out.tmp");
        std::fs::write(&canonical, "score 5").unwrap();
        std::fs::write(&working, "score 8").unwrap();

        promote(&working, &canonical).await.unwrap();

        assert_eq!(std::fs::read_to_string(&canonical).unwrap(), "score 8");
        assert_eq!(std::fs::read_to_string(&working).unwrap(), "score 5");
    }

    #[tokio::test]
    async fn failed_restore_strands_backup() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("A.out");
        let working = dir.path().join("A.out.tmp");
        let backup = backup_path(&canonical);
        std::fs::write(&canonical, "old best").unwrap();
        std::fs::write(&working, "new best").unwrap();

        let mover = FailingMover::new(&backup);
        let promotion = promote_with(&working, &canonical, &mover).await.unwrap();

        assert_eq!(promotion.backup, Backup::Stranded(backup.clone()));
        assert_eq!(std::fs::read_to_string(&canonical).unwrap(), "new best");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "old best");
        assert!(!working.exists());
    }

    #[tokio::test]
    async fn refused_promote_restores_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().join("A.out");
        let working = dir.path().join("A.out.tmp");
        std::fs::write(&canonical, "old best").unwrap();
        std::fs::write(&working, "new best").unwrap();

        let mover = FailingMover::new(&working);
        let err = promote_with(&working, &canonical, &mover).await.unwrap_err();

        assert_eq!(err.kind(), "swap");
        assert_eq!(std::fs::read_to_string(&canonical).unwrap(), "old best");
        assert_eq!(std::fs::read_to_string(&working).unwrap(), "new best");
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("subs/A.out")),
            PathBuf::from("subs/A.out.tmp")
        );
    }
}
