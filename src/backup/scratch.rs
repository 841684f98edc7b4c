// pgbackup/src/backup/scratch.rs
use std::path::Path;

use tempfile::{Builder as TempFileBuilder, TempDir};

use crate::errors::{BackupError, Result};

/// Temporary directory holding the dump artifact for a single run.
///
/// `release` removes it explicitly; if the guard is dropped on an error path
/// the directory is removed by `TempDir`'s drop instead.
#[derive(Debug)]
pub struct ScratchDir {
    inner: TempDir,
}

impl ScratchDir {
    pub fn acquire(root: Option<&Path>) -> Result<Self> {
        let mut builder = TempFileBuilder::new();
        builder.prefix("pgbackup_");
        let inner = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(BackupError::Scratch)?;

        log::debug!(
            target: "pgbackup::scratch",
            "Acquired scratch directory {}",
            inner.path().display()
        );
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn release(self) -> Result<()> {
        let path = self.inner.path().to_path_buf();
        self.inner.close().map_err(BackupError::Scratch)?;
        log::debug!(target: "pgbackup::scratch", "Removed scratch directory {}", path.display());
        Ok(())
    }
}
