pub mod password;

use std::path::{Path, PathBuf};

use which::which;

use crate::errors::{BackupError, Result};

/// Finds the pg_dump executable, preferring an explicitly configured path.
pub fn find_pg_dump_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(BackupError::Config(format!(
            "pg_dump executable not found at {}",
            path.display()
        ))),
        None => which("pg_dump").map_err(|_| {
            BackupError::Config(
                "pg_dump executable not found in PATH. \
                 Please ensure PostgreSQL client tools are installed and in your PATH."
                    .to_string(),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_must_exist() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("pg_dump");
        assert!(matches!(
            find_pg_dump_executable(Some(&missing)),
            Err(BackupError::Config(_))
        ));

        std::fs::write(&missing, b"")?;
        assert_eq!(find_pg_dump_executable(Some(&missing))?, missing);
        Ok(())
    }
}
