// pgbackup/src/backup/db_dump.rs
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;

use crate::config::{ConnectionParams, PASSWORD_ENV, Password};
use crate::errors::{BackupError, Result};

const FILENAME_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// What a finished dump process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl DumpReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn status(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

/// Something that can write a database dump to a file.
#[async_trait]
pub trait DumpTool: Send + Sync {
    async fn invoke_dump(
        &self,
        params: &ConnectionParams,
        output_path: &Path,
    ) -> Result<DumpReport>;
}

/// Runs the real `pg_dump` binary.
#[derive(Debug, Clone)]
pub struct PgDump {
    program: PathBuf,
}

impl PgDump {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Arguments for a compressed custom-format dump. The password is not
    /// among them; it travels through the child's environment.
    pub fn dump_args(params: &ConnectionParams, output_path: &Path) -> Vec<String> {
        vec![
            "-h".to_string(),
            params.hostname.clone(),
            "-p".to_string(),
            params.port.to_string(),
            "-U".to_string(),
            params.user.clone(),
            "-f".to_string(),
            output_path.display().to_string(),
            "-Fc".to_string(),
            "-Z9".to_string(),
            "-d".to_string(),
            params.database.clone(),
        ]
    }

    /// An inherited `PGPASSWORD` is passed through untouched; only a typed
    /// password is set on the child.
    fn command(&self, params: &ConnectionParams, output_path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(Self::dump_args(params, output_path))
            .stdin(Stdio::null());
        if let Password::Entered(password) = &params.password {
            command.env(PASSWORD_ENV, password);
        }
        command
    }
}

#[async_trait]
impl DumpTool for PgDump {
    async fn invoke_dump(
        &self,
        params: &ConnectionParams,
        output_path: &Path,
    ) -> Result<DumpReport> {
        log::trace!(
            target: "pgbackup::dump",
            "Running {} for database {}",
            self.program.display(),
            params.database
        );

        let output = self
            .command(params, output_path)
            .output()
            .await
            .map_err(|source| BackupError::DumpSpawn {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(DumpReport {
            exit_code: output.status.code(),
            output: combined,
        })
    }
}

/// `<database>_<YYYYMMDD-HHMMSS>.backup`, timestamp in UTC.
pub fn backup_filename(database: &str, timestamp: DateTime<Utc>) -> String {
    format!("{}_{}.backup", database, timestamp.format(FILENAME_TIMESTAMP_FORMAT))
}

/// Dumps the database into `directory` and returns the artifact's path.
pub async fn create_backup<D>(
    tool: &D,
    params: &ConnectionParams,
    directory: &Path,
) -> Result<PathBuf>
where
    D: DumpTool + ?Sized,
{
    create_backup_at(tool, params, directory, Utc::now()).await
}

pub(crate) async fn create_backup_at<D>(
    tool: &D,
    params: &ConnectionParams,
    directory: &Path,
    timestamp: DateTime<Utc>,
) -> Result<PathBuf>
where
    D: DumpTool + ?Sized,
{
    let filepath = directory.join(backup_filename(&params.database, timestamp));
    log::info!(
        target: "pgbackup::dump",
        "Dumping database {} on {}:{} to {}",
        params.database,
        params.hostname,
        params.port,
        filepath.display()
    );

    let report = tool.invoke_dump(params, &filepath).await?;
    if !report.succeeded() {
        return Err(BackupError::DumpFailed {
            status: report.status(),
            output: report.output,
        });
    }

    if !filepath.exists() {
        log::warn!(
            target: "pgbackup::dump",
            "Dump reported success but {} does not exist",
            filepath.display()
        );
    }
    log::info!(target: "pgbackup::dump", "Finished dump of {}", params.database);

    Ok(filepath)
}
