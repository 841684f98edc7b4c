pub(crate) mod b2_upload;
pub(crate) mod db_dump;
pub(crate) mod scratch;
#[cfg(test)]
pub(crate) mod testing;

use std::io;
use std::path::{Path, PathBuf};

use crate::config::{ConnectionTarget, EnvSource, UploadTarget};
use crate::errors::Result;
use crate::utils::password::resolve_password;
use b2_upload::{StoreConnector, UploadReceipt, upload_to_bucket};
use db_dump::{DumpTool, create_backup};
use scratch::ScratchDir;

/// One backup run as requested on the command line.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub connection: ConnectionTarget,
    pub upload: Option<UploadTarget>,
    pub temp_dump_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// Name of the dump file. The file itself is gone once the run returns.
    pub artifact_name: String,
    pub upload: Option<UploadReceipt>,
}

/// Runs a backup: dump into a scratch directory, optionally upload, then
/// remove the scratch directory whether or not the steps succeeded.
pub async fn run_backup_flow<D, C, E, P>(
    request: &BackupRequest,
    env: &E,
    prompt: P,
    dump_tool: &D,
    connector: &C,
) -> Result<BackupOutcome>
where
    D: DumpTool + ?Sized,
    C: StoreConnector + ?Sized,
    E: EnvSource + ?Sized,
    P: FnOnce() -> io::Result<String>,
{
    let scratch = ScratchDir::acquire(request.temp_dump_root.as_deref())?;

    let result = perform_backup(request, env, prompt, dump_tool, connector, scratch.path()).await;
    let released = scratch.release();

    match (result, released) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), released) => {
            if let Err(release_err) = released {
                log::warn!(
                    target: "pgbackup::scratch",
                    "Cleanup after failed run also failed: {release_err}"
                );
            }
            Err(e)
        }
    }
}

async fn perform_backup<D, C, E, P>(
    request: &BackupRequest,
    env: &E,
    prompt: P,
    dump_tool: &D,
    connector: &C,
    directory: &Path,
) -> Result<BackupOutcome>
where
    D: DumpTool + ?Sized,
    C: StoreConnector + ?Sized,
    E: EnvSource + ?Sized,
    P: FnOnce() -> io::Result<String>,
{
    let password = resolve_password(env, prompt)?;
    let params = request.connection.clone().with_password(password);

    let filepath = create_backup(dump_tool, &params, directory).await?;
    let artifact_name = filepath
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let upload = match &request.upload {
        Some(target) => Some(upload_to_bucket(connector, env, &filepath, target).await?),
        None => {
            log::info!(target: "pgbackup::upload", "No bucket given, skipping upload");
            None
        }
    };

    Ok(BackupOutcome {
        artifact_name,
        upload,
    })
}
