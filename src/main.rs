//! PostgreSQL backup tool
//!
//! Dumps a single database with pg_dump and optionally uploads the dump to a b2 bucket.

// pgbackup/src/main.rs
mod backup;
mod config;
mod errors;
mod utils;

use anyhow::{Context, Result};
use backup::b2_upload::B2Connector;
use backup::db_dump::PgDump;
use backup::{BackupRequest, run_backup_flow};
use config::{Cli, ProcessEnv};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse_args();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = cli.verbose {
        logger.filter_level(level);
    }
    logger.init();

    let result = run_app(cli).await;
    match &result {
        Ok(_) => println!("✅ Backup completed successfully."),
        Err(e) => eprintln!("❌ Error: {:?}", e),
    }
    ExitCode::from(exit_status(&result))
}

/// Zero on success, one on any failure. Argument errors never get here;
/// clap exits with its own code.
fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    let pg_dump = utils::find_pg_dump_executable(cli.pg_dump.as_deref())?;
    log::debug!("Using pg_dump at {}", pg_dump.display());
    let connector = B2Connector::new(cli.b2_endpoint.clone(), cli.b2_region.clone());

    let request = BackupRequest {
        connection: cli.connection_target(),
        upload: cli.upload_target(),
        temp_dump_root: cli.temp_dump_root.clone(),
    };

    let outcome = run_backup_flow(
        &request,
        &ProcessEnv,
        utils::password::prompt_tty,
        &PgDump::new(pg_dump),
        &connector,
    )
    .await
    .with_context(|| format!("Backup of database {} failed", cli.database))?;

    match &outcome.upload {
        Some(receipt) => log::info!(
            "Backup {} stored in bucket {} as {}",
            outcome.artifact_name,
            receipt.bucket,
            receipt.object_name
        ),
        None => log::info!(
            "Backup {} created and discarded (no bucket given)",
            outcome.artifact_name
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackupError;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&Ok(())), 0);

        let dump_failed: Result<()> = Err(BackupError::DumpFailed {
            status: "exit code 1".to_string(),
            output: String::new(),
        })
        .context("Backup of database mydb failed");
        assert_eq!(exit_status(&dump_failed), 1);

        let missing_bucket: Result<()> = Err(BackupError::BucketNotFound {
            bucket: "mybucket".to_string(),
            available: vec![],
        }
        .into());
        assert_eq!(exit_status(&missing_bucket), 1);
    }
}
