use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("Failed to read password: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Failed to manage scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Failed to execute {program}: {source}")]
    DumpSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dump tool ran but exited unsuccessfully. `output` holds whatever it printed.
    #[error("Dump failed with {status}: {output}")]
    DumpFailed { status: String, output: String },

    #[error("Bucket {bucket} not in {available:?}")]
    BucketNotFound {
        bucket: String,
        available: Vec<String>,
    },

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Upload of {path} failed: {reason}")]
    Upload { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, BackupError>;
