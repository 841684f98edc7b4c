//! Recording stand-ins for the dump tool and the object store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backup::b2_upload::{B2Credentials, ObjectStore, StoreConnector};
use crate::backup::db_dump::{DumpReport, DumpTool};
use crate::config::{
    B2_APPLICATION_KEY_ENV, B2_KEY_ID_ENV, ConnectionParams, PASSWORD_ENV, Password,
};
use crate::errors::{BackupError, Result};

pub fn sample_params() -> ConnectionParams {
    ConnectionParams {
        hostname: "localhost".to_string(),
        port: 5432,
        user: "alice".to_string(),
        password: Password::Entered("s3cret".to_string()),
        database: "mydb".to_string(),
    }
}

pub fn b2_env() -> HashMap<String, String> {
    [
        (PASSWORD_ENV.to_string(), "s3cret".to_string()),
        (B2_KEY_ID_ENV.to_string(), "0012345".to_string()),
        (B2_APPLICATION_KEY_ENV.to_string(), "K00abcdef".to_string()),
    ]
    .into_iter()
    .collect()
}

/// Writes a small file at the requested path, or fails with a fixed report.
#[derive(Debug, Default)]
pub struct FakeDumpTool {
    failure: Option<DumpReport>,
    invocations: Mutex<Vec<(ConnectionParams, PathBuf)>>,
}

impl FakeDumpTool {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(exit_code: Option<i32>, output: &str) -> Self {
        Self {
            failure: Some(DumpReport {
                exit_code,
                output: output.to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn last_params(&self) -> Option<ConnectionParams> {
        self.invocations.lock().unwrap().last().map(|(params, _)| params.clone())
    }
}

#[async_trait]
impl DumpTool for FakeDumpTool {
    async fn invoke_dump(
        &self,
        params: &ConnectionParams,
        output_path: &Path,
    ) -> Result<DumpReport> {
        self.invocations
            .lock()
            .unwrap()
            .push((params.clone(), output_path.to_path_buf()));

        if let Some(report) = &self.failure {
            // pg_dump may leave a partial file behind before failing.
            tokio::fs::write(output_path, b"PG").await?;
            return Ok(report.clone());
        }

        tokio::fs::write(output_path, b"PGDMP").await?;
        Ok(DumpReport {
            exit_code: Some(0),
            output: String::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub bucket: String,
    pub object_name: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreCalls {
    pub connects: usize,
    pub list_calls: usize,
    pub uploads: Vec<RecordedUpload>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    buckets: Vec<String>,
    calls: Arc<Mutex<StoreCalls>>,
}

impl FakeConnector {
    pub fn with_buckets(buckets: &[&str]) -> Self {
        Self {
            buckets: buckets.iter().map(|b| b.to_string()).collect(),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> StoreCalls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreConnector for FakeConnector {
    type Store = FakeStore;

    async fn connect(&self, _credentials: &B2Credentials) -> Result<FakeStore> {
        self.calls.lock().unwrap().connects += 1;
        Ok(FakeStore {
            buckets: self.buckets.clone(),
            calls: Arc::clone(&self.calls),
        })
    }
}

#[derive(Debug)]
pub struct FakeStore {
    buckets: Vec<String>,
    calls: Arc<Mutex<StoreCalls>>,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        self.calls.lock().unwrap().list_calls += 1;
        Ok(self.buckets.clone())
    }

    async fn upload_object(&self, bucket: &str, object_name: &str, file_path: &Path) -> Result<()> {
        let contents = tokio::fs::read(file_path)
            .await
            .map_err(|e| BackupError::Upload {
                path: file_path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.calls.lock().unwrap().uploads.push(RecordedUpload {
            bucket: bucket.to_string(),
            object_name: object_name.to_string(),
            contents,
        });
        Ok(())
    }
}
