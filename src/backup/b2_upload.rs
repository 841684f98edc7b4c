// pgbackup/src/backup/b2_upload.rs
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;

use crate::config::{B2_APPLICATION_KEY_ENV, B2_KEY_ID_ENV, B2Settings, EnvSource, UploadTarget};
use crate::errors::{BackupError, Result};

/// Application key pair of the b2 account.
#[derive(Clone)]
pub struct B2Credentials {
    pub key_id: String,
    pub application_key: String,
}

impl B2Credentials {
    pub fn from_env<E: EnvSource + ?Sized>(env: &E) -> Result<Self> {
        let key_id = env
            .var(B2_KEY_ID_ENV)?
            .ok_or(BackupError::MissingCredential(B2_KEY_ID_ENV))?;
        let application_key = env
            .var(B2_APPLICATION_KEY_ENV)?
            .ok_or(BackupError::MissingCredential(B2_APPLICATION_KEY_ENV))?;
        Ok(Self {
            key_id,
            application_key,
        })
    }
}

impl std::fmt::Debug for B2Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2Credentials")
            .field("key_id", &self.key_id)
            .field("application_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Stores the contents of `file_path` as `object_name` in `bucket`.
    async fn upload_object(
        &self,
        bucket: &str,
        object_name: &str,
        file_path: &Path,
    ) -> Result<()>;
}

/// Builds an [`ObjectStore`] from explicit credentials.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: ObjectStore;

    async fn connect(&self, credentials: &B2Credentials) -> Result<Self::Store>;
}

/// Connects to b2. Endpoint and region are only validated on `connect`, so a
/// run without a bucket never looks at them.
#[derive(Debug, Clone)]
pub struct B2Connector {
    endpoint: Option<String>,
    region: String,
}

impl B2Connector {
    pub fn new(endpoint: Option<String>, region: String) -> Self {
        Self { endpoint, region }
    }
}

#[async_trait]
impl StoreConnector for B2Connector {
    type Store = B2Store;

    async fn connect(&self, credentials: &B2Credentials) -> Result<B2Store> {
        let settings = B2Settings::new(self.endpoint.as_deref(), &self.region)?;
        log::debug!(target: "pgbackup::upload", "Connecting to {}", settings.endpoint_url);

        let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .endpoint_url(&settings.endpoint_url)
            .region(Region::new(settings.region))
            .credentials_provider(s3::config::Credentials::new(
                &credentials.key_id,
                &credentials.application_key,
                None, // session_token
                None, // expiry
                "Static",
            ))
            .load()
            .await;

        Ok(B2Store {
            client: s3::Client::new(&sdk_config),
        })
    }
}

/// b2 bucket access through its S3-compatible API.
#[derive(Debug, Clone)]
pub struct B2Store {
    client: s3::Client,
}

#[async_trait]
impl ObjectStore for B2Store {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| {
                BackupError::ObjectStore(format!(
                    "Failed to list buckets: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        object_name: &str,
        file_path: &Path,
    ) -> Result<()> {
        let body = ByteStream::from_path(file_path)
            .await
            .map_err(|e| BackupError::Upload {
                path: file_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(object_name)
            .body(body)
            .send()
            .await
            .map_err(|e| BackupError::Upload {
                path: file_path.to_path_buf(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub bucket: String,
    pub object_name: String,
}

/// Appends `/` to a non-blank prefix unless everything but its last
/// character is exactly `/`. A blank prefix is returned untouched.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return prefix.to_string();
    }

    let mut chars = prefix.chars();
    chars.next_back();
    if chars.as_str() != "/" {
        format!("{trimmed}/")
    } else {
        prefix.to_string()
    }
}

/// Uploads the artifact to `target.bucket` under its base filename.
///
/// Credentials are checked before any connection is made, and the bucket must
/// be listed by the account before anything is uploaded. The prefix is
/// normalized but not applied to the object name.
pub async fn upload_to_bucket<C, E>(
    connector: &C,
    env: &E,
    filepath: &Path,
    target: &UploadTarget,
) -> Result<UploadReceipt>
where
    C: StoreConnector + ?Sized,
    E: EnvSource + ?Sized,
{
    let credentials = B2Credentials::from_env(env)?;
    let store = connector.connect(&credentials).await?;

    let bucket_names = store.list_buckets().await?;
    if !bucket_names.iter().any(|name| name == &target.bucket) {
        return Err(BackupError::BucketNotFound {
            bucket: target.bucket.clone(),
            available: bucket_names,
        });
    }

    let prefix = normalize_prefix(&target.prefix);
    log::debug!(
        target: "pgbackup::upload",
        "Normalized prefix {prefix:?} is not applied to the object name"
    );

    let object_name = filepath
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BackupError::Upload {
            path: filepath.to_path_buf(),
            reason: "artifact path has no UTF-8 file name".to_string(),
        })?
        .to_string();

    log::info!(
        target: "pgbackup::upload",
        "Uploading {} to bucket {} as {}",
        filepath.display(),
        target.bucket,
        object_name
    );
    store.upload_object(&target.bucket, &object_name, filepath).await?;
    log::info!(
        target: "pgbackup::upload",
        "Uploaded {} to bucket {}",
        object_name,
        target.bucket
    );

    Ok(UploadReceipt {
        bucket: target.bucket.clone(),
        object_name,
    })
}
