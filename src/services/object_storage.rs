//! src/services/object_storage.rs
//!
//! ObjectStorageService: thin gateway over an S3-compatible bucket
//! (Cloudflare R2 by default). Hides pagination, filename sanitization and key
//! namespacing. Holds no mutable state: each call maps to one remote request,
//! or a bounded run of paginated requests.

use crate::{
    config::StorageConfig,
    services::{
        bucket::{BucketClient, BucketError, ListPage, PutObject},
        s3_bucket::S3Bucket,
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info};

/// Upper bound the S3 API accepts for a single listing page.
pub const MAX_KEYS_PER_PAGE: usize = 1000;
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const FALLBACK_FILENAME: &str = "file";
const R2_DOMAIN: &str = "r2.cloudflarestorage.com";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing required object storage settings: {}", .0.join(", "))]
    MissingSettings(Vec<&'static str>),
    #[error("either R2_ACCOUNT_ID or R2_ENDPOINT_URL must be set to resolve the storage endpoint")]
    MissingEndpoint,
    #[error("the provided file has no valid name")]
    MissingFilename,
    #[error("the file is empty, nothing to upload")]
    EmptyContent,
    #[error("prefix `{0}` is not valid")]
    InvalidPrefix(String),
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: BucketError,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Snapshot of an object as seen at listing time.
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl StoredObject {
    /// Last path segment of the key.
    pub fn filename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Outcome of a single upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub key: String,
    pub bucket: String,
    pub size: u64,
    pub etag: Option<String>,
    pub url: Option<String>,
}

/// Arguments to `ObjectStorageService::upload`.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub content: Bytes,
    pub filename: String,
    pub content_type: Option<String>,
    pub destination_key: Option<String>,
    pub metadata: BTreeMap<String, Value>,
}

impl UploadRequest {
    pub fn new(content: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_destination_key(mut self, key: impl Into<String>) -> Self {
        self.destination_key = Some(key.into());
        self
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

/// Validated connection settings derived from `StorageConfig`.
struct ResolvedSettings {
    bucket: String,
    endpoint_url: String,
    access_key_id: String,
    secret_access_key: String,
    public_base_url: Option<String>,
}

impl ResolvedSettings {
    /// Check required fields and resolve the endpoint. Never touches the network.
    fn resolve(config: &StorageConfig) -> StorageResult<Self> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let access_key_id = present(&config.access_key_id);
        let secret_access_key = present(&config.secret_access_key);
        let bucket = present(&config.bucket_name);

        let missing: Vec<&'static str> = [
            ("R2_ACCESS_KEY_ID", access_key_id.is_none()),
            ("R2_SECRET_ACCESS_KEY", secret_access_key.is_none()),
            ("R2_BUCKET_NAME", bucket.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, is_missing)| is_missing.then_some(name))
        .collect();

        let (Some(access_key_id), Some(secret_access_key), Some(bucket)) =
            (access_key_id, secret_access_key, bucket)
        else {
            return Err(StorageError::MissingSettings(missing));
        };

        let endpoint_url = match (present(&config.endpoint_url), present(&config.account_id)) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account)) => format!("https://{}.{}", account, R2_DOMAIN),
            (None, None) => return Err(StorageError::MissingEndpoint),
        };

        let public_base_url =
            present(&config.public_base_url).map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            bucket,
            endpoint_url,
            access_key_id,
            secret_access_key,
            public_base_url,
        })
    }
}

/// Gateway to the configured bucket.
///
/// Cheap to clone; every clone shares the same client handle. Construct it
/// once at startup and hand it to whatever needs storage access.
#[derive(Clone)]
pub struct ObjectStorageService {
    client: Arc<dyn BucketClient>,
    bucket: String,
    endpoint_url: String,
    public_base_url: Option<String>,
}

impl ObjectStorageService {
    /// Validate `config` and build an S3 client for it.
    ///
    /// Fails before any network activity when required settings are missing.
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let settings = ResolvedSettings::resolve(config)?;
        let client = S3Bucket::connect(
            &settings.bucket,
            &settings.endpoint_url,
            &settings.access_key_id,
            &settings.secret_access_key,
        )
        .await;
        Ok(Self::from_parts(settings, Arc::new(client)))
    }

    /// Validate `config` but talk to the bucket through `client`.
    pub fn with_client(
        config: &StorageConfig,
        client: Arc<dyn BucketClient>,
    ) -> StorageResult<Self> {
        let settings = ResolvedSettings::resolve(config)?;
        Ok(Self::from_parts(settings, client))
    }

    fn from_parts(settings: ResolvedSettings, client: Arc<dyn BucketClient>) -> Self {
        debug!(
            bucket = %settings.bucket,
            endpoint = %settings.endpoint_url,
            "object storage service initialized"
        );
        Self {
            client,
            bucket: settings.bucket,
            endpoint_url: settings.endpoint_url,
            public_base_url: settings.public_base_url,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Upload `request.content` under an explicit destination key or under
    /// `build_key(filename)`.
    pub async fn upload(&self, request: UploadRequest) -> StorageResult<UploadResult> {
        if request.filename.is_empty() {
            return Err(StorageError::MissingFilename);
        }

        let key = match request.destination_key {
            Some(key) => key,
            None => self.build_key(&request.filename, None),
        };
        let metadata = prepare_metadata(&request.metadata, &request.filename);

        let size = request.content.len() as u64;
        if size == 0 {
            return Err(StorageError::EmptyContent);
        }

        let content_type = request
            .content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let output = self
            .client
            .put_object(PutObject {
                key: key.clone(),
                body: request.content,
                content_type,
                metadata,
            })
            .await
            .map_err(|source| {
                error!(
                    error = %source,
                    key = %key,
                    bucket = %self.bucket,
                    "failed to upload object"
                );
                StorageError::Remote {
                    operation: "put_object",
                    source,
                }
            })?;

        info!(key = %key, bucket = %self.bucket, size_bytes = size, "object uploaded");

        Ok(UploadResult {
            url: self.public_url(&key),
            key,
            bucket: self.bucket.clone(),
            size,
            etag: output.etag,
        })
    }

    /// List objects under `prefix`, following continuation tokens until the
    /// bucket is exhausted or `max_keys` objects were collected.
    ///
    /// Objects come back in bucket order; callers sort if they need to.
    pub async fn list_objects(
        &self,
        prefix: Option<&str>,
        max_keys: usize,
    ) -> StorageResult<Vec<StoredObject>> {
        let page_size = max_keys.clamp(1, MAX_KEYS_PER_PAGE);
        let prefix = prefix
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let page = self
                .client
                .list_objects_page(ListPage {
                    prefix: prefix.clone(),
                    max_keys: page_size,
                    continuation_token: continuation_token.take(),
                })
                .await
                .map_err(|source| {
                    error!(
                        error = %source,
                        prefix = ?prefix,
                        bucket = %self.bucket,
                        "failed to list objects"
                    );
                    StorageError::Remote {
                        operation: "list_objects_v2",
                        source,
                    }
                })?;

            objects.extend(page.objects.into_iter().map(|obj| StoredObject {
                url: self.public_url(&obj.key),
                key: obj.key,
                size: obj.size,
                last_modified: obj.last_modified,
            }));

            if !page.is_truncated || objects.len() >= max_keys {
                break;
            }
            match page.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        objects.truncate(max_keys);
        Ok(objects)
    }

    /// Bulk-delete `keys` in one quiet request. Returns the number of keys
    /// submitted; the bucket does not report which of them actually existed.
    pub async fn delete_objects<I>(&self, keys: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = String>,
    {
        let keys: Vec<String> = keys.into_iter().filter(|k| !k.is_empty()).collect();
        if keys.is_empty() {
            return Ok(0);
        }

        self.client.delete_objects(&keys).await.map_err(|source| {
            error!(
                error = %source,
                keys = ?keys,
                bucket = %self.bucket,
                "failed to delete objects"
            );
            StorageError::Remote {
                operation: "delete_objects",
                source,
            }
        })?;

        info!(count = keys.len(), bucket = %self.bucket, "objects deleted");
        Ok(keys.len())
    }

    /// Delete everything under `prefix`, one listing page at a time.
    ///
    /// Not atomic: objects written under the prefix while this runs may or
    /// may not be removed.
    pub async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let normalized = prefix.trim().trim_matches('/');
        if normalized.is_empty() {
            return Err(StorageError::InvalidPrefix(prefix.to_string()));
        }

        let mut total_deleted = 0;
        loop {
            let objects = self
                .list_objects(Some(normalized), MAX_KEYS_PER_PAGE)
                .await?;
            if objects.is_empty() {
                break;
            }

            let listed = objects.len();
            total_deleted += self
                .delete_objects(objects.into_iter().map(|obj| obj.key))
                .await?;

            if listed < MAX_KEYS_PER_PAGE {
                break;
            }
        }

        debug!(prefix = %normalized, deleted = total_deleted, "prefix deleted");
        Ok(total_deleted)
    }

    /// Time-limited GET URL for `key`.
    pub async fn generate_presigned_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.client
            .presign_get(key, expires_in)
            .await
            .map_err(|source| {
                error!(error = %source, key = %key, "failed to presign url");
                StorageError::Remote {
                    operation: "presign_get_object",
                    source,
                }
            })
    }

    /// Build a storage key from a sanitized filename and an optional prefix.
    pub fn build_key(&self, filename: &str, prefix: Option<&str>) -> String {
        build_key(filename, prefix)
    }

    fn public_url(&self, key: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, key))
    }
}

/// `prefix/sanitized_name`, or just the sanitized name without a prefix.
pub fn build_key(filename: &str, prefix: Option<&str>) -> String {
    let safe_name = sanitize_filename(filename);
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_matches('/'), safe_name),
        None => safe_name,
    }
}

/// Keep only the last path segment and replace anything outside
/// `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    let normalized = filename.trim().replace('\\', "/");
    let leaf = normalized.rsplit('/').next().unwrap_or_default();
    let safe: String = leaf
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        safe
    }
}

/// Stringify metadata values, drop nulls, and record the original filename
/// unless the caller already did.
fn prepare_metadata(
    metadata: &BTreeMap<String, Value>,
    original_filename: &str,
) -> BTreeMap<String, String> {
    let mut prepared: BTreeMap<String, String> = metadata
        .iter()
        .filter_map(|(name, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((name.clone(), s.clone())),
            other => Some((name.clone(), other.to_string())),
        })
        .collect();

    if !original_filename.is_empty() {
        prepared
            .entry("original_filename".to_string())
            .or_insert_with(|| original_filename.to_string());
    }
    prepared
}
