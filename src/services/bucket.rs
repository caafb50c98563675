//! Raw bucket requests issued by the object storage gateway.
//!
//! `BucketClient` is the narrow seam between `ObjectStorageService` and the
//! remote S3-compatible API. Each method maps to exactly one remote request.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, time::Duration};
use thiserror::Error;

/// Failure reported by the underlying bucket transport.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BucketError(String);

impl BucketError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type BucketResult<T> = Result<T, BucketError>;

/// A single object write.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
}

/// Parameters for one ListObjectsV2 page.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub prefix: Option<String>,
    pub max_keys: usize,
    pub continuation_token: Option<String>,
}

/// An entry returned by a listing, before URLs are attached.
#[derive(Debug, Clone)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ListedObject>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait BucketClient: Send + Sync {
    /// Write one object.
    async fn put_object(&self, request: PutObject) -> BucketResult<PutObjectOutput>;

    /// Fetch a single listing page.
    async fn list_objects_page(&self, page: ListPage) -> BucketResult<ObjectPage>;

    /// Quiet bulk delete. Per-key failures are not reported.
    async fn delete_objects(&self, keys: &[String]) -> BucketResult<()>;

    /// Presigned GET URL for `key`, valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> BucketResult<String>;
}
