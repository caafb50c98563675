//! In-memory `BucketClient` used by tests. Records every request so tests can
//! assert which remote calls were (or were not) issued.

use crate::services::bucket::{
    BucketClient, BucketError, BucketResult, ListPage, ListedObject, ObjectPage, PutObject,
    PutObjectOutput,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum BucketCall {
    Put { key: String },
    List {
        prefix: Option<String>,
        max_keys: usize,
        continuation_token: Option<String>,
    },
    Delete { keys: Vec<String> },
    Presign { key: String, expires_in: Duration },
}

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub body: Bytes,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    calls: Mutex<Vec<BucketCall>>,
    failing: AtomicBool,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call.
    pub fn insert(&self, key: &str, body: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                body: body.into(),
                content_type: "application/octet-stream".into(),
                metadata: BTreeMap::new(),
                last_modified,
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<BucketCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every subsequent request fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, call: BucketCall) -> BucketResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BucketError::new("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl BucketClient for MemoryBucket {
    async fn put_object(&self, request: PutObject) -> BucketResult<PutObjectOutput> {
        self.record(BucketCall::Put {
            key: request.key.clone(),
        })?;

        self.objects.lock().unwrap().insert(
            request.key,
            MemoryObject {
                body: request.body,
                content_type: request.content_type,
                metadata: request.metadata,
                last_modified: Utc::now(),
            },
        );

        Ok(PutObjectOutput {
            etag: Some(format!("\"{}\"", Uuid::new_v4().simple())),
        })
    }

    async fn list_objects_page(&self, page: ListPage) -> BucketResult<ObjectPage> {
        self.record(BucketCall::List {
            prefix: page.prefix.clone(),
            max_keys: page.max_keys,
            continuation_token: page.continuation_token.clone(),
        })?;

        let objects = self.objects.lock().unwrap();
        let mut matching = objects
            .iter()
            .filter(|(key, _)| page.prefix.as_deref().is_none_or(|p| key.starts_with(p)))
            .filter(|(key, _)| {
                page.continuation_token
                    .as_deref()
                    .is_none_or(|token| key.as_str() > token)
            });

        let listed: Vec<ListedObject> = matching
            .by_ref()
            .take(page.max_keys)
            .map(|(key, obj)| ListedObject {
                key: key.clone(),
                size: obj.body.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect();
        let is_truncated = matching.next().is_some();
        let next_continuation_token = if is_truncated {
            listed.last().map(|obj| obj.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: listed,
            is_truncated,
            next_continuation_token,
        })
    }

    async fn delete_objects(&self, keys: &[String]) -> BucketResult<()> {
        self.record(BucketCall::Delete {
            keys: keys.to_vec(),
        })?;

        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> BucketResult<String> {
        self.record(BucketCall::Presign {
            key: key.to_string(),
            expires_in,
        })?;

        Ok(format!(
            "https://memory.invalid/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}
