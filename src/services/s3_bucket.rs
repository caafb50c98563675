//! `BucketClient` backed by `aws-sdk-s3`, configured for Cloudflare R2 or any
//! other S3-compatible endpoint.

use crate::services::bucket::{
    BucketClient, BucketError, BucketResult, ListPage, ListedObject, ObjectPage, PutObject,
    PutObjectOutput,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::{ByteStream, DateTime as SmithyDateTime},
    types::{Delete, ObjectIdentifier},
};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// R2 ignores the region but SigV4 requires one.
const SIGNING_REGION: &str = "auto";

#[derive(Clone)]
pub struct S3Bucket {
    client: Client,
    bucket: String,
}

impl S3Bucket {
    /// Build a client with static credentials and path-style addressing.
    ///
    /// No request is sent here; credentials are only exercised on first use.
    pub async fn connect(
        bucket: &str,
        endpoint_url: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "docqa-static",
        );
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(SIGNING_REGION))
            .credentials_provider(credentials)
            .load()
            .await;

        let conf = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(endpoint_url)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(conf),
            bucket: bucket.to_string(),
        }
    }
}

fn remote_error<E>(err: E) -> BucketError
where
    E: std::error::Error,
{
    BucketError::new(DisplayErrorContext(err).to_string())
}

fn to_chrono(ts: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait]
impl BucketClient for S3Bucket {
    async fn put_object(&self, request: PutObject) -> BucketResult<PutObjectOutput> {
        let mut builder = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type);

        for (name, value) in request.metadata {
            builder = builder.metadata(name, value);
        }

        let output = builder.send().await.map_err(remote_error)?;

        Ok(PutObjectOutput {
            etag: output.e_tag().map(str::to_string),
        })
    }

    async fn list_objects_page(&self, page: ListPage) -> BucketResult<ObjectPage> {
        let max_keys = i32::try_from(page.max_keys).unwrap_or(i32::MAX);
        let mut builder = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(max_keys);

        if let Some(prefix) = page.prefix {
            builder = builder.prefix(prefix);
        }
        if let Some(token) = page.continuation_token {
            builder = builder.continuation_token(token);
        }

        let output = builder.send().await.map_err(remote_error)?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?.to_string();
                Some(ListedObject {
                    key,
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        Ok(ObjectPage {
            objects,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_continuation_token: output.next_continuation_token().map(str::to_string),
        })
    }

    async fn delete_objects(&self, keys: &[String]) -> BucketResult<()> {
        let identifiers = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(remote_error)?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .quiet(true)
            .build()
            .map_err(remote_error)?;

        self.client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(remote_error)?;

        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> BucketResult<String> {
        let config = PresigningConfig::expires_in(expires_in).map_err(remote_error)?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(remote_error)?;

        Ok(presigned.uri().to_string())
    }
}
