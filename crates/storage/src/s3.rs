//! S3 object store
//!
//! Provides async S3-compatible storage with:
//! - Static credentials and custom endpoint from [`StoreConfig`]
//! - Multipart uploads for large objects
//! - Exponential backoff retry logic

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Credentials, Region},
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use bytes::Bytes;
use store_core::{Error, Result, RetryConfig, StoreConfig};
use tracing::{debug, instrument, warn};

use crate::backend::{ListPage, ObjectStore};

/// Threshold for switching to multipart upload (5 MB)
const MULTIPART_THRESHOLD: usize = 5 * 1024 * 1024;

/// Part size for multipart uploads (5 MB minimum required by S3)
const MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// Name reported to the credentials chain
const CREDENTIALS_PROVIDER: &str = "filehandler-static";

/// Delay before retry number `attempt` (zero based)
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}

/// S3-compatible object store
///
/// Supports Amazon S3 and S3-compatible services like MinIO or Ceph.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    retry: RetryConfig,
}

impl S3Store {
    /// Build a client for the endpoint and credentials in `config`
    pub async fn connect(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = S3ConfigBuilder::from(&aws_config)
            .endpoint_url(config.endpoint_url())
            .force_path_style(config.force_path_style)
            .build();

        debug!(endpoint = %config.endpoint_url(), "Created S3 client");

        Self {
            client: Client::from_conf(s3_config),
            retry: config.retry.clone(),
        }
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }

                    let delay = backoff_delay(self.retry.base_delay, attempt);
                    warn!(
                        %operation,
                        attempt = attempt + 1,
                        max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Storage {
            message: format!("{} failed after {} retries", operation, max_retries),
        }))
    }

    /// Perform multipart upload for large objects
    async fn multipart_upload(&self, bucket: &str, key: &str, data: Bytes) -> Result<u64> {
        let size = data.len() as u64;

        let create_result = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to initiate multipart upload: {}", e),
            })?;

        let upload_id = create_result.upload_id().ok_or_else(|| Error::Storage {
            message: "No upload_id returned".to_string(),
        })?;

        debug!(bucket, key, upload_id, size, "Started multipart upload");

        let mut completed_parts = Vec::new();
        let mut offset = 0;
        let mut part_number = 1;

        while offset < data.len() {
            let end = std::cmp::min(offset + MULTIPART_PART_SIZE, data.len());
            let part_data = data.slice(offset..end);

            let upload_part_result = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(part_data))
                .send()
                .await
                .map_err(|e| {
                    self.abort_multipart_upload(bucket, key, upload_id);
                    Error::Storage {
                        message: format!("Failed to upload part {}: {}", part_number, e),
                    }
                })?;

            let etag = upload_part_result.e_tag().map(String::from);
            completed_parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(etag)
                    .build(),
            );

            debug!(part_number, offset, end, "Uploaded part");
            offset = end;
            part_number += 1;
        }

        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to complete multipart upload: {}", e),
            })?;

        debug!(bucket, key, size, "Completed multipart upload");
        Ok(size)
    }

    /// Abort a multipart upload (best effort, for cleanup)
    fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();
        let upload_id = upload_id.to_string();

        tokio::spawn(async move {
            let _ = client
                .abort_multipart_upload()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .send()
                .await;
        });
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        debug!(bucket, key, "Reading from S3");

        self.with_retry("get", || async {
            let result = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| match e.as_service_error() {
                    Some(err) if err.is_no_such_key() => Error::StoragePathNotFound {
                        path: format!("{}/{}", bucket, key),
                    },
                    _ => Error::Storage {
                        message: format!("S3 get_object failed: {}", e),
                    },
                })?;

            let bytes = result.body.collect().await.map_err(|e| Error::Storage {
                message: format!("Failed to read S3 response body: {}", e),
            })?;

            Ok(bytes.into_bytes())
        })
        .await
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<u64> {
        let size = data.len();
        debug!(bucket, key, size, "Writing to S3");

        if size > MULTIPART_THRESHOLD {
            return self.multipart_upload(bucket, key, data).await;
        }

        self.with_retry("put", || {
            let data = data.clone();
            async move {
                self.client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(data))
                    .send()
                    .await
                    .map_err(|e| Error::Storage {
                        message: format!("S3 put_object failed: {}", e),
                    })?;

                Ok(size as u64)
            }
        })
        .await
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        debug!(bucket, key, "Deleting from S3");

        self.with_retry("delete", || async {
            self.client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| Error::Storage {
                    message: format!("S3 delete_object failed: {}", e),
                })?;

            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        debug!(bucket, key, "Checking existence in S3");

        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => match e.as_service_error() {
                Some(err) if err.is_not_found() => Ok(false),
                _ => Err(Error::Storage {
                    message: format!("S3 head_object failed: {}", e),
                }),
            },
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListPage> {
        debug!(bucket, prefix, "Listing S3 objects");

        let response = self
            .with_retry("list", || {
                let continuation = continuation.clone();
                async move {
                    self.client
                        .list_objects_v2()
                        .bucket(bucket)
                        .prefix(prefix)
                        .set_continuation_token(continuation)
                        .send()
                        .await
                        .map_err(|e| Error::Storage {
                            message: format!("S3 list_objects failed: {}", e),
                        })
                }
            })
            .await?;

        let keys: Vec<String> = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(String::from))
            .collect();

        let next = if response.is_truncated() == Some(true) {
            response.next_continuation_token().map(String::from)
        } else {
            None
        };

        debug!(count = keys.len(), more = next.is_some(), "Fetched S3 listing page");
        Ok(ListPage { keys, next })
    }
}
