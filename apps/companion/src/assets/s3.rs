use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;

use super::blob::{BlobMeta, BlobStore, DEFAULT_CONTENT_TYPE};
use crate::storage::StoreError;

const STORED_AT_METADATA: &str = "stored-at";

/// Audio cache backed by an S3-compatible bucket (AWS or MinIO).
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3BlobStore {
    pub fn new(client: S3Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn s3_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::S3(e.to_string())
}

fn from_smithy(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, meta: &BlobMeta, bytes: Bytes) -> Result<(), StoreError> {
        let object_key = self.object_key(&meta.key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .content_type(&meta.content_type)
            .metadata(STORED_AT_METADATA, meta.stored_at.to_rfc3339())
            .send()
            .await
            .map_err(s3_error)?;

        info!("Uploaded audio to s3://{}/{}", self.bucket, object_key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<(BlobMeta, Bytes)>, StoreError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(s3_error(service_error));
            }
        };

        let content_type = output
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let stored_at = output
            .metadata()
            .and_then(|m| m.get(STORED_AT_METADATA))
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|v| v.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let bytes = output
            .body
            .collect()
            .await
            .map_err(s3_error)?
            .into_bytes();

        let meta = BlobMeta {
            key: key.to_string(),
            content_type,
            size_bytes: bytes.len() as u64,
            stored_at,
        };
        Ok(Some((meta, bytes)))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .send()
            .await
            .map_err(s3_error)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobMeta>, StoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&self.prefix)
            .into_paginator()
            .send();

        let mut metas = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(s3_error)?;
            for object in page.contents() {
                let Some(key) = object
                    .key()
                    .and_then(|k| k.strip_prefix(self.prefix.as_str()))
                else {
                    continue;
                };
                metas.push(BlobMeta {
                    key: key.to_string(),
                    content_type: DEFAULT_CONTENT_TYPE.to_string(),
                    size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    stored_at: object
                        .last_modified()
                        .and_then(from_smithy)
                        .unwrap_or_else(Utc::now),
                });
            }
        }
        Ok(metas)
    }
}
