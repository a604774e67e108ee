use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::{ObjectStore, StorageError};

/// S3 rejects an explicit location constraint for its default region
const DEFAULT_S3_REGION: &str = "us-east-1";

/// [`ObjectStore`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        S3Store { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify(e, format!("s3://{bucket}")))?;

        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError> {
        let mut req = self.client.create_bucket().bucket(bucket);

        if region != DEFAULT_S3_REGION {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        req.send()
            .await
            .map_err(|e| classify(e, format!("s3://{bucket}")))?;

        Ok(())
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to open {} for upload", path.display()))
            .map_err(StorageError::Other)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/zip")
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, format!("s3://{bucket}/{key}")))?;

        Ok(())
    }

    async fn get_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, format!("s3://{bucket}/{key}")))?;

        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))
            .map_err(StorageError::Other)?;

        let mut body = resp.body;
        while let Some(chunk) = body
            .try_next()
            .await
            .with_context(|| format!("Failed to read object body s3://{bucket}/{key}"))
            .map_err(StorageError::Other)?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))
                .map_err(StorageError::Other)?;
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
            .map_err(StorageError::Other)?;

        Ok(())
    }
}

/// Sort an SDK failure into not-found, forbidden, or anything else.
///
/// HEAD responses carry no body, so the HTTP status is checked before the
/// modeled error code.
fn classify<E>(err: SdkError<E, HttpResponse>, target: String) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(String::from);

    match (status, code.as_deref()) {
        (Some(404), _) | (_, Some("NotFound" | "NoSuchBucket" | "NoSuchKey")) => {
            StorageError::NotFound(target)
        }
        (Some(403), _) | (_, Some("AccessDenied" | "Forbidden")) => {
            StorageError::Forbidden(target)
        }
        _ => StorageError::Other(
            anyhow::Error::new(err).context(format!("Request to {target} failed")),
        ),
    }
}
