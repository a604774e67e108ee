//! Storage transport used by the transfer client.
//!
//! [`ObjectStore`] is the small slice of the S3 API the client needs: a bucket
//! check, bucket creation, and whole-file upload/download. [`S3Store`] is the
//! `aws-sdk-s3` implementation; tests swap in their own.

mod s3;

pub use s3::S3Store;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Failure reported by a storage transport, classified just enough for the
/// bucket ensurer to tell "missing" from "forbidden"
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Other(anyhow::Error),
}

/// Remote object storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Probe bucket metadata; `Ok` means the bucket exists and is reachable
    async fn head_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Create a bucket in the given region
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StorageError>;

    /// Upload a local file to `key`, replacing any existing object
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError>;

    /// Download the object at `key` into a local file, truncating it first
    async fn get_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), StorageError>;
}
