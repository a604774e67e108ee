//! Folder to S3 archive transfers.
//!
//! An upload zips a local directory into a temporary file and puts it at
//! `<prefix>/<folder>.zip`; a download fetches a zip object into a temporary
//! file and unpacks it into a local directory. The temporary archive is a
//! [`NamedTempFile`], so it is removed when the operation returns, whether it
//! succeeded or not.

use humansize::{DECIMAL, format_size};
use log::{debug, info};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::archive::{self, ArchiveError};
use crate::config::{TransferConfig, create_s3_client};
use crate::error::{Result, TransferError};
use crate::storage::{ObjectStore, S3Store, StorageError};

/// Bucket name and the region it lives (or will be created) in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRef {
    pub name: String,
    pub region: String,
}

impl BucketRef {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        BucketRef {
            name: name.into(),
            region: region.into(),
        }
    }
}

/// Uploads folders as zip archives and downloads them back
pub struct ArchiveTransferClient {
    bucket: BucketRef,
    store: Arc<dyn ObjectStore>,
    temp_dir: Option<PathBuf>,
}

impl ArchiveTransferClient {
    /// Create a client for `bucket` backed by S3.
    ///
    /// Only the SDK configuration is loaded here; the bucket itself is not
    /// contacted until the first transfer.
    pub async fn new(bucket: impl Into<String>, config: &TransferConfig) -> Result<Self> {
        let name = bucket.into();
        if name.trim().is_empty() {
            return Err(TransferError::InvalidArgument(
                "bucket name must not be empty".to_string(),
            ));
        }

        let (client, region) = create_s3_client(config).await;
        let store = Arc::new(S3Store::new(client));
        let client = Self::with_store(BucketRef::new(name, region), store);

        Ok(match &config.temp_dir {
            Some(dir) => client.with_temp_dir(dir),
            None => client,
        })
    }

    /// Create a client over any storage transport
    pub fn with_store(bucket: BucketRef, store: Arc<dyn ObjectStore>) -> Self {
        ArchiveTransferClient {
            bucket,
            store,
            temp_dir: None,
        }
    }

    /// Create temporary archives in `dir` instead of the OS temp dir
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket.name
    }

    pub fn region(&self) -> &str {
        &self.bucket.region
    }

    /// Zip `local_path` and upload it to `<remote_prefix>/<folder name>.zip`,
    /// replacing whatever object is already there.
    ///
    /// Returns the key the archive was written to.
    pub async fn upload_folder(
        &self,
        local_path: impl AsRef<Path>,
        remote_prefix: &str,
    ) -> Result<String> {
        let local_path = local_path.as_ref();
        let folder_name = source_folder_name(local_path)?;

        self.ensure_bucket().await?;

        let temp = self.temp_archive()?;
        let (temp, entries) = build_archive(local_path.to_path_buf(), temp).await?;
        let key = object_key(&folder_name, remote_prefix);

        let size = temp.as_file().metadata().map(|m| m.len()).unwrap_or(0);
        debug!(
            "Uploading {} to {} with key {} ({} files, {})",
            local_path.display(),
            self.bucket.name,
            key,
            entries,
            format_size(size, DECIMAL)
        );

        self.store
            .put_file(&self.bucket.name, &key, temp.path())
            .await?;

        Ok(key)
    }

    /// Download the zip object at `remote_key` and extract it into
    /// `local_path`, creating the directory and its parents if needed.
    pub async fn download_folder(
        &self,
        remote_key: &str,
        local_path: impl AsRef<Path>,
    ) -> Result<()> {
        let local_path = local_path.as_ref();
        let temp = self.temp_archive()?;

        debug!(
            "Downloading {} from {} into {}",
            remote_key,
            self.bucket.name,
            local_path.display()
        );

        self.store
            .get_to_file(&self.bucket.name, remote_key, temp.path())
            .await?;

        tokio::fs::create_dir_all(local_path)
            .await
            .map_err(ArchiveError::Io)?;

        let entries = unpack_archive(temp, local_path.to_path_buf()).await?;
        debug!("Extracted {} files into {}", entries, local_path.display());

        Ok(())
    }

    /// Make sure the bucket exists, creating it in the client's region when
    /// `head_bucket` reports it missing.
    ///
    /// Probe and create are separate requests; a bucket created by someone
    /// else in between is left to S3's own create semantics.
    pub async fn ensure_bucket(&self) -> Result<()> {
        let bucket = &self.bucket.name;

        match self.store.head_bucket(bucket).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => {
                info!("Bucket {} not found, creating it in {}", bucket, self.bucket.region);
                self.store
                    .create_bucket(bucket, &self.bucket.region)
                    .await
                    .map_err(|source| TransferError::StorageProvisioning {
                        bucket: bucket.clone(),
                        source,
                    })
            }
            Err(StorageError::Forbidden(_)) => Err(TransferError::PermissionDenied {
                bucket: bucket.clone(),
            }),
            Err(StorageError::Other(source)) => Err(TransferError::Transport(source)),
        }
    }

    fn temp_archive(&self) -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("bucketzip-").suffix(".zip");

        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };

        Ok(file.map_err(ArchiveError::Io)?)
    }
}

/// Object key for a folder upload: `<prefix>/<folder_name>.zip` with the
/// prefix's leading and trailing slashes removed.
pub fn object_key(folder_name: &str, prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{folder_name}.zip")
    } else {
        format!("{prefix}/{folder_name}.zip")
    }
}

/// Check the upload source and return the name its archive is keyed by
fn source_folder_name(path: &Path) -> Result<String> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            TransferError::NotFound(format!("local path {}", path.display()))
        }
        _ => TransferError::Archive(ArchiveError::Io(e)),
    })?;

    if !metadata.is_dir() {
        return Err(TransferError::InvalidArgument(format!(
            "local path is not a directory: {}",
            path.display()
        )));
    }

    // "." and "dir/.." have no file name of their own
    let resolved = std::fs::canonicalize(path).map_err(ArchiveError::Io)?;
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            TransferError::InvalidArgument(format!(
                "cannot name an archive after {}",
                resolved.display()
            ))
        })
}

async fn build_archive(src: PathBuf, temp: NamedTempFile) -> Result<(NamedTempFile, usize)> {
    let joined = tokio::task::spawn_blocking(move || {
        // The temp dir may live under `src`; keep the archive out of itself
        let src = std::fs::canonicalize(&src)?;
        let own_path = std::fs::canonicalize(temp.path())?;
        let entries = archive::write_dir_zip(&src, temp.as_file(), Some(&own_path))?;
        Ok::<_, ArchiveError>((temp, entries))
    })
    .await
    .map_err(|e| ArchiveError::Io(std::io::Error::other(e)))?;

    Ok(joined?)
}

async fn unpack_archive(temp: NamedTempFile, dest: PathBuf) -> Result<usize> {
    let joined = tokio::task::spawn_blocking(move || {
        let reader = BufReader::new(temp.reopen()?);
        archive::extract_zip(reader, &dest)
    })
    .await
    .map_err(|e| ArchiveError::Io(std::io::Error::other(e)))?;

    Ok(joined?)
}
