use thiserror::Error;

use crate::archive::ArchiveError;
use crate::storage::StorageError;

/// Errors surfaced by [`ArchiveTransferClient`](crate::transfer::ArchiveTransferClient)
#[derive(Debug, Error)]
pub enum TransferError {
    /// Local input path or remote object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Local input path exists but cannot be used as given
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `head_bucket` was answered with 403
    #[error("no permission to access bucket {bucket}")]
    PermissionDenied { bucket: String },

    /// The bucket was missing and creating it failed
    #[error("failed to create bucket {bucket}")]
    StorageProvisioning {
        bucket: String,
        #[source]
        source: StorageError,
    },

    /// Any other failure reported by the storage transport
    #[error("storage transport error: {0:#}")]
    Transport(anyhow::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

pub type Result<T> = std::result::Result<T, TransferError>;

impl From<StorageError> for TransferError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => TransferError::NotFound(what),
            StorageError::Forbidden(what) => {
                TransferError::Transport(anyhow::anyhow!("access denied: {what}"))
            }
            StorageError::Other(source) => TransferError::Transport(source),
        }
    }
}
