//! Zip a local folder into an S3 bucket and unzip it back.
//!
//! ```no_run
//! # async fn demo() -> bucketzip::Result<()> {
//! use bucketzip::{ArchiveTransferClient, TransferConfig};
//!
//! let client = ArchiveTransferClient::new("my-backups", &TransferConfig::default()).await?;
//! let key = client.upload_folder("notes", "daily/").await?;
//! client.download_folder(&key, "restored/notes").await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod storage;
pub mod transfer;

pub use config::TransferConfig;
pub use error::{Result, TransferError};
pub use transfer::{ArchiveTransferClient, BucketRef, object_key};
