pub mod zip;

pub use self::zip::{extract_zip, write_dir_zip};

use std::path::PathBuf;
use thiserror::Error;

/// Failures while building or unpacking a folder archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid zip archive: {0}")]
    Zip(#[from] ::zip::result::ZipError),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Entry name is absolute or climbs out of the extraction root
    #[error("refusing to extract unsafe entry {0:?}")]
    UnsafeEntry(String),
}
