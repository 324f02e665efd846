//! Error types shared across the router.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn the mount table file into entries.
///
/// Any of these aborts a reload; the live route table is left untouched.
#[derive(Debug, Error)]
pub enum FstabError {
    /// The file could not be opened or read.
    #[error("failed to read mount table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not an object with an `Fstab` string-to-string map.
    #[error("failed to parse mount table {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A mount point that is not an absolute path.
    #[error("invalid mount point {mount_point:?} for {descriptor:?}: must start with '/'")]
    InvalidMountPoint {
        descriptor: String,
        mount_point: String,
    },
}

impl FstabError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FstabError::Io { .. } => "io_error",
            FstabError::Parse { .. } => "parse_error",
            FstabError::InvalidMountPoint { .. } => "invalid_mount_point",
        }
    }
}

/// Errors raised while bringing a [`crate::MountRouter`] up.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The file watcher could not be installed.
    #[error("failed to watch mount table: {0}")]
    Watch(#[from] notify::Error),
}
