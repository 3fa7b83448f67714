//! Cache error types

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by the avatar cache.
///
/// `NotFound` and `Expired` are ordinary miss signals; everything else is a
/// filesystem or format problem.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache entry not found: {0}")]
    NotFound(String),

    #[error("cache entry expired: {0}")]
    Expired(String),

    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("cache I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt cache metadata at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize cache entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to delete cache files: {}", .0.join("; "))]
    Delete(Vec<String>),

    #[error("sweep task failed: {0}")]
    Task(String),
}

impl CacheError {
    /// True for the two miss signals.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
        move |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
