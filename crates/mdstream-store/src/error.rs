//! Error types for the trajectory store.

use std::io;

use mdstream_core::{ArrayError, ChunkError, DatasetPath, PathError, ReaderError, Shape};
use thiserror::Error;

/// Errors raised by [`TrajectoryStore`](crate::TrajectoryStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A dataset already exists where a new one was requested.
    #[error("dataset '{path}' already exists")]
    AlreadyExists {
        /// The conflicting path.
        path: DatasetPath,
    },
    /// The dataset does not exist.
    #[error("dataset '{path}' not found")]
    NotFound {
        /// The missing path.
        path: DatasetPath,
    },
    /// The fixed axes of a request disagree with the stored dataset.
    #[error("dataset '{path}' has shape {stored}, incompatible with {requested}")]
    ShapeMismatch {
        /// The dataset.
        path: DatasetPath,
        /// Allocated shape on disk.
        stored: Shape,
        /// Shape carried by the request.
        requested: Shape,
    },
    /// A read or write reached past the allocated configurations.
    #[error("dataset '{path}': configurations {start}..{end} exceed allocated length {allocated}")]
    OutOfBounds {
        /// The dataset.
        path: DatasetPath,
        /// Requested start (inclusive).
        start: usize,
        /// Requested end (exclusive).
        end: usize,
        /// Allocated configuration count.
        allocated: usize,
    },
    /// A transient lock error persisted after every retry.
    #[error("dataset '{path}' stayed locked after {attempts} attempts: {source}")]
    TransientIo {
        /// The dataset.
        path: DatasetPath,
        /// Total attempts made, including the first.
        attempts: u32,
        /// The last error observed.
        #[source]
        source: io::Error,
    },
    /// Any other I/O failure.
    #[error("I/O error on '{context}': {source}")]
    Io {
        /// Dataset path or directory involved.
        context: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// A dataset file exists but cannot be interpreted.
    #[error("dataset '{path}' is corrupt: {detail}")]
    Corrupt {
        /// The dataset.
        path: DatasetPath,
        /// What was wrong with it.
        detail: String,
    },
    /// A path component cannot be mapped onto the backend.
    #[error("invalid dataset path: {0}")]
    InvalidPath(#[from] PathError),
    /// Array data could not be converted for storage.
    #[error("array error: {0}")]
    Array(#[from] ArrayError),
    /// A chunk could not be assembled.
    #[error("chunk error: {0}")]
    Chunk(#[from] ChunkError),
    /// A trajectory reader failed during ingestion.
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),
}

impl StoreError {
    /// Wrap an I/O error with the dataset it concerns.
    pub(crate) fn io(path: &DatasetPath, source: io::Error) -> Self {
        Self::Io {
            context: path.to_string(),
            source,
        }
    }
}
