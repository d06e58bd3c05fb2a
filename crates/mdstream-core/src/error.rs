//! Error types for the core value types.
//!
//! Each error is scoped to the type that raises it: path parsing,
//! array shape arithmetic, chunk assembly, and trajectory readers.

use thiserror::Error;

use crate::id::Shape;

/// A string could not be parsed as a `"<species>/<property>"` path.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathError {
    /// The string did not contain exactly one `/` separator.
    #[error("dataset path '{path}' must have the form '<species>/<property>'")]
    Malformed {
        /// The rejected input.
        path: String,
    },
    /// The species or property component was empty.
    #[error("dataset path '{path}' has an empty component")]
    EmptyComponent {
        /// The rejected input.
        path: String,
    },
}

/// Errors from [`Array3`](crate::Array3) construction and slicing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArrayError {
    /// The backing buffer length does not match the declared shape.
    #[error("buffer of {len} values does not match shape {shape}")]
    LengthMismatch {
        /// The declared shape.
        shape: Shape,
        /// The buffer length supplied.
        len: usize,
    },
    /// Two arrays could not be combined because their fixed axes differ.
    #[error("incompatible shapes {left} and {right}")]
    IncompatibleShapes {
        /// Shape of the receiving array.
        left: Shape,
        /// Shape of the other array.
        right: Shape,
    },
    /// A configuration range fell outside the array.
    #[error("configuration range {start}..{end} out of bounds for {n_configurations} configurations")]
    RangeOutOfBounds {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Number of configurations in the array.
        n_configurations: usize,
    },
}

/// Errors from [`TrajectoryChunkData::add_data`](crate::TrajectoryChunkData::add_data).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// The species is not part of the chunk layout.
    #[error("species '{species}' is not part of this chunk")]
    UnknownSpecies {
        /// The requested species.
        species: String,
    },
    /// The property is not recorded for the species.
    #[error("property '{property}' is not recorded for species '{species}'")]
    UnknownProperty {
        /// The species that was found.
        species: String,
        /// The missing property.
        property: String,
    },
    /// The inserted values do not match the slot they were written to.
    #[error("cannot insert {inserted} at configuration {config_idx} into chunk slot {slot}")]
    DoesNotFit {
        /// Shape of the values being inserted.
        inserted: Shape,
        /// Shape of the chunk slot.
        slot: Shape,
        /// Requested configuration offset within the chunk.
        config_idx: usize,
    },
}

/// Errors surfaced by [`TrajectoryReader`](crate::TrajectoryReader) implementations.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The underlying source could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The source was read but its contents could not be interpreted.
    #[error("malformed trajectory data: {detail}")]
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A chunk could not be assembled from the decoded values.
    #[error("chunk assembly failed: {0}")]
    Chunk(#[from] ChunkError),
}
