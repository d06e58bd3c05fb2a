//! Core types and traits for the mdstream trajectory engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the value types shared across the workspace: dataset paths and
//! shapes, species and property descriptors, the particle-major
//! [`Array3`] buffer, the [`TrajectoryChunkData`] hand-off buffer, and
//! the traits at the seams to file readers and downstream calculators.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod chunk;
pub mod error;
pub mod id;
pub mod names;
pub mod property;
pub mod traits;

pub use array::Array3;
pub use chunk::TrajectoryChunkData;
pub use error::{ArrayError, ChunkError, PathError, ReaderError};
pub use id::{DatasetPath, Shape};
pub use property::{PropertyInfo, PropertyList, SpeciesInfo, TrajectoryMetadata};
pub use traits::{TrajectoryAccess, TrajectoryReader};

/// Size in bytes of one stored value. All datasets hold `f64`.
pub const DTYPE_SIZE: usize = std::mem::size_of::<f64>();
