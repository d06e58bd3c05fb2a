//! Traits at the seams to file readers and downstream calculators.

use crate::array::Array3;
use crate::chunk::TrajectoryChunkData;
use crate::error::ReaderError;
use crate::id::{DatasetPath, Shape};
use crate::property::TrajectoryMetadata;

/// Read-only query contract over a trajectory store.
///
/// This is what calculators (diffusion coefficients, RDFs, ...) see.
/// It decouples them from the storage backend.
pub trait TrajectoryAccess {
    /// Error raised by lookups and reads.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether a dataset exists at `path`.
    fn check_existence(&self, path: &DatasetPath) -> bool;

    /// Allocated shape of the dataset at `path`.
    fn get_data_size(&self, path: &DatasetPath) -> Result<Shape, Self::Error>;

    /// Configurations `[start, start + len)` of one dataset, shaped
    /// `[n_particles, len, n_dims]`.
    fn read_range(&self, path: &DatasetPath, start: usize, len: usize)
        -> Result<Array3, Self::Error>;
}

/// A decoder that turns a raw trajectory source into configuration chunks.
///
/// Readers produce their [`TrajectoryMetadata`] once, then a lazy
/// sequence of chunks covering `0..n_configurations` in order. Readers
/// never call back into the store.
pub trait TrajectoryReader {
    /// Shape of the whole trajectory.
    fn metadata(&self) -> &TrajectoryMetadata;

    /// The chunks, in configuration order. Iterated once.
    fn chunks(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<TrajectoryChunkData, ReaderError>> + '_>;
}
