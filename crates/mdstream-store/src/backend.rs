//! The storage seam between [`TrajectoryStore`](crate::TrajectoryStore)
//! and where bytes actually live.
//!
//! Backends deal in configuration-major `f64` buffers and plain
//! [`io::Result`]s. Validation, retry, and error classification happen in
//! the store, so a backend only has to move data.

use std::io;

use mdstream_core::{DatasetPath, Shape};

/// Allocation and fill state of one dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetInfo {
    /// Allocated shape.
    pub shape: Shape,
    /// High-water mark of contiguously written configurations.
    pub populated: usize,
}

/// Persistent home for growable `[n_particles, n_configurations, n_dims]`
/// datasets.
///
/// All methods take `&self`: backends are shared between the driver and
/// the prefetch worker, and synchronise internally.
pub trait StorageBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Allocation state of a dataset, or `None` if it does not exist.
    fn info(&self, path: &DatasetPath) -> io::Result<Option<DatasetInfo>>;

    /// Create a zero-filled dataset. Fails with
    /// [`io::ErrorKind::AlreadyExists`] if one is present.
    fn create(&self, path: &DatasetPath, shape: Shape) -> io::Result<()>;

    /// Grow the configuration axis to `n_configurations`, zero-filling the
    /// new tail and preserving existing contents.
    fn grow(&self, path: &DatasetPath, n_configurations: usize) -> io::Result<()>;

    /// Read configurations `[start, start + len)` in configuration-major
    /// order.
    fn read_configurations(&self, path: &DatasetPath, start: usize, len: usize)
        -> io::Result<Vec<f64>>;

    /// Overwrite configurations starting at `start` with configuration-major
    /// `values`.
    fn write_configurations(&self, path: &DatasetPath, start: usize, values: &[f64])
        -> io::Result<()>;

    /// Record a new populated high-water mark.
    fn set_populated(&self, path: &DatasetPath, populated: usize) -> io::Result<()>;

    /// Every dataset currently held, in a stable order.
    fn list(&self) -> io::Result<Vec<DatasetPath>>;
}
