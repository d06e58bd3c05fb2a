//! Test utilities and mock types for mdstream development.
//!
//! - [`MockTrajectoryReader`] serves in-memory arrays through the
//!   [`TrajectoryReader`] contract.
//! - [`InstrumentedBackend`] counts backend calls and injects transient
//!   lock failures.
//! - [`fixtures`] holds small transformations for driver tests.
//! - [`synthetic`] builds deterministic trajectories.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod synthetic;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use mdstream_core::{
    Array3, DatasetPath, ReaderError, Shape, TrajectoryChunkData, TrajectoryMetadata,
    TrajectoryReader,
};
use mdstream_store::{DatasetInfo, MemoryBackend, StorageBackend};

/// Serves whole-trajectory arrays as fixed-size chunks.
///
/// Pre-populate with [`set_data`](MockTrajectoryReader::set_data); paths
/// without data are delivered as zeros.
pub struct MockTrajectoryReader {
    metadata: TrajectoryMetadata,
    chunk_size: usize,
    data: IndexMap<DatasetPath, Array3>,
    fail_at_chunk: Option<usize>,
}

impl MockTrajectoryReader {
    pub fn new(metadata: TrajectoryMetadata, chunk_size: usize) -> Self {
        Self {
            metadata,
            chunk_size: chunk_size.max(1),
            data: IndexMap::new(),
            fail_at_chunk: None,
        }
    }

    /// Full-trajectory values for one dataset, shaped
    /// `[n_particles, n_configurations, n_dims]`.
    pub fn set_data(&mut self, path: DatasetPath, values: Array3) -> &mut Self {
        self.data.insert(path, values);
        self
    }

    /// Return a reader error instead of chunk `index`.
    pub fn fail_at_chunk(&mut self, index: usize) -> &mut Self {
        self.fail_at_chunk = Some(index);
        self
    }

    fn chunk(&self, index: usize, start: usize, len: usize) -> Result<TrajectoryChunkData, ReaderError> {
        if self.fail_at_chunk == Some(index) {
            return Err(ReaderError::Malformed {
                detail: format!("injected failure at chunk {index}"),
            });
        }
        let mut chunk = TrajectoryChunkData::new(len, self.metadata.species_list.clone());
        for (path, values) in &self.data {
            let window = values
                .slice_configurations(start, len)
                .map_err(|e| ReaderError::Malformed {
                    detail: e.to_string(),
                })?;
            chunk.add_data(&window, 0, path.species(), path.property())?;
        }
        Ok(chunk)
    }
}

impl TrajectoryReader for MockTrajectoryReader {
    fn metadata(&self) -> &TrajectoryMetadata {
        &self.metadata
    }

    fn chunks(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<TrajectoryChunkData, ReaderError>> + '_> {
        let total = self.metadata.n_configurations;
        let size = self.chunk_size;
        Box::new((0..total.div_ceil(size)).map(move |i| {
            let start = i * size;
            self.chunk(i, start, size.min(total - start))
        }))
    }
}

/// Wraps a backend, counting calls and failing writes on demand.
///
/// Failures are `WouldBlock` errors, which the store classifies as
/// transient lock errors.
pub struct InstrumentedBackend {
    inner: Arc<dyn StorageBackend>,
    writes: AtomicUsize,
    creates: AtomicUsize,
    grows: AtomicUsize,
    pending_failures: AtomicUsize,
    failed_writes: AtomicUsize,
}

impl InstrumentedBackend {
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            grows: AtomicUsize::new(0),
            pending_failures: AtomicUsize::new(0),
            failed_writes: AtomicUsize::new(0),
        }
    }

    /// Wrap a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Fail the next `n` data writes with a transient lock error.
    pub fn fail_next_writes(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Successful data writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Data writes rejected by injection.
    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    /// Datasets created.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Datasets grown.
    pub fn grows(&self) -> usize {
        self.grows.load(Ordering::SeqCst)
    }

    /// Reset every counter.
    pub fn reset_counters(&self) {
        for counter in [&self.writes, &self.creates, &self.grows, &self.failed_writes] {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl StorageBackend for InstrumentedBackend {
    fn name(&self) -> &str {
        "instrumented"
    }

    fn info(&self, path: &DatasetPath) -> io::Result<Option<DatasetInfo>> {
        self.inner.info(path)
    }

    fn create(&self, path: &DatasetPath, shape: Shape) -> io::Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(path, shape)
    }

    fn grow(&self, path: &DatasetPath, n_configurations: usize) -> io::Result<()> {
        self.grows.fetch_add(1, Ordering::SeqCst);
        self.inner.grow(path, n_configurations)
    }

    fn read_configurations(
        &self,
        path: &DatasetPath,
        start: usize,
        len: usize,
    ) -> io::Result<Vec<f64>> {
        self.inner.read_configurations(path, start, len)
    }

    fn write_configurations(
        &self,
        path: &DatasetPath,
        start: usize,
        values: &[f64],
    ) -> io::Result<()> {
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "injected lock"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_configurations(path, start, values)
    }

    fn set_populated(&self, path: &DatasetPath, populated: usize) -> io::Result<()> {
        self.inner.set_populated(path, populated)
    }

    fn list(&self) -> io::Result<Vec<DatasetPath>> {
        self.inner.list()
    }
}
