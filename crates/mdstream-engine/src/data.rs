//! Lazy, ordered batch stream over stored datasets.

use indexmap::IndexMap;
use mdstream_core::{Array3, DatasetPath};
use mdstream_store::{StoreError, TrajectoryStore};

use crate::memory::BatchPlan;

/// One batch of input data.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    /// Arrays shaped `[n_particles, size, n_dims]`, keyed by path.
    pub data: IndexMap<DatasetPath, Array3>,
    /// First configuration covered.
    pub start: usize,
    /// Configurations covered.
    pub size: usize,
}

/// The arguments a batch stream was created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchArgs {
    /// Datasets read into every batch.
    pub data_paths: Vec<DatasetPath>,
    /// Configurations per full batch.
    pub batch_size: usize,
    /// Number of full batches.
    pub n_batches: usize,
    /// Configurations in the trailing partial batch.
    pub remainder: usize,
    /// First configuration read.
    pub offset: usize,
}

/// Produces the batches of a [`BatchPlan`].
#[derive(Clone, Debug)]
pub struct DataManager {
    store: TrajectoryStore,
    data_paths: Vec<DatasetPath>,
    plan: BatchPlan,
}

impl DataManager {
    /// A manager reading `data_paths` from `store` according to `plan`.
    pub fn new(store: TrajectoryStore, data_paths: Vec<DatasetPath>, plan: BatchPlan) -> Self {
        Self {
            store,
            data_paths,
            plan,
        }
    }

    /// The plan being followed.
    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    /// A fresh stream over every batch of the plan.
    pub fn batches(&self) -> Batches {
        Batches {
            store: self.store.clone(),
            data_paths: self.data_paths.clone(),
            ranges: self.plan.ranges().collect::<Vec<_>>().into_iter(),
            failed: false,
        }
    }

    /// The stream together with the arguments it was built from.
    pub fn batch_generator(&self) -> (Batches, BatchArgs) {
        let args = BatchArgs {
            data_paths: self.data_paths.clone(),
            batch_size: self.plan.batch_size,
            n_batches: self.plan.n_batches,
            remainder: self.plan.remainder,
            offset: self.plan.offset,
        };
        (self.batches(), args)
    }
}

/// Iterator of batches; ends after the last batch or the first error.
///
/// Owns a store handle, so it can be moved to a prefetch worker.
#[derive(Debug)]
pub struct Batches {
    store: TrajectoryStore,
    data_paths: Vec<DatasetPath>,
    ranges: std::vec::IntoIter<(usize, usize)>,
    failed: bool,
}

impl Iterator for Batches {
    type Item = Result<Batch, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (start, size) = self.ranges.next()?;
        match self.store.read(&self.data_paths, start, size) {
            Ok(data) => Some(Ok(Batch { data, start, size })),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.ranges.len()))
        }
    }
}
