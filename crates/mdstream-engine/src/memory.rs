//! Memory-bounded batch planning.
//!
//! The batch size is the number of configurations whose scaled input
//! footprint fits in `memory_fraction` of the available memory:
//!
//! ```text
//! per_config   = Σ_paths n_particles × n_dims × 8
//! batch_size   = floor(fraction × available / scale(per_config))
//! total        = n_configurations − offset
//! n_batches, remainder = divmod(total, batch_size)
//! ```

use std::fmt;

use mdstream_core::DatasetPath;
use mdstream_store::{StoreError, TrajectoryStore};
use mdstream_transform::{BatchAxes, ScaleFunction};
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use thiserror::Error;

// ── Sources ─────────────────────────────────────────────────────────

/// Source of the available-memory figure.
pub trait MemorySource: Send + Sync {
    /// Bytes currently available for batches.
    fn available_bytes(&self) -> u64;
}

/// Queries the operating system on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemMemory;

impl MemorySource for SystemMemory {
    fn available_bytes(&self) -> u64 {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );
        system.available_memory()
    }
}

/// A fixed byte count, from configuration or tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedMemory(pub u64);

impl MemorySource for FixedMemory {
    fn available_bytes(&self) -> u64 {
        self.0
    }
}

// ── BatchPlan ──────────────────────────────────────────────────────

/// How a configuration range is split into batches.
///
/// Full batches cover `[offset + i × batch_size, offset + (i + 1) × batch_size)`
/// for `i < n_batches`; a final batch of `remainder` configurations follows
/// when `remainder > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    /// Configurations per full batch. Always at least 1.
    pub batch_size: usize,
    /// Number of full batches.
    pub n_batches: usize,
    /// Configurations in the trailing partial batch.
    pub remainder: usize,
    /// First configuration to process.
    pub offset: usize,
}

impl BatchPlan {
    /// Configurations the plan covers.
    pub fn total(&self) -> usize {
        self.n_batches * self.batch_size + self.remainder
    }

    /// Batches including the trailing partial one.
    pub fn batch_count(&self) -> usize {
        self.n_batches + usize::from(self.remainder > 0)
    }

    /// `(start, len)` of every batch, in order.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let full = (0..self.n_batches).map(|i| (self.offset + i * self.batch_size, self.batch_size));
        let tail = (self.remainder > 0)
            .then(|| (self.offset + self.n_batches * self.batch_size, self.remainder));
        full.chain(tail)
    }
}

impl fmt::Display for BatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} + {} from {}",
            self.n_batches, self.batch_size, self.remainder, self.offset
        )
    }
}

// ── MemoryError ────────────────────────────────────────────────────

/// Batch planning failures.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Not even the smallest permitted batch fits in the budget.
    #[error("insufficient memory: need {required} bytes, budget is {budget} bytes")]
    Insufficient {
        /// Bytes needed by the smallest permitted batch.
        required: u64,
        /// Bytes available for a batch.
        budget: u64,
    },
    /// The resume offset lies past the end of the data.
    #[error("offset {offset} is beyond the {n_configurations} available configurations")]
    OffsetBeyondEnd {
        /// Requested offset.
        offset: usize,
        /// Configurations available.
        n_configurations: usize,
    },
    /// An input shape could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ── MemoryManager ──────────────────────────────────────────────────

/// Computes batch plans against a memory budget.
pub struct MemoryManager<'a> {
    source: &'a dyn MemorySource,
    memory_fraction: f64,
}

impl<'a> MemoryManager<'a> {
    /// A manager allowing `memory_fraction` of what `source` reports.
    pub fn new(source: &'a dyn MemorySource, memory_fraction: f64) -> Self {
        Self {
            source,
            memory_fraction,
        }
    }

    /// Bytes a batch may use.
    pub fn budget(&self) -> u64 {
        (self.source.available_bytes() as f64 * self.memory_fraction).floor() as u64
    }

    /// Plan batches over `data_paths` for configurations
    /// `[offset, n_configurations)`.
    pub fn get_batch_size(
        &self,
        store: &TrajectoryStore,
        data_paths: &[DatasetPath],
        n_configurations: usize,
        offset: usize,
        scale_function: &ScaleFunction,
        axes: BatchAxes,
    ) -> Result<BatchPlan, MemoryError> {
        let mut per_config = 0usize;
        for path in data_paths {
            per_config += store.get_data_size(path)?.bytes_per_configuration();
        }
        let plan = self.plan(per_config, n_configurations, offset, scale_function, axes)?;
        tracing::debug!(
            paths = data_paths.len(),
            per_config,
            budget = self.budget(),
            %plan,
            "planned batches"
        );
        Ok(plan)
    }

    /// Plan from a precomputed per-configuration cost in bytes.
    pub fn plan(
        &self,
        per_config_bytes: usize,
        n_configurations: usize,
        offset: usize,
        scale_function: &ScaleFunction,
        axes: BatchAxes,
    ) -> Result<BatchPlan, MemoryError> {
        if offset > n_configurations {
            return Err(MemoryError::OffsetBeyondEnd {
                offset,
                n_configurations,
            });
        }
        let total = n_configurations - offset;
        let budget = self.budget();
        let scaled = scale_function.apply(per_config_bytes as f64);
        let fitting = if scaled > 0.0 {
            // Float-to-int casts saturate; NaN becomes 0.
            (budget as f64 / scaled).floor() as usize
        } else {
            usize::MAX
        };
        if fitting < 1 {
            return Err(MemoryError::Insufficient {
                required: scaled.ceil() as u64,
                budget,
            });
        }
        let batch_size = if axes.configurations {
            fitting.min(total).max(1)
        } else {
            if total > fitting {
                return Err(MemoryError::Insufficient {
                    required: (scaled * total as f64).ceil() as u64,
                    budget,
                });
            }
            total.max(1)
        };
        Ok(BatchPlan {
            batch_size,
            n_batches: total / batch_size,
            remainder: total % batch_size,
            offset,
        })
    }
}
