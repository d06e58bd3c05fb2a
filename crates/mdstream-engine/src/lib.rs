//! Batched transformation driver for mdstream experiments.
//!
//! An [`Experiment`] ties a [`TrajectoryStore`](mdstream_store::TrajectoryStore)
//! to the species and configuration count it holds, and runs
//! [`Transformation`](mdstream_transform::Transformation)s over it in
//! memory-bounded batches.
//!
//! # Per-species state machine
//!
//! ```text
//! CheckOutput ──complete──▶ Skip
//!      │
//!      ▼
//! Resolve missing inputs (recursive, cycle-guarded)
//!      │
//!      ▼
//! Allocate (create, or grow by N − L)   offset = populated mark
//!      │
//!      ▼
//! Stream: MemoryManager → DataManager → Prefetcher → transform_batch → add_data
//!      │
//!      ▼
//! Finalize
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod memory;
pub mod prefetch;
pub mod report;

pub use config::{ConfigError, EngineConfig};
pub use data::{Batch, BatchArgs, Batches, DataManager};
pub use error::EngineError;
pub use experiment::Experiment;
pub use memory::{BatchPlan, FixedMemory, MemoryError, MemoryManager, MemorySource, SystemMemory};
pub use prefetch::Prefetcher;
pub use report::{RunReport, SpeciesOutcome, SpeciesStatus};
