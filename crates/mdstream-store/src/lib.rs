//! Chunked, growable on-disk trajectory store.
//!
//! The store holds one dataset per `(species, property)` pair, addressed
//! by [`DatasetPath`](mdstream_core::DatasetPath) and shaped
//! `[n_particles, n_configurations, n_dims]`. Only the configuration axis
//! may grow, which lets transformations extend partial results instead of
//! recomputing them.
//!
//! # Architecture
//!
//! ```text
//! TrajectoryStore (cloneable handle, Send + Sync)
//! ├── Arc<dyn StorageBackend>
//! │   ├── FileBackend   zarr V3 arrays at <root>/<species>/<property>/
//! │   └── MemoryBackend in-process, same model
//! ├── RetryPolicy       one retry on transient lock errors
//! └── ingest()          TrajectoryReader → allocate → append chunks
//! ```
//!
//! The populated mark is the high-water mark of contiguously written
//! configurations; it is what distinguishes an allocated-but-unwritten
//! tail from real data.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod file;
pub mod ingest;
pub mod memory;
pub mod retry;
pub mod store;

pub use backend::{DatasetInfo, StorageBackend};
pub use config::StoreConfig;
pub use error::StoreError;
pub use file::FileBackend;
pub use ingest::IngestReport;
pub use memory::MemoryBackend;
pub use retry::{is_transient_lock_error, RetryPolicy};
pub use store::TrajectoryStore;

