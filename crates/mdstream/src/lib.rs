//! mdstream: a batched, memory-bounded transformation engine for
//! molecular dynamics trajectories.
//!
//! This is the facade crate that re-exports the public API of every
//! sub-crate. Adding `mdstream` as a single dependency is enough for most
//! users.
//!
//! # Quick start
//!
//! ```rust
//! use mdstream::prelude::*;
//!
//! // Two sodium ions moving with constant velocity.
//! let metadata = TrajectoryMetadata {
//!     n_configurations: 100,
//!     species_list: vec![SpeciesInfo::new("Na", 2, [PropertyInfo::new("Velocities", 3)])],
//!     box_l: vec![10.0, 10.0, 10.0],
//! };
//! let store = TrajectoryStore::in_memory();
//! let path = DatasetPath::new("Na", "Velocities");
//! store.add_dataset(metadata.dataset_shapes()).unwrap();
//! store
//!     .write_array(&path, &Array3::from_fn(Shape::new(2, 100, 3), |_, _, d| d as f64), 0)
//!     .unwrap();
//!
//! let config = EngineConfig {
//!     memory_limit_bytes: Some(1 << 20),
//!     ..EngineConfig::default()
//! };
//! let mut experiment = Experiment::new(store, default_registry(), config)
//!     .unwrap()
//!     .with_metadata(&metadata);
//! experiment.set_charge("Na", 1.0).unwrap();
//!
//! let report = experiment
//!     .perform_transformation(TransformKind::IonicCurrent, None)
//!     .unwrap();
//! assert_eq!(report.configurations_written(), 100);
//!
//! let current = experiment
//!     .store()
//!     .read_range(&DatasetPath::new("Na", "Ionic_Current"), 99, 1)
//!     .unwrap();
//! assert_eq!(current.as_slice(), &[0.0, 2.0, 4.0]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `mdstream-core` | Paths, shapes, arrays, chunks, species metadata, reader traits |
//! | [`store`] | `mdstream-store` | Growable on-disk and in-memory trajectory store |
//! | [`transform`] | `mdstream-transform` | Transformation trait, registry, dependency resolver |
//! | [`transforms`] | `mdstream-transforms` | Built-in transformations |
//! | [`engine`] | `mdstream-engine` | Memory manager, batch stream, prefetch, driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core value types and traits (`mdstream-core`).
pub use mdstream_core as types;

/// Trajectory storage (`mdstream-store`).
///
/// [`store::TrajectoryStore`] is the main entry point; backends implement
/// [`store::StorageBackend`].
pub use mdstream_store as store;

/// Transformation trait and dependency resolution (`mdstream-transform`).
pub use mdstream_transform as transform;

/// Built-in transformations (`mdstream-transforms`).
pub use mdstream_transforms as transforms;

/// Batch planning and the transformation driver (`mdstream-engine`).
pub use mdstream_engine as engine;

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber printing to stderr.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Calling this
/// more than once, or after another subscriber was installed, is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Common imports for typical mdstream usage.
///
/// ```rust
/// use mdstream::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use mdstream_core::{
        Array3, DatasetPath, PropertyInfo, Shape, SpeciesInfo, TrajectoryAccess,
        TrajectoryChunkData, TrajectoryMetadata, TrajectoryReader,
    };

    // Storage
    pub use mdstream_store::{StoreConfig, StoreError, TrajectoryStore};

    // Transformations
    pub use mdstream_transform::{
        BatchAxes, PropertyBatch, ResolveError, ScaleFunction, TransformContext, TransformError,
        TransformKind, Transformation,
    };
    pub use mdstream_transforms::default_registry;

    // Engine
    pub use mdstream_engine::{EngineConfig, EngineError, Experiment, RunReport};
}
