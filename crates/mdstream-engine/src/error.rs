//! Driver errors, each tagged with the species being processed.

use mdstream_core::{DatasetPath, Shape};
use mdstream_store::StoreError;
use mdstream_transform::{ResolveError, TransformError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::memory::MemoryError;

/// Errors raised by an [`Experiment`](crate::Experiment).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A species named in a run is not part of the experiment.
    #[error("species '{species}' is not part of the experiment")]
    UnknownSpecies {
        /// The requested species.
        species: String,
    },
    /// A store operation failed.
    #[error("store error for species '{species}': {source}")]
    Store {
        /// Species being processed, empty for experiment-wide operations.
        species: String,
        /// The underlying error.
        #[source]
        source: StoreError,
    },
    /// Batch planning failed.
    #[error("batch planning failed for species '{species}': {source}")]
    Memory {
        /// Species being processed.
        species: String,
        /// The underlying error.
        #[source]
        source: MemoryError,
    },
    /// A missing input could not be produced.
    #[error("dependency resolution failed for species '{species}': {source}")]
    Resolve {
        /// Species being processed.
        species: String,
        /// The underlying error.
        #[source]
        source: ResolveError,
    },
    /// An input holds fewer configurations than the experiment and has no
    /// producer that could extend it.
    #[error(
        "input '{path}' for species '{species}' holds {populated} of {required} configurations"
    )]
    IncompleteInput {
        /// Species being processed.
        species: String,
        /// The short dataset.
        path: DatasetPath,
        /// Configurations written.
        populated: usize,
        /// Configurations the run needs.
        required: usize,
    },
    /// A transformation failed on a batch.
    #[error("transformation '{transformation}' failed for species '{species}': {source}")]
    Transform {
        /// Species being processed.
        species: String,
        /// Name of the failing transformation.
        transformation: String,
        /// The underlying error.
        #[source]
        source: TransformError,
    },
    /// A transformation returned an array of the wrong shape.
    #[error(
        "transformation '{transformation}' returned {actual} for species '{species}', expected {expected}"
    )]
    OutputShape {
        /// Species being processed.
        species: String,
        /// Name of the offending transformation.
        transformation: String,
        /// Shape required by the output dataset.
        expected: Shape,
        /// Shape returned.
        actual: Shape,
    },
    /// A batch plan cannot make progress.
    #[error("invalid batch plan for species '{species}': {detail}")]
    InvalidPlan {
        /// Species being processed.
        species: String,
        /// What was wrong with the plan.
        detail: String,
    },
}

impl EngineError {
    /// The species the error concerns, if any.
    pub fn species(&self) -> Option<&str> {
        match self {
            EngineError::Config(_) => None,
            EngineError::UnknownSpecies { species }
            | EngineError::Store { species, .. }
            | EngineError::Memory { species, .. }
            | EngineError::Resolve { species, .. }
            | EngineError::IncompleteInput { species, .. }
            | EngineError::Transform { species, .. }
            | EngineError::OutputShape { species, .. }
            | EngineError::InvalidPlan { species, .. } => {
                Some(species.as_str()).filter(|s| !s.is_empty())
            }
        }
    }

    pub(crate) fn store(species: &str) -> impl FnOnce(StoreError) -> Self + '_ {
        move |source| EngineError::Store {
            species: species.to_string(),
            source,
        }
    }

    pub(crate) fn memory(species: &str) -> impl FnOnce(MemoryError) -> Self + '_ {
        move |source| EngineError::Memory {
            species: species.to_string(),
            source,
        }
    }

    pub(crate) fn resolve(species: &str) -> impl FnOnce(ResolveError) -> Self + '_ {
        move |source| EngineError::Resolve {
            species: species.to_string(),
            source,
        }
    }
}
