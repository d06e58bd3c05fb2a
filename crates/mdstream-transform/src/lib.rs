//! Transformation trait, registry, and dependency resolver.
//!
//! A [`Transformation`] derives one new per-species property from existing
//! ones, batch by batch. Transformations are stateful across the batches
//! of one species (cumulative quantities, image counters) and are reset
//! with [`Transformation::begin_species`].
//!
//! Missing inputs are resolved through a static table mapping a property
//! name to the [`TransformKind`] that produces it; the [`Registry`] turns a
//! kind into a runnable instance.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod kind;
pub mod registry;
pub mod resolver;
pub mod scale;
pub mod transformation;

pub use error::{ResolveError, TransformError};
pub use kind::TransformKind;
pub use registry::{Constructor, Registry};
pub use resolver::{resolve, ResolutionGuard, DEFAULT_MAX_DEPTH};
pub use scale::ScaleFunction;
pub use transformation::{BatchAxes, PropertyBatch, TransformContext, Transformation};
