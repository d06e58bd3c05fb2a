//! Errors raised by transformations and dependency resolution.

use mdstream_core::Shape;
use thiserror::Error;

use crate::kind::TransformKind;

/// A transformation failed on a batch.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TransformError {
    /// An input property was not present in the batch.
    #[error("input property '{property}' missing from batch")]
    MissingInput {
        /// The property that was looked up.
        property: String,
    },
    /// An input or output array had the wrong shape.
    #[error("shape mismatch for '{property}': expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Property concerned.
        property: String,
        /// Required shape.
        expected: Shape,
        /// Shape found.
        actual: Shape,
    },
    /// The transformation needs data the experiment does not provide.
    #[error("missing parameter: {detail}")]
    MissingParameter {
        /// What was missing.
        detail: String,
    },
    /// Any other failure during execution.
    #[error("execution failed: {reason}")]
    ExecutionFailed {
        /// Human-readable cause.
        reason: String,
    },
}

/// A missing input could not be produced.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No transformation is known to produce the property.
    #[error("no transformation produces '{name}'")]
    Unresolved {
        /// The unresolvable property name.
        name: String,
    },
    /// The kind is known but has no registered constructor.
    #[error("transformation {kind} is not registered")]
    Unregistered {
        /// The kind that could not be built.
        kind: TransformKind,
    },
    /// Resolving the property would re-enter a transformation already
    /// on the resolution stack.
    #[error("cyclic dependency: {}", chain.join(" -> "))]
    Cyclic {
        /// Transformations on the stack, outermost first, ending with
        /// the repeated one.
        chain: Vec<String>,
    },
    /// The resolution stack grew past the configured limit.
    #[error("dependency resolution deeper than {max_depth} levels at '{name}'")]
    DepthExceeded {
        /// Transformation that would have exceeded the limit.
        name: String,
        /// The configured limit.
        max_depth: usize,
    },
}
