//! Maps a missing property to the transformation that produces it.
//!
//! Resolution is recursive: the produced transformation may itself have
//! missing inputs. [`ResolutionGuard`] tracks the properties currently
//! being produced so that a property that (transitively) requires itself
//! is reported instead of recursing forever.

use mdstream_core::{names, SpeciesInfo, TrajectoryAccess};

use crate::error::ResolveError;
use crate::kind::TransformKind;

/// Default limit on nested dependency resolution.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// The transformation that produces `dependency` for `species`.
///
/// `Unwrapped_Positions` has two producers: index-based unwrapping is
/// chosen when every species has a `Box_Images` dataset, coordinate-based
/// unwrapping otherwise.
pub fn resolve<A: TrajectoryAccess + ?Sized>(
    dependency: &str,
    access: &A,
    species: &[SpeciesInfo],
) -> Result<TransformKind, ResolveError> {
    let kind = match dependency {
        names::UNWRAPPED_POSITIONS => unwrap_choice(access, species),
        names::TRANSLATIONAL_DIPOLE_MOMENT => TransformKind::TranslationalDipoleMoment,
        names::IONIC_CURRENT => TransformKind::IonicCurrent,
        names::INTEGRATED_HEAT_CURRENT => TransformKind::IntegratedHeatCurrent,
        names::MOMENTUM_FLUX => TransformKind::MomentumFlux,
        names::THERMAL_FLUX => TransformKind::ThermalFlux,
        names::KINACI_HEAT_CURRENT => TransformKind::KinaciIntegratedHeatCurrent,
        _ => {
            return Err(ResolveError::Unresolved {
                name: dependency.to_string(),
            })
        }
    };
    tracing::debug!(dependency, %kind, "resolved dependency");
    Ok(kind)
}

fn unwrap_choice<A: TrajectoryAccess + ?Sized>(access: &A, species: &[SpeciesInfo]) -> TransformKind {
    let indices = species
        .iter()
        .all(|s| access.check_existence(&s.path(names::BOX_IMAGES)));
    if indices {
        TransformKind::UnwrapViaIndices
    } else {
        TransformKind::UnwrapCoordinates
    }
}

/// Stack of properties being produced, with cycle and depth checks.
#[derive(Clone, Debug)]
pub struct ResolutionGuard {
    stack: Vec<String>,
    max_depth: usize,
}

impl ResolutionGuard {
    /// An empty stack allowing `max_depth` nested entries.
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Push `property` before producing it.
    pub fn enter(&mut self, property: &str) -> Result<(), ResolveError> {
        if self.stack.iter().any(|p| p == property) {
            let mut chain = self.stack.clone();
            chain.push(property.to_string());
            return Err(ResolveError::Cyclic { chain });
        }
        if self.stack.len() >= self.max_depth {
            return Err(ResolveError::DepthExceeded {
                name: property.to_string(),
                max_depth: self.max_depth,
            });
        }
        self.stack.push(property.to_string());
        Ok(())
    }

    /// Pop the innermost property.
    pub fn exit(&mut self) {
        self.stack.pop();
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Properties on the stack, outermost first.
    pub fn stack(&self) -> &[String] {
        &self.stack
    }
}

impl Default for ResolutionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
