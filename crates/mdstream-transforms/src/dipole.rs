//! Charge-weighted position sum.

use mdstream_core::{names, Array3, PropertyInfo, SpeciesInfo};
use mdstream_transform::{PropertyBatch, TransformContext, TransformError, Transformation};

use crate::sum::weighted_particle_sum;

/// `M(t) = q * sum_i r_i(t)` over unwrapped positions.
///
/// Depends on `Unwrapped_Positions`, which is produced on demand when the
/// store does not hold it yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct TranslationalDipoleMoment;

impl Transformation for TranslationalDipoleMoment {
    fn name(&self) -> &str {
        "translational_dipole_moment"
    }

    fn inputs(&self) -> Vec<String> {
        vec![names::UNWRAPPED_POSITIONS.to_string()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::TRANSLATIONAL_DIPOLE_MOMENT, 3)
    }

    fn output_particles(&self, _species: &SpeciesInfo) -> usize {
        1
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        let positions =
            batch.get_checked(names::UNWRAPPED_POSITIONS, ctx.species.n_particles, 3)?;
        let charge = ctx.species.charge;
        Ok(weighted_particle_sum(positions, |_, _| charge))
    }
}
