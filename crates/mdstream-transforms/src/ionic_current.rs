//! Charge-weighted velocity sum.

use mdstream_core::{names, Array3, PropertyInfo, SpeciesInfo};
use mdstream_transform::{PropertyBatch, TransformContext, TransformError, Transformation};

use crate::sum::weighted_particle_sum;

/// `J(t) = q * sum_i v_i(t)` for one species.
///
/// Writes a single-row `Ionic_Current` dataset.
#[derive(Clone, Copy, Debug, Default)]
pub struct IonicCurrent;

impl Transformation for IonicCurrent {
    fn name(&self) -> &str {
        "ionic_current"
    }

    fn inputs(&self) -> Vec<String> {
        vec![names::VELOCITIES.to_string()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::IONIC_CURRENT, 3)
    }

    fn output_particles(&self, _species: &SpeciesInfo) -> usize {
        1
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        let velocities = batch.get_checked(names::VELOCITIES, ctx.species.n_particles, 3)?;
        let charge = ctx.species.charge;
        Ok(weighted_particle_sum(velocities, |_, _| charge))
    }
}
