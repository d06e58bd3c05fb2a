//! Integrated heat current with the stress work term.

use mdstream_core::{names, Array3, PropertyInfo, Shape, SpeciesInfo};
use mdstream_transform::{
    PropertyBatch, ScaleFunction, TransformContext, TransformError, Transformation,
};

use crate::momentum_flux::STRESS_COMPONENTS;
use crate::sum::{stress_dot_velocity, weighted_particle_sum};

/// `R(t) = sum_i E_i(t) r_i(t) - sum_{s <= t} sum_i S_i(s) . v_i(s) dt`
/// over unwrapped positions, with `E_i = KE_i + PE_i`.
///
/// The work integral is a running sum that carries over between batches.
/// It is reset per species and, when a partial output is extended,
/// recovered from the last stored configuration.
#[derive(Clone, Debug)]
pub struct KinaciIntegratedHeatCurrent {
    time_step: f64,
    work: [f64; 3],
}

impl KinaciIntegratedHeatCurrent {
    /// Unit time step between stored configurations.
    pub fn new() -> Self {
        Self {
            time_step: 1.0,
            work: [0.0; 3],
        }
    }

    /// Time between consecutive stored configurations.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }
}

impl Default for KinaciIntegratedHeatCurrent {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformation for KinaciIntegratedHeatCurrent {
    fn name(&self) -> &str {
        "kinaci_integrated_heat_current"
    }

    fn inputs(&self) -> Vec<String> {
        vec![
            names::UNWRAPPED_POSITIONS.to_string(),
            names::VELOCITIES.to_string(),
            names::STRESS.to_string(),
            names::KINETIC_ENERGY.to_string(),
            names::POTENTIAL_ENERGY.to_string(),
        ]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::KINACI_HEAT_CURRENT, 3)
    }

    fn output_particles(&self, _species: &SpeciesInfo) -> usize {
        1
    }

    fn scale_function(&self) -> ScaleFunction {
        ScaleFunction::Linear { scale: 6.0 }
    }

    fn begin_species(&mut self, _ctx: &TransformContext<'_>) -> Result<(), TransformError> {
        self.work = [0.0; 3];
        Ok(())
    }

    fn resume_inputs(&self) -> Vec<String> {
        vec![
            names::UNWRAPPED_POSITIONS.to_string(),
            names::KINETIC_ENERGY.to_string(),
            names::POTENTIAL_ENERGY.to_string(),
            names::KINACI_HEAT_CURRENT.to_string(),
        ]
    }

    fn resume(
        &mut self,
        previous: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        let n = ctx.species.n_particles;
        let positions = previous.get_checked(names::UNWRAPPED_POSITIONS, n, 3)?;
        let ke = previous.get_checked(names::KINETIC_ENERGY, n, 1)?;
        let pe = previous.get_checked(names::POTENTIAL_ENERGY, n, 1)?;
        let stored = previous.get_checked(names::KINACI_HEAT_CURRENT, 1, 3)?;
        let convective = weighted_particle_sum(positions, |p, c| {
            ke.get(p, c, 0) + pe.get(p, c, 0)
        });
        for (d, w) in self.work.iter_mut().enumerate() {
            *w = convective.get(0, 0, d) - stored.get(0, 0, d);
        }
        Ok(())
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        let n = ctx.species.n_particles;
        let positions = batch.get_checked(names::UNWRAPPED_POSITIONS, n, 3)?;
        let velocities = batch.get_checked(names::VELOCITIES, n, 3)?;
        let stress = batch.get_checked(names::STRESS, n, STRESS_COMPONENTS)?;
        let ke = batch.get_checked(names::KINETIC_ENERGY, n, 1)?;
        let pe = batch.get_checked(names::POTENTIAL_ENERGY, n, 1)?;
        let mut out = weighted_particle_sum(positions, |p, c| {
            ke.get(p, c, 0) + pe.get(p, c, 0)
        });
        let mut step = Array3::zeros(Shape::new(1, batch.size(), 3));
        for p in 0..n {
            for c in 0..batch.size() {
                let work = stress_dot_velocity(stress.row(p, c), velocities.row(p, c));
                for (acc, w) in step.row_mut(0, c).iter_mut().zip(work) {
                    *acc += w;
                }
            }
        }
        for c in 0..batch.size() {
            for d in 0..3 {
                self.work[d] += step.get(0, c, d) * self.time_step;
                out.set(0, c, d, out.get(0, c, d) - self.work[d]);
            }
        }
        Ok(out)
    }
}
