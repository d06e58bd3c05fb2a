//! Heat flux from per-particle energies and stress.

use mdstream_core::{names, Array3, PropertyInfo, Shape, SpeciesInfo};
use mdstream_transform::{
    PropertyBatch, ScaleFunction, TransformContext, TransformError, Transformation,
};

use crate::momentum_flux::STRESS_COMPONENTS;
use crate::sum::stress_dot_velocity;

/// `J(t) = sum_i E_i(t) v_i(t) - sum_i S_i(t) . v_i(t) / p`
/// with `E_i = KE_i + PE_i` and `p` the pressure unit conversion.
///
/// Stress is per particle in Voigt order and is assumed to already carry
/// the particle volume, as LAMMPS `stress/atom` reports it.
#[derive(Clone, Copy, Debug)]
pub struct ThermalFlux {
    pressure_conversion: f64,
}

impl ThermalFlux {
    /// A flux with stress in the same units as energy times velocity.
    pub fn new() -> Self {
        Self {
            pressure_conversion: 1.0,
        }
    }

    /// Divide the stress term by `factor`.
    pub fn with_pressure_conversion(mut self, factor: f64) -> Self {
        self.pressure_conversion = factor;
        self
    }
}

impl Default for ThermalFlux {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformation for ThermalFlux {
    fn name(&self) -> &str {
        "thermal_flux"
    }

    fn inputs(&self) -> Vec<String> {
        vec![
            names::STRESS.to_string(),
            names::VELOCITIES.to_string(),
            names::KINETIC_ENERGY.to_string(),
            names::POTENTIAL_ENERGY.to_string(),
        ]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::THERMAL_FLUX, 3)
    }

    fn output_particles(&self, _species: &SpeciesInfo) -> usize {
        1
    }

    fn scale_function(&self) -> ScaleFunction {
        ScaleFunction::Linear { scale: 5.0 }
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        if self.pressure_conversion == 0.0 {
            return Err(TransformError::MissingParameter {
                detail: "pressure conversion factor must be non-zero".into(),
            });
        }
        let n = ctx.species.n_particles;
        let stress = batch.get_checked(names::STRESS, n, STRESS_COMPONENTS)?;
        let velocities = batch.get_checked(names::VELOCITIES, n, 3)?;
        let ke = batch.get_checked(names::KINETIC_ENERGY, n, 1)?;
        let pe = batch.get_checked(names::POTENTIAL_ENERGY, n, 1)?;
        let mut out = Array3::zeros(Shape::new(1, batch.size(), 3));
        for p in 0..n {
            for c in 0..batch.size() {
                let v = velocities.row(p, c);
                let energy = ke.get(p, c, 0) + pe.get(p, c, 0);
                let work = stress_dot_velocity(stress.row(p, c), v);
                for (d, acc) in out.row_mut(0, c).iter_mut().enumerate() {
                    *acc += energy * v[d] - work[d] / self.pressure_conversion;
                }
            }
        }
        Ok(out)
    }
}
