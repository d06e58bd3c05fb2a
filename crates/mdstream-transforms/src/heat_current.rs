//! Energy-weighted position sum.

use mdstream_core::{names, Array3, PropertyInfo, SpeciesInfo};
use mdstream_transform::{PropertyBatch, TransformContext, TransformError, Transformation};

use crate::sum::weighted_particle_sum;

/// `H(t) = sum_i (KE_i(t) + PE_i(t)) * r_i(t)` over unwrapped positions.
///
/// The time derivative of this quantity is the heat current used in
/// Green-Kubo thermal conductivity.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntegratedHeatCurrent;

impl Transformation for IntegratedHeatCurrent {
    fn name(&self) -> &str {
        "integrated_heat_current"
    }

    fn inputs(&self) -> Vec<String> {
        vec![
            names::UNWRAPPED_POSITIONS.to_string(),
            names::KINETIC_ENERGY.to_string(),
            names::POTENTIAL_ENERGY.to_string(),
        ]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::INTEGRATED_HEAT_CURRENT, 3)
    }

    fn output_particles(&self, _species: &SpeciesInfo) -> usize {
        1
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        let n = ctx.species.n_particles;
        let positions = batch.get_checked(names::UNWRAPPED_POSITIONS, n, 3)?;
        let ke = batch.get_checked(names::KINETIC_ENERGY, n, 1)?;
        let pe = batch.get_checked(names::POTENTIAL_ENERGY, n, 1)?;
        Ok(weighted_particle_sum(positions, |p, c| {
            ke.get(p, c, 0) + pe.get(p, c, 0)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use mdstream_core::Shape;

    #[test]
    fn weights_positions_by_total_energy() {
        let species = SpeciesInfo::new("Ar", 2, []);
        let ctx = TransformContext {
            species: &species,
            box_l: &[],
            n_configurations: 1,
            offset: 0,
        };
        let mut data = IndexMap::new();
        data.insert(
            "Unwrapped_Positions".to_string(),
            Array3::from_vec(Shape::new(2, 1, 3), vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0]).unwrap(),
        );
        data.insert(
            "KE".to_string(),
            Array3::from_vec(Shape::new(2, 1, 1), vec![1.0, 0.5]).unwrap(),
        );
        data.insert(
            "PE".to_string(),
            Array3::from_vec(Shape::new(2, 1, 1), vec![2.0, 0.5]).unwrap(),
        );
        let out = IntegratedHeatCurrent
            .transform_batch(&PropertyBatch::new(0, 1, data), &ctx)
            .unwrap();
        assert_eq!(out.as_slice(), &[3.0, 2.0, 0.0]);
    }

    #[test]
    fn missing_energy_is_reported() {
        let species = SpeciesInfo::new("Ar", 1, []);
        let ctx = TransformContext {
            species: &species,
            box_l: &[],
            n_configurations: 1,
            offset: 0,
        };
        let mut data = IndexMap::new();
        data.insert(
            "Unwrapped_Positions".to_string(),
            Array3::zeros(Shape::new(1, 1, 3)),
        );
        let err = IntegratedHeatCurrent
            .transform_batch(&PropertyBatch::new(0, 1, data), &ctx)
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::MissingInput {
                property: "KE".into()
            }
        );
    }
}
