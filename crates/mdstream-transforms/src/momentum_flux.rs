//! Off-diagonal stress sum.

use mdstream_core::{names, Array3, PropertyInfo, Shape, SpeciesInfo};
use mdstream_transform::{PropertyBatch, TransformContext, TransformError, Transformation};

/// Per-particle stress components in Voigt order:
/// `xx, yy, zz, xy, xz, yz`.
pub const STRESS_COMPONENTS: usize = 6;

/// `P(t) = sum_i (s_xy, s_xz, s_yz)_i(t)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MomentumFlux;

impl Transformation for MomentumFlux {
    fn name(&self) -> &str {
        "momentum_flux"
    }

    fn inputs(&self) -> Vec<String> {
        vec![names::STRESS.to_string()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::MOMENTUM_FLUX, 3)
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
        let stress = batch.get_checked(names::STRESS, n, STRESS_COMPONENTS)?;
        let mut out = Array3::zeros(Shape::new(1, batch.size(), 3));
        for p in 0..n {
            for c in 0..batch.size() {
                let row = stress.row(p, c);
                for (acc, v) in out.row_mut(0, c).iter_mut().zip(&row[3..]) {
                    *acc += v;
                }
            }
        }
        Ok(out)
    }
}
