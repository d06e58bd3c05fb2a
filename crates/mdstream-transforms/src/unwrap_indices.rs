//! Unwrapping with stored periodic image counts.

use mdstream_core::{names, Array3, PropertyInfo};
use mdstream_transform::{PropertyBatch, TransformContext, TransformError, Transformation};

/// `r_unwrapped = r + n * L`, with `n` read from `Box_Images`.
///
/// Stateless: every configuration is unwrapped independently.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnwrapViaIndices;

impl Transformation for UnwrapViaIndices {
    fn name(&self) -> &str {
        "unwrap_via_indices"
    }

    fn inputs(&self) -> Vec<String> {
        vec![names::POSITIONS.to_string(), names::BOX_IMAGES.to_string()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::UNWRAPPED_POSITIONS, 3)
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        let n = ctx.species.n_particles;
        let positions = batch.get_checked(names::POSITIONS, n, 3)?;
        let images = batch.get_checked(names::BOX_IMAGES, n, 3)?;
        let box_l = box_lengths(ctx)?;
        Ok(Array3::from_fn(positions.shape(), |p, c, d| {
            positions.get(p, c, d) + images.get(p, c, d) * box_l[d]
        }))
    }
}

pub(crate) fn box_lengths<'a>(ctx: &TransformContext<'a>) -> Result<&'a [f64], TransformError> {
    if ctx.box_l.len() < 3 {
        return Err(TransformError::MissingParameter {
            detail: format!(
                "unwrapping needs 3 box lengths, experiment has {}",
                ctx.box_l.len()
            ),
        });
    }
    Ok(ctx.box_l)
}
