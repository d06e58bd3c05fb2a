//! Unwrapping by detecting box crossings.

use mdstream_core::{names, Array3, PropertyInfo};
use mdstream_transform::{
    PropertyBatch, ScaleFunction, TransformContext, TransformError, Transformation,
};
use smallvec::SmallVec;

use crate::unwrap_indices::box_lengths;

/// Unwraps positions by tracking jumps larger than half a box length
/// between consecutive configurations.
///
/// The last wrapped position and the accumulated image shift of every
/// particle carry over between batches, so results do not depend on the
/// batch size. State is reset per species, and restored from the last
/// stored configuration when a partial output is extended.
#[derive(Clone, Debug, Default)]
pub struct UnwrapCoordinates {
    last: Vec<f64>,
    shift: Vec<f64>,
    primed: bool,
}

impl UnwrapCoordinates {
    /// A transformation with no carried state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformation for UnwrapCoordinates {
    fn name(&self) -> &str {
        "unwrap_coordinates"
    }

    fn inputs(&self) -> Vec<String> {
        vec![names::POSITIONS.to_string()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(names::UNWRAPPED_POSITIONS, 3)
    }

    fn scale_function(&self) -> ScaleFunction {
        ScaleFunction::Linear { scale: 2.0 }
    }

    fn begin_species(&mut self, ctx: &TransformContext<'_>) -> Result<(), TransformError> {
        let len = ctx.species.n_particles * 3;
        self.last = vec![0.0; len];
        self.shift = vec![0.0; len];
        self.primed = false;
        Ok(())
    }

    fn resume_inputs(&self) -> Vec<String> {
        vec![
            names::POSITIONS.to_string(),
            names::UNWRAPPED_POSITIONS.to_string(),
        ]
    }

    fn resume(
        &mut self,
        previous: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        let n = ctx.species.n_particles;
        if self.last.len() != n * 3 {
            return Err(TransformError::ExecutionFailed {
                reason: "begin_species was not called for this species".into(),
            });
        }
        let wrapped = previous.get_checked(names::POSITIONS, n, 3)?;
        let unwrapped = previous.get_checked(names::UNWRAPPED_POSITIONS, n, 3)?;
        let box_l = box_lengths(ctx)?;
        for p in 0..n {
            for d in 0..3 {
                let i = p * 3 + d;
                let w = wrapped.get(p, 0, d);
                // Whole images only; the stored difference carries rounding.
                let images = ((unwrapped.get(p, 0, d) - w) / box_l[d]).round();
                self.last[i] = w;
                self.shift[i] = images * box_l[d];
            }
        }
        self.primed = true;
        Ok(())
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        let n = ctx.species.n_particles;
        let positions = batch.get_checked(names::POSITIONS, n, 3)?;
        if self.last.len() != n * 3 {
            return Err(TransformError::ExecutionFailed {
                reason: "begin_species was not called for this species".into(),
            });
        }
        let box_l: SmallVec<[f64; 3]> = box_lengths(ctx)?.iter().take(3).copied().collect();
        let mut out = Array3::zeros(positions.shape());
        for c in 0..batch.size() {
            for p in 0..n {
                let wrapped = positions.row(p, c);
                let unwrapped = out.row_mut(p, c);
                for d in 0..3 {
                    let i = p * 3 + d;
                    if self.primed || c > 0 {
                        let delta = wrapped[d] - self.last[i];
                        if delta > box_l[d] / 2.0 {
                            self.shift[i] -= box_l[d];
                        } else if delta < -box_l[d] / 2.0 {
                            self.shift[i] += box_l[d];
                        }
                    }
                    self.last[i] = wrapped[d];
                    unwrapped[d] = wrapped[d] + self.shift[i];
                }
            }
        }
        if batch.size() > 0 {
            self.primed = true;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use mdstream_core::{Shape, SpeciesInfo};

    fn run(t: &mut UnwrapCoordinates, species: &SpeciesInfo, start: usize, x: &[f64]) -> Vec<f64> {
        let ctx = TransformContext {
            species,
            box_l: &[10.0, 10.0, 10.0],
            n_configurations: 8,
            offset: 0,
        };
        let values: Vec<f64> = x.iter().flat_map(|&v| [v, 5.0, 5.0]).collect();
        let mut data = IndexMap::new();
        data.insert(
            "Positions".to_string(),
            Array3::from_vec(Shape::new(1, x.len(), 3), values).unwrap(),
        );
        let out = t
            .transform_batch(&PropertyBatch::new(start, x.len(), data), &ctx)
            .unwrap();
        (0..x.len()).map(|c| out.get(0, c, 0)).collect()
    }

    #[test]
    fn crossing_forward_and_back() {
        let species = SpeciesInfo::new("Na", 1, []);
        let mut t = UnwrapCoordinates::new();
        let ctx = TransformContext {
            species: &species,
            box_l: &[10.0, 10.0, 10.0],
            n_configurations: 4,
            offset: 0,
        };
        t.begin_species(&ctx).unwrap();
        assert_eq!(run(&mut t, &species, 0, &[9.0, 1.0, 9.5, 8.0]), vec![9.0, 11.0, 9.5, 8.0]);
    }

    #[test]
    fn state_carries_across_batches() {
        let species = SpeciesInfo::new("Na", 1, []);
        let ctx = TransformContext {
            species: &species,
            box_l: &[10.0, 10.0, 10.0],
            n_configurations: 4,
            offset: 0,
        };
        let mut t = UnwrapCoordinates::new();
        t.begin_species(&ctx).unwrap();
        let mut got = run(&mut t, &species, 0, &[8.0, 9.5]);
        got.extend(run(&mut t, &species, 2, &[0.5, 2.0]));
        assert_eq!(got, vec![8.0, 9.5, 10.5, 12.0]);

        t.begin_species(&ctx).unwrap();
        assert_eq!(run(&mut t, &species, 0, &[0.5]), vec![0.5]);
    }

    #[test]
    fn resume_continues_like_an_uninterrupted_run() {
        let species = SpeciesInfo::new("Na", 1, []);
        let ctx = TransformContext {
            species: &species,
            box_l: &[10.0, 10.0, 10.0],
            n_configurations: 6,
            offset: 0,
        };
        let x = [8.0, 9.5, 0.5, 2.0, 9.0, 1.0];
        let mut fresh = UnwrapCoordinates::new();
        fresh.begin_species(&ctx).unwrap();
        let expected = run(&mut fresh, &species, 0, &x);
        assert_eq!(expected, vec![8.0, 9.5, 10.5, 12.0, 9.0, 11.0]);

        let resumed_ctx = TransformContext { offset: 4, ..ctx };
        let mut previous = IndexMap::new();
        previous.insert(
            "Positions".to_string(),
            Array3::from_vec(Shape::new(1, 1, 3), vec![2.0, 5.0, 5.0]).unwrap(),
        );
        previous.insert(
            "Unwrapped_Positions".to_string(),
            Array3::from_vec(Shape::new(1, 1, 3), vec![12.0, 5.0, 5.0]).unwrap(),
        );
        let mut resumed = UnwrapCoordinates::new();
        resumed.begin_species(&resumed_ctx).unwrap();
        resumed
            .resume(&PropertyBatch::new(3, 1, previous), &resumed_ctx)
            .unwrap();
        assert_eq!(run(&mut resumed, &species, 4, &x[4..]), expected[4..].to_vec());
    }

    #[test]
    fn requires_begin_species() {
        let species = SpeciesInfo::new("Na", 2, []);
        let ctx = TransformContext {
            species: &species,
            box_l: &[10.0, 10.0, 10.0],
            n_configurations: 1,
            offset: 0,
        };
        let mut data = IndexMap::new();
        data.insert("Positions".to_string(), Array3::zeros(Shape::new(2, 1, 3)));
        assert!(matches!(
            UnwrapCoordinates::new().transform_batch(&PropertyBatch::new(0, 1, data), &ctx),
            Err(TransformError::ExecutionFailed { .. })
        ));
    }
}
