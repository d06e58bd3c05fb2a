//! Property tests: unwrapping reproduces the true trajectory for any
//! batch split.

use indexmap::IndexMap;
use mdstream_core::{Array3, SpeciesInfo};
use mdstream_test_utils::synthetic::random_walk;
use mdstream_transform::{PropertyBatch, TransformContext, Transformation};
use mdstream_transforms::{UnwrapCoordinates, UnwrapViaIndices};
use proptest::prelude::*;

const BOX: [f64; 3] = [6.0, 7.0, 8.0];

fn run_in_batches(
    transform: &mut dyn Transformation,
    inputs: &[(&str, &Array3)],
    n_particles: usize,
    batch_size: usize,
) -> Array3 {
    let species = SpeciesInfo::new("Na", n_particles, []);
    let n = inputs[0].1.n_configurations();
    let ctx = TransformContext {
        species: &species,
        box_l: &BOX,
        n_configurations: n,
        offset: 0,
    };
    transform.begin_species(&ctx).unwrap();

    let mut out: Option<Array3> = None;
    let mut start = 0;
    while start < n {
        let size = batch_size.min(n - start);
        let mut data = IndexMap::new();
        for (name, values) in inputs {
            data.insert(name.to_string(), values.slice_configurations(start, size).unwrap());
        }
        let result = transform
            .transform_batch(&PropertyBatch::new(start, size, data), &ctx)
            .unwrap();
        match out.as_mut() {
            Some(acc) => acc.append_configurations(&result).unwrap(),
            None => out = Some(result),
        }
        start += size;
    }
    out.unwrap()
}

fn assert_close(actual: &Array3, expected: &Array3) -> Result<(), TestCaseError> {
    prop_assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.as_slice().iter().zip(expected.as_slice()) {
        prop_assert!((a - e).abs() < 1e-9, "{} != {}", a, e);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn coordinate_unwrapping_is_batch_independent(
        seed in 0u64..1_000,
        n_particles in 1usize..5,
        n_configurations in 2usize..80,
        batch_size in 1usize..40,
    ) {
        let (wrapped, unwrapped) = random_walk(seed, n_particles, n_configurations, BOX, 2.5);
        let out = run_in_batches(
            &mut UnwrapCoordinates::new(),
            &[("Positions", &wrapped)],
            n_particles,
            batch_size,
        );
        assert_close(&out, &unwrapped)?;
    }

    #[test]
    fn index_unwrapping_matches_true_positions(
        seed in 0u64..1_000,
        n_configurations in 1usize..60,
        batch_size in 1usize..30,
    ) {
        let (wrapped, unwrapped) = random_walk(seed, 3, n_configurations, BOX, 5.0);
        let images = Array3::from_fn(unwrapped.shape(), |p, c, d| {
            (unwrapped.get(p, c, d) / BOX[d]).floor()
        });
        let out = run_in_batches(
            &mut UnwrapViaIndices,
            &[("Positions", &wrapped), ("Box_Images", &images)],
            3,
            batch_size,
        );
        assert_close(&out, &unwrapped)?;
    }
}
