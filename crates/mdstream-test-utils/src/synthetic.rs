//! Deterministic synthetic trajectories.
//!
//! All generators take an explicit seed and use ChaCha8, so the same
//! seed always yields the same trajectory on every platform.

use mdstream_core::{Array3, PropertyInfo, Shape, SpeciesInfo, TrajectoryMetadata};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn uniform(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Values `f(p, c, d) = p * 1000 + c + d / 10`, easy to recognise in
/// assertions.
pub fn ramp(shape: Shape) -> Array3 {
    Array3::from_fn(shape, |p, c, d| (p * 1000 + c) as f64 + d as f64 / 10.0)
}

/// Uniform values in `[-1, 1)`.
pub fn noise(seed: u64, shape: Shape) -> Array3 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut values = Vec::with_capacity(shape.len());
    for _ in 0..shape.len() {
        values.push(uniform(&mut rng) * 2.0 - 1.0);
    }
    Array3::from_fn(shape, |p, c, d| {
        values[(p * shape.n_configurations + c) * shape.n_dims + d]
    })
}

/// Random walk of `n_particles` in a periodic box, returned as
/// `(wrapped, unwrapped)` positions of shape `[n_particles, n_configurations, 3]`.
///
/// Steps are bounded by `max_step`, which must be below half the smallest
/// box length for wrapped positions to be unambiguous.
pub fn random_walk(
    seed: u64,
    n_particles: usize,
    n_configurations: usize,
    box_l: [f64; 3],
    max_step: f64,
) -> (Array3, Array3) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let shape = Shape::new(n_particles, n_configurations, 3);
    let mut unwrapped = Array3::zeros(shape);
    for p in 0..n_particles {
        let mut r = [0.0; 3];
        for (d, x) in r.iter_mut().enumerate() {
            *x = uniform(&mut rng) * box_l[d];
        }
        for c in 0..n_configurations {
            if c > 0 {
                for x in &mut r {
                    *x += (uniform(&mut rng) * 2.0 - 1.0) * max_step;
                }
            }
            unwrapped.row_mut(p, c).copy_from_slice(&r);
        }
    }
    let wrapped = Array3::from_fn(shape, |p, c, d| {
        unwrapped.get(p, c, d).rem_euclid(box_l[d])
    });
    (wrapped, unwrapped)
}

/// Metadata for a single species with the given properties.
pub fn single_species(
    name: &str,
    n_particles: usize,
    n_configurations: usize,
    properties: &[(&str, usize)],
) -> TrajectoryMetadata {
    TrajectoryMetadata {
        n_configurations,
        species_list: vec![SpeciesInfo::new(
            name,
            n_particles,
            properties
                .iter()
                .map(|(prop, n_dims)| PropertyInfo::new(*prop, *n_dims)),
        )],
        box_l: vec![10.0, 10.0, 10.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_walk() {
        let (a, _) = random_walk(7, 2, 20, [5.0, 5.0, 5.0], 1.0);
        let (b, _) = random_walk(7, 2, 20, [5.0, 5.0, 5.0], 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn wrapped_positions_stay_in_box() {
        let (wrapped, _) = random_walk(3, 4, 200, [4.0, 5.0, 6.0], 1.5);
        for p in 0..4 {
            for c in 0..200 {
                for (d, l) in [4.0, 5.0, 6.0].into_iter().enumerate() {
                    let x = wrapped.get(p, c, d);
                    assert!((0.0..l).contains(&x), "{x} outside [0, {l})");
                }
            }
        }
    }
}
