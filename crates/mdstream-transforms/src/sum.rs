//! Particle reductions shared by the collective transformations.

use mdstream_core::{Array3, Shape};

/// `out[0, c, d] = sum_p weight(p, c) * input[p, c, d]`.
pub(crate) fn weighted_particle_sum(
    input: &Array3,
    mut weight: impl FnMut(usize, usize) -> f64,
) -> Array3 {
    let shape = input.shape();
    let mut out = Array3::zeros(Shape::new(1, shape.n_configurations, shape.n_dims));
    for p in 0..shape.n_particles {
        for c in 0..shape.n_configurations {
            let w = weight(p, c);
            let row = input.row(p, c);
            for (acc, v) in out.row_mut(0, c).iter_mut().zip(row) {
                *acc += w * v;
            }
        }
    }
    out
}

/// `S . v` for a Voigt-ordered stress row `xx, yy, zz, xy, xz, yz`.
pub(crate) fn stress_dot_velocity(stress: &[f64], v: &[f64]) -> [f64; 3] {
    let [xx, yy, zz, xy, xz, yz] = [stress[0], stress[1], stress[2], stress[3], stress[4], stress[5]];
    [
        xx * v[0] + xy * v[1] + xz * v[2],
        xy * v[0] + yy * v[1] + yz * v[2],
        xz * v[0] + yz * v[1] + zz * v[2],
    ]
}
