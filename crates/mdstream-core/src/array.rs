//! Particle-major `f64` buffer shaped `[n_particles, n_configurations, n_dims]`.
//!
//! [`Array3`] is the unit of data exchanged between the store, the batch
//! stream, and transformations. The layout is row-major over
//! `(particle, configuration, dim)`, so one particle's trajectory is
//! contiguous. The store keeps configuration-major data on disk and
//! converts at the boundary with [`Array3::from_configuration_major`] and
//! [`Array3::to_configuration_major`].

use crate::error::ArrayError;
use crate::id::Shape;

/// Owned three-axis `f64` array.
#[derive(Clone, Debug, PartialEq)]
pub struct Array3 {
    shape: Shape,
    data: Vec<f64>,
}

impl Array3 {
    /// A zero-filled array of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    /// Wrap a particle-major buffer.
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Result<Self, ArrayError> {
        if data.len() != shape.len() {
            return Err(ArrayError::LengthMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Build an array by evaluating `f(particle, configuration, dim)`.
    pub fn from_fn(shape: Shape, mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(shape.len());
        for p in 0..shape.n_particles {
            for c in 0..shape.n_configurations {
                for d in 0..shape.n_dims {
                    data.push(f(p, c, d));
                }
            }
        }
        Self { shape, data }
    }

    /// Convert a configuration-major buffer (`[config][particle][dim]`).
    pub fn from_configuration_major(shape: Shape, data: &[f64]) -> Result<Self, ArrayError> {
        if data.len() != shape.len() {
            return Err(ArrayError::LengthMismatch {
                shape,
                len: data.len(),
            });
        }
        let per_config = shape.values_per_configuration();
        let mut out = Self::zeros(shape);
        for c in 0..shape.n_configurations {
            for p in 0..shape.n_particles {
                let src = c * per_config + p * shape.n_dims;
                let dst = out.offset(p, c, 0);
                out.data[dst..dst + shape.n_dims].copy_from_slice(&data[src..src + shape.n_dims]);
            }
        }
        Ok(out)
    }

    /// Flatten into configuration-major order (`[config][particle][dim]`).
    pub fn to_configuration_major(&self) -> Vec<f64> {
        let shape = self.shape;
        let mut out = Vec::with_capacity(shape.len());
        for c in 0..shape.n_configurations {
            for p in 0..shape.n_particles {
                out.extend_from_slice(self.row(p, c));
            }
        }
        out
    }

    /// The array's shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of configurations (length of the batchable axis).
    pub fn n_configurations(&self) -> usize {
        self.shape.n_configurations
    }

    /// Particle-major values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable particle-major values.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Consume the array, returning the particle-major buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    fn offset(&self, particle: usize, configuration: usize, dim: usize) -> usize {
        (particle * self.shape.n_configurations + configuration) * self.shape.n_dims + dim
    }

    /// Value at `(particle, configuration, dim)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn get(&self, particle: usize, configuration: usize, dim: usize) -> f64 {
        self.data[self.offset(particle, configuration, dim)]
    }

    /// Set the value at `(particle, configuration, dim)`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn set(&mut self, particle: usize, configuration: usize, dim: usize, value: f64) {
        let idx = self.offset(particle, configuration, dim);
        self.data[idx] = value;
    }

    /// The `n_dims` values of one particle at one configuration.
    pub fn row(&self, particle: usize, configuration: usize) -> &[f64] {
        let start = self.offset(particle, configuration, 0);
        &self.data[start..start + self.shape.n_dims]
    }

    /// Mutable access to one particle's values at one configuration.
    pub fn row_mut(&mut self, particle: usize, configuration: usize) -> &mut [f64] {
        let start = self.offset(particle, configuration, 0);
        let n_dims = self.shape.n_dims;
        &mut self.data[start..start + n_dims]
    }

    /// Copy out configurations `[start, start + len)`.
    pub fn slice_configurations(&self, start: usize, len: usize) -> Result<Self, ArrayError> {
        self.check_range(start, len)?;
        let shape = self.shape.with_configurations(len);
        let mut out = Vec::with_capacity(shape.len());
        for p in 0..self.shape.n_particles {
            let from = self.offset(p, start, 0);
            out.extend_from_slice(&self.data[from..from + len * self.shape.n_dims]);
        }
        Ok(Self { shape, data: out })
    }

    /// Overwrite configurations `[start, start + other.len)` with `other`.
    pub fn write_configurations(&mut self, start: usize, other: &Array3) -> Result<(), ArrayError> {
        if !self.shape.same_rows(&other.shape) {
            return Err(ArrayError::IncompatibleShapes {
                left: self.shape,
                right: other.shape,
            });
        }
        let len = other.shape.n_configurations;
        self.check_range(start, len)?;
        let span = len * self.shape.n_dims;
        for p in 0..self.shape.n_particles {
            let dst = self.offset(p, start, 0);
            let src = other.offset(p, 0, 0);
            self.data[dst..dst + span].copy_from_slice(&other.data[src..src + span]);
        }
        Ok(())
    }

    /// Concatenate `other` after the last configuration.
    pub fn append_configurations(&mut self, other: &Array3) -> Result<(), ArrayError> {
        if !self.shape.same_rows(&other.shape) {
            return Err(ArrayError::IncompatibleShapes {
                left: self.shape,
                right: other.shape,
            });
        }
        let own = self.shape.n_configurations;
        let total = own + other.shape.n_configurations;
        let mut grown = Self::zeros(self.shape.with_configurations(total));
        grown.write_configurations(0, self)?;
        grown.write_configurations(own, other)?;
        *self = grown;
        Ok(())
    }

    fn check_range(&self, start: usize, len: usize) -> Result<(), ArrayError> {
        let end = start.saturating_add(len);
        if end > self.shape.n_configurations {
            return Err(ArrayError::RangeOutOfBounds {
                start,
                end,
                n_configurations: self.shape.n_configurations,
            });
        }
        Ok(())
    }
}
