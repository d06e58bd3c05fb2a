//! Dataset addressing: [`DatasetPath`] and [`Shape`].

use std::fmt;
use std::str::FromStr;

use crate::error::PathError;
use crate::DTYPE_SIZE;

/// Identifies one on-disk dataset as `"<species>/<property>"`.
///
/// Paths are the unit of existence checks, allocation, resizing, and
/// read/write addressing in the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetPath {
    species: String,
    property: String,
}

impl DatasetPath {
    /// Build a path from its species and property components.
    pub fn new(species: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            property: property.into(),
        }
    }

    /// The species component.
    pub fn species(&self) -> &str {
        &self.species
    }

    /// The property component.
    pub fn property(&self) -> &str {
        &self.property
    }
}

impl fmt::Display for DatasetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.species, self.property)
    }
}

impl FromStr for DatasetPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let relative = s.strip_prefix('/').unwrap_or(s);
        let mut parts = relative.split('/');
        let (species, property) = match (parts.next(), parts.next(), parts.next()) {
            (Some(species), Some(property), None) => (species, property),
            _ => {
                return Err(PathError::Malformed {
                    path: s.to_string(),
                })
            }
        };
        if species.is_empty() || property.is_empty() {
            return Err(PathError::EmptyComponent {
                path: s.to_string(),
            });
        }
        Ok(Self::new(species, property))
    }
}

/// Shape of a dataset: `[n_particles, n_configurations, n_dims]`.
///
/// `n_particles` and `n_dims` are fixed at creation; only the
/// configuration axis may grow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of particles (rows).
    pub n_particles: usize,
    /// Number of configurations (time steps).
    pub n_configurations: usize,
    /// Per-particle dimensionality of the property.
    pub n_dims: usize,
}

impl Shape {
    /// Create a shape from its three extents.
    pub fn new(n_particles: usize, n_configurations: usize, n_dims: usize) -> Self {
        Self {
            n_particles,
            n_configurations,
            n_dims,
        }
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.n_particles * self.n_configurations * self.n_dims
    }

    /// Whether the shape holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of values in one configuration (`n_particles * n_dims`).
    pub fn values_per_configuration(&self) -> usize {
        self.n_particles * self.n_dims
    }

    /// Bytes needed to hold one configuration.
    pub fn bytes_per_configuration(&self) -> usize {
        self.values_per_configuration() * DTYPE_SIZE
    }

    /// The same particle and dimension extents with a different
    /// configuration count.
    pub fn with_configurations(&self, n_configurations: usize) -> Self {
        Self {
            n_configurations,
            ..*self
        }
    }

    /// Whether `other` has the same fixed (particle, dimension) axes.
    pub fn same_rows(&self, other: &Shape) -> bool {
        self.n_particles == other.n_particles && self.n_dims == other.n_dims
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}]",
            self.n_particles, self.n_configurations, self.n_dims
        )
    }
}

impl From<(usize, usize, usize)> for Shape {
    fn from((n_particles, n_configurations, n_dims): (usize, usize, usize)) -> Self {
        Self::new(n_particles, n_configurations, n_dims)
    }
}
