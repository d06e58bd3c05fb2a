//! Species and property descriptors.
//!
//! [`TrajectoryMetadata`] is produced once by a file reader and consumed
//! by the store to allocate datasets before any configuration is read.

use smallvec::SmallVec;

use crate::id::{DatasetPath, Shape};

/// Short ordered list of properties. Most species record fewer than
/// eight properties, so the list stays inline.
pub type PropertyList = SmallVec<[PropertyInfo; 8]>;

/// A physical observable's label and per-particle dimensionality
/// (e.g. positions have 3 dims).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyInfo {
    /// Property label, used as the second dataset path component.
    pub name: String,
    /// Values per particle per configuration.
    pub n_dims: usize,
}

impl PropertyInfo {
    /// Create a property descriptor.
    pub fn new(name: impl Into<String>, n_dims: usize) -> Self {
        Self {
            name: name.into(),
            n_dims,
        }
    }
}

/// One chemical species: its particle count, the properties recorded
/// for it, and the physical constants the reference transformations use.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesInfo {
    /// Species label, used as the first dataset path component.
    pub name: String,
    /// Number of particles of this species.
    pub n_particles: usize,
    /// Properties recorded for the species, in reader order.
    pub properties: PropertyList,
    /// Charge per particle in elementary charges. Default: 0.
    pub charge: f64,
    /// Mass per particle in atomic mass units. Default: 1.
    pub mass: f64,
}

impl SpeciesInfo {
    /// Create a species with the given properties and default constants.
    pub fn new(
        name: impl Into<String>,
        n_particles: usize,
        properties: impl IntoIterator<Item = PropertyInfo>,
    ) -> Self {
        Self {
            name: name.into(),
            n_particles,
            properties: properties.into_iter().collect(),
            charge: 0.0,
            mass: 1.0,
        }
    }

    /// Set the per-particle charge.
    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    /// Set the per-particle mass.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    /// Look up a recorded property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Dataset path for one of this species' properties.
    pub fn path(&self, property: &str) -> DatasetPath {
        DatasetPath::new(&self.name, property)
    }
}

/// Shape of an entire trajectory, known before any data is read.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryMetadata {
    /// Number of configurations the reader will deliver.
    pub n_configurations: usize,
    /// Species present in the trajectory.
    pub species_list: Vec<SpeciesInfo>,
    /// Simulation box edge lengths.
    pub box_l: Vec<f64>,
}

impl TrajectoryMetadata {
    /// Look up a species by name.
    pub fn species(&self, name: &str) -> Option<&SpeciesInfo> {
        self.species_list.iter().find(|s| s.name == name)
    }

    /// Every `(path, shape)` pair the trajectory will populate, in
    /// species then property order.
    pub fn dataset_shapes(&self) -> Vec<(DatasetPath, Shape)> {
        self.species_list
            .iter()
            .flat_map(|species| {
                species.properties.iter().map(move |prop| {
                    (
                        species.path(&prop.name),
                        Shape::new(species.n_particles, self.n_configurations, prop.n_dims),
                    )
                })
            })
            .collect()
    }
}
