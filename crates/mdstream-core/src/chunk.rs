//! Bounded, time-contiguous buffer of configuration data in transit.
//!
//! A [`TrajectoryChunkData`] is produced by a file reader or by the
//! transformation driver and handed, by value, to the store's append
//! operation. Every `(species, property)` slot is pre-allocated as a
//! zero-filled `[n_particles, chunk_size, n_dims]` array.

use indexmap::IndexMap;

use crate::array::Array3;
use crate::error::ChunkError;
use crate::id::{DatasetPath, Shape};
use crate::property::SpeciesInfo;

/// Per-`(species, property)` arrays for one contiguous configuration range.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryChunkData {
    chunk_size: usize,
    species_list: Vec<SpeciesInfo>,
    data: IndexMap<DatasetPath, Array3>,
}

impl TrajectoryChunkData {
    /// Allocate zero-filled slots for every property of every species.
    pub fn new(chunk_size: usize, species_list: Vec<SpeciesInfo>) -> Self {
        let mut data = IndexMap::new();
        for species in &species_list {
            for prop in &species.properties {
                data.insert(
                    species.path(&prop.name),
                    Array3::zeros(Shape::new(species.n_particles, chunk_size, prop.n_dims)),
                );
            }
        }
        Self {
            chunk_size,
            species_list,
            data,
        }
    }

    /// Number of configurations covered by the chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Species described by the chunk.
    pub fn species_list(&self) -> &[SpeciesInfo] {
        &self.species_list
    }

    /// Insert `data` for one property at configuration offset `config_idx`.
    ///
    /// `data` is shaped `[n_particles, len, n_dims]` and must fit inside
    /// the slot starting at `config_idx`.
    pub fn add_data(
        &mut self,
        data: &Array3,
        config_idx: usize,
        species_name: &str,
        property_name: &str,
    ) -> Result<(), ChunkError> {
        let species = self
            .species_list
            .iter()
            .find(|s| s.name == species_name)
            .ok_or_else(|| ChunkError::UnknownSpecies {
                species: species_name.to_string(),
            })?;
        let path = species.path(property_name);
        let slot = self
            .data
            .get_mut(&path)
            .ok_or_else(|| ChunkError::UnknownProperty {
                species: species_name.to_string(),
                property: property_name.to_string(),
            })?;
        let slot_shape = slot.shape();
        slot.write_configurations(config_idx, data)
            .map_err(|_| ChunkError::DoesNotFit {
                inserted: data.shape(),
                slot: slot_shape,
                config_idx,
            })
    }

    /// The array stored for a path, if the chunk carries it.
    pub fn get(&self, path: &DatasetPath) -> Option<&Array3> {
        self.data.get(path)
    }

    /// Iterate `(path, array)` pairs in species then property order.
    pub fn iter(&self) -> impl Iterator<Item = (&DatasetPath, &Array3)> {
        self.data.iter()
    }

    /// Number of `(species, property)` slots.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk has no slots.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
