//! Benchmark profiles for the mdstream transformation engine.
//!
//! Provides pre-populated in-memory [`Experiment`]s:
//!
//! - [`reference_profile`]: two species of 100 ions, 1000 configurations
//! - [`stress_profile`]: two species of 1000 ions, 2000 configurations
//!
//! Both fix the memory budget so that runs stream in several batches
//! regardless of the host.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use mdstream_core::{PropertyInfo, Shape, SpeciesInfo, TrajectoryMetadata};
use mdstream_engine::{EngineConfig, EngineError, Experiment};
use mdstream_store::{StoreError, TrajectoryStore};
use mdstream_test_utils::synthetic::{noise, random_walk};
use mdstream_transforms::default_registry;

/// Box edge used by every profile.
pub const BOX_LENGTH: f64 = 10.0;

/// Memory budget of the reference profile, in bytes.
pub const REFERENCE_MEMORY_LIMIT: u64 = 1 << 20;

/// Metadata for a sodium chloride melt with positions and velocities.
pub fn melt_metadata(n_particles: usize, n_configurations: usize) -> TrajectoryMetadata {
    let properties = || [PropertyInfo::new("Positions", 3), PropertyInfo::new("Velocities", 3)];
    TrajectoryMetadata {
        n_configurations,
        species_list: vec![
            SpeciesInfo::new("Na", n_particles, properties()).with_charge(1.0),
            SpeciesInfo::new("Cl", n_particles, properties()).with_charge(-1.0),
        ],
        box_l: vec![BOX_LENGTH; 3],
    }
}

/// Allocate and fill every dataset of `metadata` with a seeded random
/// walk (positions) and uniform noise (everything else).
pub fn populate(
    store: &TrajectoryStore,
    metadata: &TrajectoryMetadata,
    seed: u64,
) -> Result<(), StoreError> {
    store.add_dataset(metadata.dataset_shapes())?;
    for (i, species) in metadata.species_list.iter().enumerate() {
        let species_seed = seed.wrapping_add(i as u64 * 1_000);
        for prop in &species.properties {
            let shape = Shape::new(species.n_particles, metadata.n_configurations, prop.n_dims);
            let values = if prop.name == "Positions" {
                random_walk(
                    species_seed,
                    species.n_particles,
                    metadata.n_configurations,
                    [BOX_LENGTH; 3],
                    0.5,
                )
                .0
            } else {
                noise(species_seed + 1, shape)
            };
            store.write_array(&species.path(&prop.name), &values, 0)?;
        }
    }
    Ok(())
}

fn profile(
    n_particles: usize,
    n_configurations: usize,
    seed: u64,
    memory_limit: u64,
) -> Result<Experiment, EngineError> {
    let metadata = melt_metadata(n_particles, n_configurations);
    let store = TrajectoryStore::in_memory();
    populate(&store, &metadata, seed).map_err(|source| EngineError::Store {
        species: String::new(),
        source,
    })?;
    let config = EngineConfig {
        memory_limit_bytes: Some(memory_limit),
        ..EngineConfig::default()
    };
    Ok(Experiment::new(store, default_registry(), config)?.with_metadata(&metadata))
}

/// 2 × 100 ions over 1000 configurations with a 1 MiB budget.
pub fn reference_profile(seed: u64) -> Result<Experiment, EngineError> {
    profile(100, 1_000, seed, REFERENCE_MEMORY_LIMIT)
}

/// 2 × 1000 ions over 2000 configurations with an 8 MiB budget.
pub fn stress_profile(seed: u64) -> Result<Experiment, EngineError> {
    profile(1_000, 2_000, seed, 8 * REFERENCE_MEMORY_LIMIT)
}
