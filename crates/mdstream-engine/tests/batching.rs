//! Integration tests: batch planning, resumption, and extension.
//!
//! A single species of 3 particles with 3-dim velocities costs 72 bytes
//! per configuration, so a memory limit of `2 * 72 * k` (at the default
//! fraction of one half) yields batches of `k` configurations.

use std::sync::Arc;

use indexmap::IndexMap;
use mdstream_core::{DatasetPath, Shape, TrajectoryMetadata};
use mdstream_engine::{EngineConfig, EngineError, Experiment, MemoryError, SpeciesStatus};
use mdstream_store::{StoreConfig, TrajectoryStore};
use mdstream_test_utils::fixtures::{CopyProperty, CumulativeSum, FailingTransform};
use mdstream_test_utils::synthetic::{ramp, single_species};
use mdstream_test_utils::{InstrumentedBackend, MockTrajectoryReader};
use mdstream_transform::{PropertyBatch, TransformContext, Transformation};
use mdstream_transforms::default_registry;

const PER_CONFIG: u64 = 72;

fn limit_for_batch(batch_size: u64) -> u64 {
    2 * PER_CONFIG * batch_size
}

fn metadata(n: usize) -> TrajectoryMetadata {
    single_species("Na", 3, n, &[("Velocities", 3)])
}

fn velocities() -> DatasetPath {
    DatasetPath::new("Na", "Velocities")
}

fn populated_store(store: TrajectoryStore, n: usize) -> TrajectoryStore {
    store.add_dataset(metadata(n).dataset_shapes()).unwrap();
    store
        .write_array(&velocities(), &ramp(Shape::new(3, n, 3)), 0)
        .unwrap();
    store
}

fn experiment(store: TrajectoryStore, n: usize, batch_size: u64, prefetch: bool) -> Experiment {
    let config = EngineConfig {
        memory_limit_bytes: Some(limit_for_batch(batch_size)),
        prefetch,
        ..EngineConfig::default()
    };
    Experiment::new(store, default_registry(), config)
        .unwrap()
        .with_metadata(&metadata(n))
}

fn cumulative_sum() -> CumulativeSum {
    CumulativeSum::new("Velocities", "Velocity_Sum", 3)
}

fn expected_cumulative_sum(n: usize) -> Vec<f64> {
    let input = ramp(Shape::new(3, n, 3));
    let mut out = input.clone();
    for p in 0..3 {
        for d in 0..3 {
            let mut acc = 0.0;
            for c in 0..n {
                acc += input.get(p, c, d);
                out.set(p, c, d, acc);
            }
        }
    }
    out.into_vec()
}

#[test]
fn output_is_independent_of_batch_size() {
    let mut outputs = Vec::new();
    for (batch_size, expected_batches) in [(10, vec![10; 10]), (37, vec![37, 37, 26])] {
        let exp = experiment(populated_store(TrajectoryStore::in_memory(), 100), 100, batch_size, true);
        let mut transform = cumulative_sum();
        let report = exp.run_transformation(&mut transform, None).unwrap();
        assert_eq!(report.configurations_written(), 100);

        let sizes: Vec<usize> = transform.log.entries().iter().map(|e| e.2).collect();
        assert_eq!(sizes, expected_batches);

        let path = DatasetPath::new("Na", "Velocity_Sum");
        assert_eq!(exp.store().populated(&path).unwrap(), 100);
        outputs.push(exp.store().read_range(&path, 0, 100).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0].as_slice(), expected_cumulative_sum(100).as_slice());
}

#[test]
fn plan_of_four_equal_batches_covers_every_configuration() {
    let exp = experiment(populated_store(TrajectoryStore::in_memory(), 100), 100, 25, true);
    let mut transform = cumulative_sum();
    let report = exp.run_transformation(&mut transform, None).unwrap();

    let starts: Vec<(usize, usize)> = transform.log.entries().iter().map(|e| (e.1, e.2)).collect();
    assert_eq!(starts, vec![(0, 25), (25, 25), (50, 25), (75, 25)]);
    assert_eq!(report.species[0].batches, 4);
    assert_eq!(report.species[0].status, SpeciesStatus::Processed);
}

#[test]
fn prefetch_does_not_change_results() {
    let mut outputs = Vec::new();
    for prefetch in [true, false] {
        let exp = experiment(populated_store(TrajectoryStore::in_memory(), 64), 64, 9, prefetch);
        let mut transform = cumulative_sum();
        exp.run_transformation(&mut transform, None).unwrap();
        outputs.push(
            exp.store()
                .read_range(&DatasetPath::new("Na", "Velocity_Sum"), 0, 64)
                .unwrap(),
        );
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn second_run_is_skipped_without_writes() {
    let backend = Arc::new(InstrumentedBackend::in_memory());
    let store = populated_store(
        TrajectoryStore::with_backend(backend.clone(), StoreConfig::default()),
        50,
    );
    let exp = experiment(store, 50, 20, true);

    exp.run_transformation(&mut cumulative_sum(), None).unwrap();
    backend.reset_counters();

    let mut again = cumulative_sum();
    let report = exp.run_transformation(&mut again, None).unwrap();
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(report.configurations_written(), 0);
    assert!(again.log.is_empty());
    assert_eq!(backend.writes(), 0);
    assert_eq!(backend.creates(), 0);
    assert_eq!(backend.grows(), 0);
}

#[test]
fn appended_trajectory_extends_existing_output() {
    let backend = Arc::new(InstrumentedBackend::in_memory());
    let store = TrajectoryStore::with_backend(backend.clone(), StoreConfig::default());
    let config = EngineConfig {
        memory_limit_bytes: Some(limit_for_batch(16)),
        ..EngineConfig::default()
    };
    let mut exp = Experiment::new(store, default_registry(), config).unwrap();

    let full = ramp(Shape::new(3, 100, 3));
    let mut first = MockTrajectoryReader::new(metadata(60), 25);
    first.set_data(velocities(), full.slice_configurations(0, 60).unwrap());
    exp.add_trajectory(&mut first).unwrap();
    assert_eq!(exp.n_configurations(), 60);

    let mut copy = CopyProperty::new("Velocities", "Velocity_Copy", 3);
    exp.run_transformation(&mut copy, None).unwrap();

    let mut second = MockTrajectoryReader::new(metadata(40), 25);
    second.set_data(velocities(), full.slice_configurations(60, 40).unwrap());
    let ingest = exp.add_trajectory(&mut second).unwrap();
    assert_eq!(ingest.start, 60);
    assert_eq!(exp.n_configurations(), 100);

    backend.reset_counters();
    let mut copy = CopyProperty::new("Velocities", "Velocity_Copy", 3);
    let report = exp.run_transformation(&mut copy, None).unwrap();
    assert_eq!(report.species[0].offset, 60);
    assert_eq!(report.configurations_written(), 40);
    assert_eq!(backend.grows(), 1);
    assert_eq!(copy.log.entries().first().map(|e| e.1), Some(60));

    let out = DatasetPath::new("Na", "Velocity_Copy");
    assert_eq!(exp.store().get_data_size(&out).unwrap(), Shape::new(3, 100, 3));
    assert_eq!(exp.store().read_range(&out, 0, 100).unwrap(), full);
}

#[test]
fn appended_trajectory_extends_running_sum() {
    let config = EngineConfig {
        memory_limit_bytes: Some(limit_for_batch(16)),
        ..EngineConfig::default()
    };
    let mut exp = Experiment::new(TrajectoryStore::in_memory(), default_registry(), config).unwrap();

    let full = ramp(Shape::new(3, 100, 3));
    let mut first = MockTrajectoryReader::new(metadata(60), 25);
    first.set_data(velocities(), full.slice_configurations(0, 60).unwrap());
    exp.add_trajectory(&mut first).unwrap();
    exp.run_transformation(&mut cumulative_sum(), None).unwrap();

    let mut second = MockTrajectoryReader::new(metadata(40), 25);
    second.set_data(velocities(), full.slice_configurations(60, 40).unwrap());
    exp.add_trajectory(&mut second).unwrap();

    let mut transform = cumulative_sum();
    let report = exp.run_transformation(&mut transform, None).unwrap();
    assert_eq!(report.species[0].offset, 60);
    assert_eq!(transform.log.entries().first().map(|e| e.1), Some(60));

    let out = exp
        .store()
        .read_range(&DatasetPath::new("Na", "Velocity_Sum"), 0, 100)
        .unwrap();
    assert_eq!(out.as_slice(), expected_cumulative_sum(100).as_slice());
}

#[test]
fn failed_run_resumes_from_populated_mark() {
    let exp = experiment(populated_store(TrajectoryStore::in_memory(), 100), 100, 10, true);
    let out = DatasetPath::new("Na", "Flag");

    let mut failing = FailingTransform::new("Velocities", "Flag", 3);
    let err = exp.run_transformation(&mut failing, None).unwrap_err();
    assert!(matches!(err, EngineError::Transform { .. }));
    assert_eq!(err.species(), Some("Na"));
    assert_eq!(exp.store().populated(&out).unwrap(), 30);

    let mut healthy = FailingTransform::new("Velocities", "Flag", usize::MAX);
    let report = exp.run_transformation(&mut healthy, None).unwrap();
    assert_eq!(report.species[0].offset, 30);
    assert_eq!(report.configurations_written(), 70);
    assert_eq!(healthy.calls(), 7);
    assert_eq!(exp.store().populated(&out).unwrap(), 100);
}

#[test]
fn unbatchable_transformation_needs_everything_in_one_batch() {
    let exp = experiment(populated_store(TrajectoryStore::in_memory(), 100), 100, 50, true);
    let err = exp
        .run_transformation(&mut cumulative_sum().unbatchable(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Memory {
            source: MemoryError::Insufficient { .. },
            ..
        }
    ));

    let exp = experiment(populated_store(TrajectoryStore::in_memory(), 100), 100, 100, true);
    let mut transform = cumulative_sum().unbatchable();
    exp.run_transformation(&mut transform, None).unwrap();
    assert_eq!(transform.log.len(), 1);
}

#[test]
fn unknown_species_is_rejected_before_any_work() {
    let exp = experiment(populated_store(TrajectoryStore::in_memory(), 10), 10, 10, true);
    let err = exp
        .run_transformation(&mut cumulative_sum(), Some(&["Cl"][..]))
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownSpecies { ref species } if species == "Cl"));
    assert!(!exp.store().check_existence(&DatasetPath::new("Na", "Velocity_Sum")));
}

#[test]
fn single_particle_budget_for_250_gives_four_batches() {
    let metadata = single_species("Na", 1, 1_000, &[("Velocity", 3)]);
    let path = DatasetPath::new("Na", "Velocity");
    let store = TrajectoryStore::in_memory();
    store.add_dataset(metadata.dataset_shapes()).unwrap();
    let values = ramp(Shape::new(1, 1_000, 3));
    store.write_array(&path, &values, 0).unwrap();
    let config = EngineConfig {
        // 24 bytes per configuration.
        memory_limit_bytes: Some(2 * 24 * 250),
        ..EngineConfig::default()
    };
    let exp = Experiment::new(store, default_registry(), config)
        .unwrap()
        .with_metadata(&metadata);

    let mut batched = CumulativeSum::new("Velocity", "Velocity_Sum", 3);
    let report = exp.run_transformation(&mut batched, None).unwrap();
    assert_eq!(report.species[0].batches, 4);
    assert!(batched.log.entries().iter().all(|e| e.2 == 250));

    let mut single = CumulativeSum::new("Velocity", "Velocity_Sum", 3);
    let ctx = TransformContext {
        species: &metadata.species_list[0],
        box_l: &metadata.box_l,
        n_configurations: 1_000,
        offset: 0,
    };
    single.begin_species(&ctx).unwrap();
    let mut data = IndexMap::new();
    data.insert("Velocity".to_string(), values);
    let whole = single
        .transform_batch(&PropertyBatch::new(0, 1_000, data), &ctx)
        .unwrap();

    let stored = exp
        .store()
        .read_range(&DatasetPath::new("Na", "Velocity_Sum"), 0, 1_000)
        .unwrap();
    assert_eq!(stored, whole);
}
