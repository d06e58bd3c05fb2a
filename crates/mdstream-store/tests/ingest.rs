//! Integration tests: loading trajectories through a reader.

use std::sync::Arc;

use mdstream_core::{Array3, DatasetPath, PropertyInfo, Shape, SpeciesInfo, TrajectoryMetadata};
use mdstream_store::{StoreConfig, StoreError, TrajectoryStore};
use mdstream_test_utils::synthetic::{noise, ramp};
use mdstream_test_utils::{InstrumentedBackend, MockTrajectoryReader};

fn melt(n_configurations: usize, n_na: usize) -> TrajectoryMetadata {
    TrajectoryMetadata {
        n_configurations,
        species_list: vec![
            SpeciesInfo::new(
                "Na",
                n_na,
                [PropertyInfo::new("Positions", 3), PropertyInfo::new("KE", 1)],
            ),
            SpeciesInfo::new("Cl", 3, [PropertyInfo::new("Positions", 3)]),
        ],
        box_l: vec![8.0, 8.0, 8.0],
    }
}

fn reader(
    metadata: TrajectoryMetadata,
    chunk_size: usize,
    seed: u64,
) -> (MockTrajectoryReader, Vec<(DatasetPath, Array3)>) {
    let mut values = Vec::new();
    for (i, (path, shape)) in metadata.dataset_shapes().into_iter().enumerate() {
        values.push((path, noise(seed + i as u64, shape)));
    }
    let mut reader = MockTrajectoryReader::new(metadata, chunk_size);
    for (path, array) in &values {
        reader.set_data(path.clone(), array.clone());
    }
    (reader, values)
}

#[test]
fn ingest_fills_every_dataset() {
    let store = TrajectoryStore::in_memory();
    let (mut source, values) = reader(melt(30, 2), 7, 1);

    let report = store.ingest(&mut source).unwrap();
    assert_eq!(report.start, 0);
    assert_eq!(report.n_configurations, 30);
    assert_eq!(report.chunks, 5);

    for (path, expected) in &values {
        assert_eq!(store.populated(path).unwrap(), 30);
        assert_eq!(&store.read_range(path, 0, 30).unwrap(), expected);
    }
}

#[test]
fn second_trajectory_is_appended() {
    let store = TrajectoryStore::in_memory();
    let (mut first, first_values) = reader(melt(30, 2), 8, 1);
    let (mut second, second_values) = reader(melt(20, 2), 8, 100);

    store.ingest(&mut first).unwrap();
    let report = store.ingest(&mut second).unwrap();
    assert_eq!(report.start, 30);

    for ((path, head), (_, tail)) in first_values.iter().zip(&second_values) {
        assert_eq!(store.get_data_size(path).unwrap().n_configurations, 50);
        assert_eq!(store.populated(path).unwrap(), 50);
        let mut expected = head.clone();
        expected.append_configurations(tail).unwrap();
        assert_eq!(store.read_range(path, 0, 50).unwrap(), expected);
    }
}

#[test]
fn mismatched_particle_count_is_rejected_before_growing() {
    let backend = Arc::new(InstrumentedBackend::in_memory());
    let store = TrajectoryStore::with_backend(backend.clone(), StoreConfig::default());
    store.ingest(&mut reader(melt(10, 2), 5, 1).0).unwrap();
    backend.reset_counters();

    let err = store.ingest(&mut reader(melt(10, 4), 5, 2).0).unwrap_err();
    assert!(matches!(err, StoreError::ShapeMismatch { .. }));
    assert_eq!(backend.grows(), 0);
    assert_eq!(backend.writes(), 0);
}

#[test]
fn reader_failure_keeps_completed_chunks() {
    let store = TrajectoryStore::in_memory();
    let (mut source, values) = reader(melt(30, 2), 7, 1);
    source.fail_at_chunk(2);

    let err = store.ingest(&mut source).unwrap_err();
    assert!(matches!(err, StoreError::Reader(_)));

    let (path, expected) = &values[0];
    assert_eq!(store.get_data_size(path).unwrap().n_configurations, 30);
    assert_eq!(store.populated(path).unwrap(), 14);
    assert_eq!(
        store.read_range(path, 0, 14).unwrap(),
        expected.slice_configurations(0, 14).unwrap()
    );
}

#[test]
fn file_store_round_trips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let (mut source, values) = reader(melt(12, 2), 5, 9);
    {
        let store = TrajectoryStore::open(dir.path(), StoreConfig::default()).unwrap();
        store.ingest(&mut source).unwrap();
    }

    let store = TrajectoryStore::open(dir.path(), StoreConfig::default()).unwrap();
    let mut listed = store.list_datasets().unwrap();
    listed.sort();
    let mut expected_paths: Vec<DatasetPath> = values.iter().map(|(p, _)| p.clone()).collect();
    expected_paths.sort();
    assert_eq!(listed, expected_paths);

    for (path, expected) in &values {
        assert_eq!(store.populated(path).unwrap(), 12);
        assert_eq!(&store.read_range(path, 0, 12).unwrap(), expected);
    }
    assert!(dir.path().join("Na").join("KE").join("zarr.json").is_file());
}

#[test]
fn unwritten_paths_read_back_as_zeros() {
    let store = TrajectoryStore::in_memory();
    let metadata = melt(6, 1);
    let mut source = MockTrajectoryReader::new(metadata, 4);
    source.set_data(DatasetPath::new("Na", "KE"), ramp(Shape::new(1, 6, 1)));
    store.ingest(&mut source).unwrap();

    let positions = store
        .read_range(&DatasetPath::new("Cl", "Positions"), 0, 6)
        .unwrap();
    assert!(positions.as_slice().iter().all(|&v| v == 0.0));
    assert_eq!(
        store.read_range(&DatasetPath::new("Na", "KE"), 0, 6).unwrap(),
        ramp(Shape::new(1, 6, 1))
    );
}
