//! Integration tests: transient write failures and on-disk persistence.

use std::sync::Arc;

use mdstream_core::{DatasetPath, Shape};
use mdstream_engine::{EngineConfig, EngineError, Experiment};
use mdstream_store::{StoreConfig, StoreError, TrajectoryStore};
use mdstream_test_utils::synthetic::{ramp, single_species};
use mdstream_test_utils::InstrumentedBackend;
use mdstream_transform::TransformKind;
use mdstream_transforms::default_registry;

const N: usize = 40;

fn no_delay() -> StoreConfig {
    StoreConfig {
        retry_delay_ms: 0,
        retry_attempts: 1,
        ..StoreConfig::default()
    }
}

fn charged_experiment(store: TrajectoryStore) -> Experiment {
    let metadata = single_species("Na", 2, N, &[("Velocities", 3)]);
    if !store.check_existence(&DatasetPath::new("Na", "Velocities")) {
        store.add_dataset(metadata.dataset_shapes()).unwrap();
        store
            .write_array(&DatasetPath::new("Na", "Velocities"), &ramp(Shape::new(2, N, 3)), 0)
            .unwrap();
    }
    let config = EngineConfig {
        memory_limit_bytes: Some(1 << 20),
        store: store.config().clone(),
        ..EngineConfig::default()
    };
    let mut exp = Experiment::new(store, default_registry(), config)
        .unwrap()
        .with_metadata(&metadata);
    exp.set_charge("Na", 1.0).unwrap();
    exp
}

#[test]
fn single_transient_failure_is_retried() {
    let backend = Arc::new(InstrumentedBackend::in_memory());
    let exp = charged_experiment(TrajectoryStore::with_backend(backend.clone(), no_delay()));
    backend.reset_counters();
    backend.fail_next_writes(1);

    let report = exp
        .perform_transformation(TransformKind::IonicCurrent, None)
        .unwrap();
    assert_eq!(report.configurations_written(), N);
    assert_eq!(backend.failed_writes(), 1);
    assert_eq!(backend.writes(), 1);
    assert_eq!(
        exp.store()
            .populated(&DatasetPath::new("Na", "Ionic_Current"))
            .unwrap(),
        N
    );
}

#[test]
fn repeated_transient_failure_propagates() {
    let backend = Arc::new(InstrumentedBackend::in_memory());
    let exp = charged_experiment(TrajectoryStore::with_backend(backend.clone(), no_delay()));
    backend.fail_next_writes(2);

    let err = exp
        .perform_transformation(TransformKind::IonicCurrent, None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Store {
            source: StoreError::TransientIo { attempts: 2, .. },
            ..
        }
    ));
    assert_eq!(
        exp.store()
            .populated(&DatasetPath::new("Na", "Ionic_Current"))
            .unwrap(),
        0
    );
}

#[test]
fn file_store_output_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let exp = charged_experiment(TrajectoryStore::open(dir.path(), no_delay()).unwrap());
    exp.perform_transformation(TransformKind::IonicCurrent, None)
        .unwrap();
    let first = exp
        .store()
        .read_range(&DatasetPath::new("Na", "Ionic_Current"), 0, N)
        .unwrap();
    drop(exp);

    let exp = charged_experiment(TrajectoryStore::open(dir.path(), no_delay()).unwrap());
    let report = exp
        .perform_transformation(TransformKind::IonicCurrent, None)
        .unwrap();
    assert_eq!(report.skipped().count(), 1);
    let second = exp
        .store()
        .read_range(&DatasetPath::new("Na", "Ionic_Current"), 0, N)
        .unwrap();
    assert_eq!(first, second);
    let velocities = ramp(Shape::new(2, N, 3));
    assert_eq!(second.get(0, 3, 2), velocities.get(0, 3, 2) + velocities.get(1, 3, 2));
}

#[test]
fn engine_config_loads_from_toml() {
    let config = EngineConfig::from_toml_str(
        r#"
        memory_fraction = 0.25
        prefetch = false

        [store]
        retry_delay_ms = 0
        "#,
    )
    .unwrap();
    assert_eq!(config.memory_fraction, 0.25);
    assert!(!config.prefetch);
    assert_eq!(config.store, no_delay());

    let exp = Experiment::new(TrajectoryStore::in_memory(), default_registry(), config);
    assert!(exp.is_ok());
}

#[test]
fn toml_retry_settings_reach_the_store() {
    let backend = Arc::new(InstrumentedBackend::in_memory());
    let store = TrajectoryStore::with_backend(backend.clone(), StoreConfig::default());
    let metadata = single_species("Na", 2, N, &[("Velocities", 3)]);
    store.add_dataset(metadata.dataset_shapes()).unwrap();
    store
        .write_array(&DatasetPath::new("Na", "Velocities"), &ramp(Shape::new(2, N, 3)), 0)
        .unwrap();

    let config = EngineConfig::from_toml_str(
        r#"
        memory_limit_bytes = 1048576

        [store]
        retry_delay_ms = 0
        retry_attempts = 0
        "#,
    )
    .unwrap();
    let mut exp = Experiment::new(store, default_registry(), config)
        .unwrap()
        .with_metadata(&metadata);
    exp.set_charge("Na", 1.0).unwrap();
    assert_eq!(exp.store().config().retry_attempts, 0);

    // With retries disabled a single transient failure is fatal.
    backend.fail_next_writes(1);
    let err = exp
        .perform_transformation(TransformKind::IonicCurrent, None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Store {
            source: StoreError::TransientIo { attempts: 1, .. },
            ..
        }
    ));
    assert_eq!(backend.failed_writes(), 1);
}

#[test]
fn experiment_opens_file_store_with_configured_chunking() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::from_toml_str(
        r#"
        memory_limit_bytes = 1048576

        [store]
        retry_delay_ms = 0
        chunk_bytes = 480
        "#,
    )
    .unwrap();
    let exp = Experiment::open(dir.path(), default_registry(), config).unwrap();
    assert_eq!(exp.store().config().chunk_bytes, 480);

    let path = DatasetPath::new("Na", "Velocities");
    exp.store()
        .add_dataset([(path.clone(), Shape::new(2, N, 3))])
        .unwrap();
    exp.store()
        .write_array(&path, &ramp(Shape::new(2, N, 3)), 0)
        .unwrap();
    // 48 bytes per configuration, ten configurations per chunk.
    let chunks = dir.path().join("Na").join("Velocities").join("c");
    let written = std::fs::read_dir(&chunks).unwrap().count();
    assert_eq!(written, N / 10);
    assert_eq!(
        exp.store().read_range(&path, 0, N).unwrap(),
        ramp(Shape::new(2, N, 3))
    );
}
