//! The [`Experiment`] context and the transformation driver.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use mdstream_core::{
    DatasetPath, PropertyInfo, SpeciesInfo, TrajectoryChunkData, TrajectoryMetadata,
    TrajectoryReader,
};
use mdstream_store::{IngestReport, StoreError, TrajectoryStore};
use mdstream_transform::{
    resolve, PropertyBatch, Registry, ResolutionGuard, ResolveError, TransformContext,
    TransformKind, Transformation,
};

use crate::config::EngineConfig;
use crate::data::DataManager;
use crate::error::EngineError;
use crate::memory::{FixedMemory, MemoryManager, MemorySource, SystemMemory};
use crate::prefetch;
use crate::report::{RunReport, SpeciesOutcome, SpeciesStatus};

/// A store plus everything needed to transform its contents.
///
/// Holds the species table, the experiment-wide configuration count, the
/// box, the transformation registry, and the memory source. Every run is
/// given this context explicitly.
pub struct Experiment {
    store: TrajectoryStore,
    species: IndexMap<String, SpeciesInfo>,
    n_configurations: usize,
    box_l: Vec<f64>,
    registry: Registry,
    source: Arc<dyn MemorySource>,
    config: EngineConfig,
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("store", &self.store)
            .field("species", &self.species.keys().collect::<Vec<_>>())
            .field("n_configurations", &self.n_configurations)
            .field("box_l", &self.box_l)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl Experiment {
    /// An empty experiment over `store`.
    ///
    /// The store is reconfigured with `config.store`. The memory source is
    /// [`FixedMemory`] when the configuration sets `memory_limit_bytes`,
    /// [`SystemMemory`] otherwise.
    pub fn new(
        store: TrajectoryStore,
        registry: Registry,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let store = store.with_config(config.store.clone());
        let source: Arc<dyn MemorySource> = match config.memory_limit_bytes {
            Some(bytes) => Arc::new(FixedMemory(bytes)),
            None => Arc::new(SystemMemory),
        };
        Ok(Self {
            store,
            species: IndexMap::new(),
            n_configurations: 0,
            box_l: Vec::new(),
            registry,
            source,
            config,
        })
    }

    /// An empty experiment over the file store at `root`, opened with
    /// `config.store`.
    pub fn open(
        root: impl AsRef<Path>,
        registry: Registry,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let store =
            TrajectoryStore::open(root, config.store.clone()).map_err(EngineError::store(""))?;
        Self::new(store, registry, config)
    }

    /// Describe data already present in the store.
    pub fn with_metadata(mut self, metadata: &TrajectoryMetadata) -> Self {
        self.merge_metadata(metadata, metadata.n_configurations);
        self
    }

    /// Replace the memory source.
    pub fn with_memory_source(mut self, source: Arc<dyn MemorySource>) -> Self {
        self.source = source;
        self
    }

    /// The backing store.
    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    /// Species in insertion order.
    pub fn species(&self) -> impl Iterator<Item = &SpeciesInfo> {
        self.species.values()
    }

    /// Look up a species.
    pub fn species_info(&self, name: &str) -> Option<&SpeciesInfo> {
        self.species.get(name)
    }

    /// Configurations every dataset is expected to hold.
    pub fn n_configurations(&self) -> usize {
        self.n_configurations
    }

    /// Simulation box lengths.
    pub fn box_l(&self) -> &[f64] {
        &self.box_l
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The transformation registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set the per-particle charge of a species.
    pub fn set_charge(&mut self, species: &str, charge: f64) -> Result<(), EngineError> {
        let info = self
            .species
            .get_mut(species)
            .ok_or_else(|| EngineError::UnknownSpecies {
                species: species.to_string(),
            })?;
        info.charge = charge;
        Ok(())
    }

    /// Ingest a trajectory and extend the species table and
    /// configuration count with what it contained.
    pub fn add_trajectory(
        &mut self,
        reader: &mut dyn TrajectoryReader,
    ) -> Result<IngestReport, EngineError> {
        let metadata = reader.metadata().clone();
        let report = self.store.ingest(reader).map_err(EngineError::store(""))?;
        self.merge_metadata(&metadata, report.start + report.n_configurations);
        Ok(report)
    }

    fn merge_metadata(&mut self, metadata: &TrajectoryMetadata, end: usize) {
        for incoming in &metadata.species_list {
            match self.species.get_mut(&incoming.name) {
                Some(existing) => {
                    for prop in &incoming.properties {
                        if existing.property(&prop.name).is_none() {
                            existing.properties.push(prop.clone());
                        }
                    }
                }
                None => {
                    self.species.insert(incoming.name.clone(), incoming.clone());
                }
            }
        }
        self.n_configurations = self.n_configurations.max(end);
        if self.box_l.is_empty() {
            self.box_l = metadata.box_l.clone();
        }
    }

    /// Build `kind` from the registry and run it.
    pub fn perform_transformation(
        &self,
        kind: TransformKind,
        species: Option<&[&str]>,
    ) -> Result<RunReport, EngineError> {
        let mut transformation = self.registry.build(kind).map_err(EngineError::resolve(""))?;
        self.run_transformation(transformation.as_mut(), species)
    }

    /// Run `transformation` for the named species, or all species.
    ///
    /// Species are processed in order. A species whose output is already
    /// complete is skipped without writes; a partial output is extended
    /// from its populated mark. Missing inputs are produced first by
    /// resolving them to a registered transformation.
    pub fn run_transformation(
        &self,
        transformation: &mut dyn Transformation,
        species: Option<&[&str]>,
    ) -> Result<RunReport, EngineError> {
        let species = self.select_species(species)?;
        let mut guard = ResolutionGuard::new(self.config.max_resolution_depth);
        self.run_guarded(transformation, &species, &mut guard)
    }

    fn select_species(&self, names: Option<&[&str]>) -> Result<Vec<SpeciesInfo>, EngineError> {
        match names {
            None => Ok(self.species.values().cloned().collect()),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.species
                        .get(*name)
                        .cloned()
                        .ok_or_else(|| EngineError::UnknownSpecies {
                            species: name.to_string(),
                        })
                })
                .collect(),
        }
    }

    fn run_guarded(
        &self,
        transformation: &mut dyn Transformation,
        species: &[SpeciesInfo],
        guard: &mut ResolutionGuard,
    ) -> Result<RunReport, EngineError> {
        let output = transformation.output();
        let mut report = RunReport::new(transformation.name(), &output.name);
        let first = species.first().map_or("", |s| s.name.as_str());
        guard
            .enter(&output.name)
            .map_err(EngineError::resolve(first))?;

        let mut result = Ok(());
        for info in species {
            match self.run_species(transformation, info, &output, guard, &mut report.dependencies) {
                Ok(outcome) => report.species.push(outcome),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        guard.exit();
        result?;

        tracing::info!(
            transformation = %report.transformation,
            processed = report.processed().count(),
            skipped = report.skipped().count(),
            "transformation finished"
        );
        Ok(report)
    }

    fn run_species(
        &self,
        transformation: &mut dyn Transformation,
        species: &SpeciesInfo,
        output: &PropertyInfo,
        guard: &mut ResolutionGuard,
        dependencies: &mut Vec<RunReport>,
    ) -> Result<SpeciesOutcome, EngineError> {
        let name = species.name.as_str();
        let n = self.n_configurations;
        let out_path = species.path(&output.name);

        // ── CheckOutput ─────────────────────────────────────────
        if self.store.check_existence(&out_path) {
            let populated = self.store.populated(&out_path).map_err(EngineError::store(name))?;
            if populated >= n {
                tracing::info!(species = name, path = %out_path, "output complete, skipping");
                return Ok(SpeciesOutcome::skipped(name));
            }
        }

        // ── Resolve missing or short inputs ─────────────────────
        let inputs = transformation.inputs();
        let mut input_paths = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let path = species.path(input);
            let populated = self.populated_or_absent(&path, name)?;
            if populated.is_none_or(|p| p < n) {
                self.produce_input(input, species, populated, guard, dependencies)?;
            }
            input_paths.push(path);
        }

        // ── Allocate ────────────────────────────────────────────
        let target = transformation.output_shape(species, n);
        let offset = if self.store.check_existence(&out_path) {
            let info = self.store.info(&out_path).map_err(EngineError::store(name))?;
            if !info.shape.same_rows(&target) {
                return Err(EngineError::Store {
                    species: name.to_string(),
                    source: StoreError::ShapeMismatch {
                        path: out_path,
                        stored: info.shape,
                        requested: target,
                    },
                });
            }
            if info.shape.n_configurations < n {
                let extra = target.with_configurations(n - info.shape.n_configurations);
                self.store
                    .resize_dataset([(out_path.clone(), extra)])
                    .map_err(EngineError::store(name))?;
            }
            info.populated
        } else {
            self.store
                .add_dataset([(out_path.clone(), target)])
                .map_err(EngineError::store(name))?;
            0
        };

        // ── Stream ──────────────────────────────────────────────
        let memory = MemoryManager::new(self.source.as_ref(), self.config.memory_fraction);
        let plan = memory
            .get_batch_size(
                &self.store,
                &input_paths,
                n,
                offset,
                &transformation.scale_function(),
                transformation.batchable(),
            )
            .map_err(EngineError::memory(name))?;
        if plan.batch_size == 0 && offset < n {
            return Err(EngineError::InvalidPlan {
                species: name.to_string(),
                detail: format!("batch size 0 with {} configurations remaining", n - offset),
            });
        }

        let ctx = TransformContext {
            species,
            box_l: &self.box_l,
            n_configurations: n,
            offset,
        };
        let transformation_name = transformation.name().to_string();
        let transform_error = |source| EngineError::Transform {
            species: name.to_string(),
            transformation: transformation_name.clone(),
            source,
        };
        transformation.begin_species(&ctx).map_err(transform_error)?;
        if offset > 0 {
            let carried = transformation.resume_inputs();
            if !carried.is_empty() {
                let paths: Vec<_> = carried.iter().map(|p| species.path(p)).collect();
                let data = self
                    .store
                    .read(&paths, offset - 1, 1)
                    .map_err(EngineError::store(name))?
                    .into_iter()
                    .map(|(path, array)| (path.property().to_string(), array))
                    .collect();
                tracing::debug!(species = name, offset, "restoring carried state");
                transformation
                    .resume(&PropertyBatch::new(offset - 1, 1, data), &ctx)
                    .map_err(transform_error)?;
            }
        }

        let (batches, args) = DataManager::new(self.store.clone(), input_paths, plan).batch_generator();
        tracing::debug!(
            species = name,
            batch_size = args.batch_size,
            n_batches = args.n_batches,
            remainder = args.remainder,
            offset = args.offset,
            "streaming batches"
        );
        let out_species = vec![SpeciesInfo::new(
            name,
            target.n_particles,
            [output.clone()],
        )];

        let streamed = prefetch::drive(
            self.config.prefetch,
            batches,
            |items| -> Result<(usize, usize), EngineError> {
                let mut batch_count = 0;
                let mut written = 0;
                for (index, item) in items.enumerate() {
                    let batch = item.map_err(EngineError::store(name))?;
                    let start = index * args.batch_size + args.offset;
                    let data = batch
                        .data
                        .into_iter()
                        .map(|(path, array)| (path.property().to_string(), array))
                        .collect();
                    let input = PropertyBatch::new(batch.start, batch.size, data);
                    let result = transformation
                        .transform_batch(&input, &ctx)
                        .map_err(transform_error)?;

                    let expected = target.with_configurations(batch.size);
                    if result.shape() != expected {
                        return Err(EngineError::OutputShape {
                            species: name.to_string(),
                            transformation: transformation_name.clone(),
                            expected,
                            actual: result.shape(),
                        });
                    }
                    let mut chunk = TrajectoryChunkData::new(batch.size, out_species.clone());
                    chunk
                        .add_data(&result, 0, name, &output.name)
                        .map_err(|e| EngineError::store(name)(StoreError::Chunk(e)))?;
                    self.store
                        .add_data(&chunk, start)
                        .map_err(EngineError::store(name))?;
                    batch_count += 1;
                    written += batch.size;
                }
                Ok((batch_count, written))
            },
        );
        let (batch_count, written) = streamed?;

        // ── Finalize ────────────────────────────────────────────
        tracing::info!(
            species = name,
            path = %out_path,
            batches = batch_count,
            configurations = written,
            offset,
            "transformation written"
        );
        Ok(SpeciesOutcome {
            species: name.to_string(),
            status: SpeciesStatus::Processed,
            offset,
            batches: batch_count,
            configurations_written: written,
        })
    }

    fn populated_or_absent(
        &self,
        path: &DatasetPath,
        species: &str,
    ) -> Result<Option<usize>, EngineError> {
        if !self.store.check_existence(path) {
            return Ok(None);
        }
        self.store
            .populated(path)
            .map(Some)
            .map_err(EngineError::store(species))
    }

    /// Produce or extend `input` for `species` with the transformation the
    /// resolver names for it.
    ///
    /// Raw inputs have no producer: a missing one is unresolved, a short
    /// one is reported as incomplete.
    fn produce_input(
        &self,
        input: &str,
        species: &SpeciesInfo,
        populated: Option<usize>,
        guard: &mut ResolutionGuard,
        dependencies: &mut Vec<RunReport>,
    ) -> Result<(), EngineError> {
        let name = species.name.as_str();
        let n = self.n_configurations;
        let path = species.path(input);
        let all: Vec<SpeciesInfo> = self.species.values().cloned().collect();
        let kind = match (resolve(input, &self.store, &all), populated) {
            (Ok(kind), _) => kind,
            (Err(source), None) => return Err(EngineError::resolve(name)(source)),
            (Err(_), Some(populated)) => {
                return Err(EngineError::IncompleteInput {
                    species: name.to_string(),
                    path,
                    populated,
                    required: n,
                })
            }
        };
        tracing::info!(
            species = name,
            dependency = %input,
            %kind,
            populated = populated.unwrap_or(0),
            "producing input"
        );
        let mut dependency = self.registry.build(kind).map_err(EngineError::resolve(name))?;
        let report = self.run_guarded(dependency.as_mut(), std::slice::from_ref(species), guard)?;
        dependencies.push(report);

        match self.populated_or_absent(&path, name)? {
            Some(populated) if populated >= n => Ok(()),
            Some(populated) => Err(EngineError::IncompleteInput {
                species: name.to_string(),
                path,
                populated,
                required: n,
            }),
            None => Err(EngineError::Resolve {
                species: name.to_string(),
                source: ResolveError::Unresolved {
                    name: input.to_string(),
                },
            }),
        }
    }
}
