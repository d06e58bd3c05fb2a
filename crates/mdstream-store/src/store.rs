//! [`TrajectoryStore`]: validated, retrying access to a storage backend.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use mdstream_core::{
    Array3, DatasetPath, PathError, Shape, TrajectoryAccess, TrajectoryChunkData,
};

use crate::backend::{DatasetInfo, StorageBackend};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::file::FileBackend;
use crate::memory::MemoryBackend;
use crate::retry::{RetryFailure, RetryPolicy};

/// Cheaply cloneable handle to one experiment's datasets.
///
/// Clones share the backend, so a handle can be moved into a prefetch
/// worker while the driver keeps writing through another.
#[derive(Clone)]
pub struct TrajectoryStore {
    backend: Arc<dyn StorageBackend>,
    config: StoreConfig,
    retry: RetryPolicy,
}

impl fmt::Debug for TrajectoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrajectoryStore")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl TrajectoryStore {
    /// Open a file-backed store rooted at `root`, creating the directory
    /// if needed.
    pub fn open(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let backend =
            FileBackend::with_chunk_bytes(root, config.chunk_bytes).map_err(|source| {
                StoreError::Io {
                    context: root.display().to_string(),
                    source,
                }
            })?;
        tracing::info!(root = %root.display(), "opened trajectory store");
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// An empty in-memory store with default configuration.
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), StoreConfig::default())
    }

    /// Wrap an arbitrary backend.
    pub fn with_backend(backend: Arc<dyn StorageBackend>, config: StoreConfig) -> Self {
        let retry = config.retry_policy();
        Self {
            backend,
            config,
            retry,
        }
    }

    /// The same backend with a different configuration.
    ///
    /// Retry settings take effect immediately. `chunk_bytes` only applies
    /// when a file store is opened.
    pub fn with_config(self, config: StoreConfig) -> Self {
        Self::with_backend(self.backend, config)
    }

    /// The store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether a dataset exists at `path`.
    ///
    /// Backend failures are logged and reported as absence.
    pub fn check_existence(&self, path: &DatasetPath) -> bool {
        match self.backend.info(path) {
            Ok(info) => info.is_some(),
            Err(error) => {
                tracing::warn!(%path, %error, "existence check failed");
                false
            }
        }
    }

    /// Allocation state of an existing dataset.
    pub fn info(&self, path: &DatasetPath) -> Result<DatasetInfo, StoreError> {
        self.backend
            .info(path)
            .map_err(|e| classify(path, e))?
            .ok_or_else(|| StoreError::NotFound { path: path.clone() })
    }

    /// Allocated shape of a dataset.
    pub fn get_data_size(&self, path: &DatasetPath) -> Result<Shape, StoreError> {
        Ok(self.info(path)?.shape)
    }

    /// Number of configurations written contiguously from the start.
    pub fn populated(&self, path: &DatasetPath) -> Result<usize, StoreError> {
        Ok(self.info(path)?.populated)
    }

    /// Create zero-filled datasets.
    ///
    /// Every path is checked before anything is created; if any already
    /// exists, nothing is allocated.
    pub fn add_dataset(
        &self,
        datasets: impl IntoIterator<Item = (DatasetPath, Shape)>,
    ) -> Result<(), StoreError> {
        let datasets: Vec<_> = datasets.into_iter().collect();
        for (i, (path, _)) in datasets.iter().enumerate() {
            validate_path(path)?;
            let duplicate = datasets[..i].iter().any(|(p, _)| p == path);
            if duplicate || self.backend.info(path).map_err(|e| classify(path, e))?.is_some() {
                return Err(StoreError::AlreadyExists { path: path.clone() });
            }
        }
        for (path, shape) in &datasets {
            self.backend
                .create(path, *shape)
                .map_err(|e| classify(path, e))?;
            tracing::info!(%path, %shape, "allocated dataset");
        }
        Ok(())
    }

    /// Grow datasets along the configuration axis.
    ///
    /// Each request carries `(n_particles, additional_configurations,
    /// n_dims)`; the fixed axes must match what is stored. All requests
    /// are validated before any dataset is touched.
    pub fn resize_dataset(
        &self,
        datasets: impl IntoIterator<Item = (DatasetPath, Shape)>,
    ) -> Result<(), StoreError> {
        let mut plan = Vec::new();
        for (path, extra) in datasets {
            let info = self.info(&path)?;
            if !info.shape.same_rows(&extra) {
                return Err(StoreError::ShapeMismatch {
                    path,
                    stored: info.shape,
                    requested: extra,
                });
            }
            let target = info.shape.n_configurations + extra.n_configurations;
            plan.push((path, info.shape, target));
        }
        for (path, from, target) in plan {
            self.backend
                .grow(&path, target)
                .map_err(|e| classify(&path, e))?;
            tracing::info!(%path, from = from.n_configurations, to = target, "resized dataset");
        }
        Ok(())
    }

    /// Write every array of `chunk` starting at configuration `start_idx`.
    pub fn add_data(&self, chunk: &TrajectoryChunkData, start_idx: usize) -> Result<(), StoreError> {
        for (path, array) in chunk.iter() {
            self.write_array(path, array, start_idx)?;
        }
        Ok(())
    }

    /// Write one array at configuration `start_idx`.
    ///
    /// Transient lock errors are retried per [`StoreConfig`]. When the
    /// write touches or extends the populated prefix, the high-water mark
    /// advances to the end of the write.
    pub fn write_array(
        &self,
        path: &DatasetPath,
        array: &Array3,
        start_idx: usize,
    ) -> Result<(), StoreError> {
        let info = self.info(path)?;
        let shape = array.shape();
        if !info.shape.same_rows(&shape) {
            return Err(StoreError::ShapeMismatch {
                path: path.clone(),
                stored: info.shape,
                requested: shape,
            });
        }
        let end = start_idx.saturating_add(shape.n_configurations);
        if end > info.shape.n_configurations {
            return Err(StoreError::OutOfBounds {
                path: path.clone(),
                start: start_idx,
                end,
                allocated: info.shape.n_configurations,
            });
        }
        let values = array.to_configuration_major();
        self.retry
            .run(|| self.backend.write_configurations(path, start_idx, &values))
            .map_err(|f| retry_error(path, f))?;
        if start_idx <= info.populated && end > info.populated {
            self.retry
                .run(|| self.backend.set_populated(path, end))
                .map_err(|f| retry_error(path, f))?;
        }
        tracing::debug!(%path, start = start_idx, len = shape.n_configurations, "wrote configurations");
        Ok(())
    }

    /// Configurations `[start, start + len)` of one dataset.
    pub fn read_range(
        &self,
        path: &DatasetPath,
        start: usize,
        len: usize,
    ) -> Result<Array3, StoreError> {
        let info = self.info(path)?;
        let end = start.saturating_add(len);
        if end > info.shape.n_configurations {
            return Err(StoreError::OutOfBounds {
                path: path.clone(),
                start,
                end,
                allocated: info.shape.n_configurations,
            });
        }
        let values = self
            .backend
            .read_configurations(path, start, len)
            .map_err(|e| classify(path, e))?;
        Ok(Array3::from_configuration_major(
            info.shape.with_configurations(len),
            &values,
        )?)
    }

    /// Configurations `[start, start + len)` of several datasets.
    pub fn read(
        &self,
        paths: &[DatasetPath],
        start: usize,
        len: usize,
    ) -> Result<IndexMap<DatasetPath, Array3>, StoreError> {
        let mut out = IndexMap::with_capacity(paths.len());
        for path in paths {
            out.insert(path.clone(), self.read_range(path, start, len)?);
        }
        Ok(out)
    }

    /// Every dataset in the store.
    pub fn list_datasets(&self) -> Result<Vec<DatasetPath>, StoreError> {
        self.backend.list().map_err(|source| StoreError::Io {
            context: self.backend.name().to_string(),
            source,
        })
    }
}

impl TrajectoryAccess for TrajectoryStore {
    type Error = StoreError;

    fn check_existence(&self, path: &DatasetPath) -> bool {
        TrajectoryStore::check_existence(self, path)
    }

    fn get_data_size(&self, path: &DatasetPath) -> Result<Shape, StoreError> {
        TrajectoryStore::get_data_size(self, path)
    }

    fn read_range(&self, path: &DatasetPath, start: usize, len: usize) -> Result<Array3, StoreError> {
        TrajectoryStore::read_range(self, path, start, len)
    }
}

fn validate_component(component: &str, path: &DatasetPath) -> Result<(), PathError> {
    if component.is_empty() {
        return Err(PathError::EmptyComponent {
            path: path.to_string(),
        });
    }
    if component == "." || component == ".." || component.contains(['/', '\\']) {
        return Err(PathError::Malformed {
            path: path.to_string(),
        });
    }
    Ok(())
}

fn validate_path(path: &DatasetPath) -> Result<(), PathError> {
    validate_component(path.species(), path)?;
    validate_component(path.property(), path)
}

fn classify(path: &DatasetPath, error: io::Error) -> StoreError {
    match error.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound { path: path.clone() },
        io::ErrorKind::AlreadyExists => StoreError::AlreadyExists { path: path.clone() },
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => StoreError::Corrupt {
            path: path.clone(),
            detail: error.to_string(),
        },
        _ => StoreError::io(path, error),
    }
}

fn retry_error(path: &DatasetPath, failure: RetryFailure) -> StoreError {
    if failure.transient {
        StoreError::TransientIo {
            path: path.clone(),
            attempts: failure.attempts,
            source: failure.error,
        }
    } else {
        classify(path, failure.error)
    }
}
