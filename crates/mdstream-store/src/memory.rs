//! In-process backend with the same dataset model as [`FileBackend`](crate::FileBackend).

use std::io;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use mdstream_core::{DatasetPath, Shape};

use crate::backend::{DatasetInfo, StorageBackend};

#[derive(Debug)]
struct MemDataset {
    shape: Shape,
    populated: usize,
    // Configuration-major.
    values: Vec<f64>,
}

impl MemDataset {
    fn range(&self, start: usize, len: usize) -> io::Result<std::ops::Range<usize>> {
        let end = start.saturating_add(len);
        if end > self.shape.n_configurations {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "configurations {start}..{end} exceed allocated length {}",
                    self.shape.n_configurations
                ),
            ));
        }
        let per_config = self.shape.values_per_configuration();
        Ok(start * per_config..end * per_config)
    }
}

/// Keeps datasets in memory. Dataset order is creation order.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    datasets: RwLock<IndexMap<DatasetPath, MemDataset>>,
}

fn not_found(path: &DatasetPath) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("dataset '{path}' not found"))
}

impl MemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<DatasetPath, MemDataset>> {
        self.datasets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<DatasetPath, MemDataset>> {
        self.datasets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn info(&self, path: &DatasetPath) -> io::Result<Option<DatasetInfo>> {
        Ok(self.read().get(path).map(|d| DatasetInfo {
            shape: d.shape,
            populated: d.populated,
        }))
    }

    fn create(&self, path: &DatasetPath, shape: Shape) -> io::Result<()> {
        let mut datasets = self.write();
        if datasets.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("dataset '{path}' already exists"),
            ));
        }
        datasets.insert(
            path.clone(),
            MemDataset {
                shape,
                populated: 0,
                values: vec![0.0; shape.len()],
            },
        );
        Ok(())
    }

    fn grow(&self, path: &DatasetPath, n_configurations: usize) -> io::Result<()> {
        let mut datasets = self.write();
        let dataset = datasets.get_mut(path).ok_or_else(|| not_found(path))?;
        if n_configurations < dataset.shape.n_configurations {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot shrink a dataset",
            ));
        }
        dataset.shape = dataset.shape.with_configurations(n_configurations);
        dataset.values.resize(dataset.shape.len(), 0.0);
        Ok(())
    }

    fn read_configurations(
        &self,
        path: &DatasetPath,
        start: usize,
        len: usize,
    ) -> io::Result<Vec<f64>> {
        let datasets = self.read();
        let dataset = datasets.get(path).ok_or_else(|| not_found(path))?;
        let range = dataset.range(start, len)?;
        Ok(dataset.values[range].to_vec())
    }

    fn write_configurations(
        &self,
        path: &DatasetPath,
        start: usize,
        values: &[f64],
    ) -> io::Result<()> {
        let mut datasets = self.write();
        let dataset = datasets.get_mut(path).ok_or_else(|| not_found(path))?;
        let per_config = dataset.shape.values_per_configuration();
        if per_config == 0 {
            return Ok(());
        }
        if values.len() % per_config != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "partial configuration",
            ));
        }
        let range = dataset.range(start, values.len() / per_config)?;
        dataset.values[range].copy_from_slice(values);
        Ok(())
    }

    fn set_populated(&self, path: &DatasetPath, populated: usize) -> io::Result<()> {
        let mut datasets = self.write();
        let dataset = datasets.get_mut(path).ok_or_else(|| not_found(path))?;
        dataset.range(0, populated)?;
        dataset.populated = populated;
        Ok(())
    }

    fn list(&self) -> io::Result<Vec<DatasetPath>> {
        Ok(self.read().keys().cloned().collect())
    }
}
