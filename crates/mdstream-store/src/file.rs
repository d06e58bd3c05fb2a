//! Zarr V3 backend on a local filesystem.
//!
//! Every dataset is one zarr array at `<root>/<species>/<property>/`,
//! stored `[n_configurations, n_particles, n_dims]` in C order so that a
//! configuration range is a contiguous subset. Chunks span whole
//! configurations and grow along the configuration axis only. The
//! populated high-water mark is kept in the array attributes.
//!
//! ```text
//! <root>/
//! +-- zarr.json             root group
//! +-- Na/
//!     +-- Positions/
//!         +-- zarr.json     shape, chunking, {"populated": n}
//!         +-- c/0/0/0
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mdstream_core::{DatasetPath, Shape};
use serde_json::{json, Value};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableWritableListableStorage, ReadableWritableListableStorageTraits};

use crate::backend::{DatasetInfo, StorageBackend};

/// Name of the zarr metadata document inside every node directory.
pub const METADATA_FILE: &str = "zarr.json";

/// Array attribute holding the populated high-water mark.
pub const POPULATED_ATTRIBUTE: &str = "populated";

/// Default target size of one chunk.
pub const DEFAULT_CHUNK_BYTES: usize = 1 << 20;

const DIMENSIONS: [&str; 3] = ["configuration", "particle", "dim"];

type ZarrArray = Array<dyn ReadableWritableListableStorageTraits>;

/// Stores every dataset as a chunked zarr array under a root directory.
pub struct FileBackend {
    root: PathBuf,
    store: ReadableWritableListableStorage,
    chunk_bytes: usize,
    // Serialises mutations issued through this handle.
    write_lock: Mutex<()>,
}

impl fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBackend")
            .field("root", &self.root)
            .field("chunk_bytes", &self.chunk_bytes)
            .finish()
    }
}

fn other(error: impl std::error::Error + Send + Sync + 'static) -> io::Error {
    io::Error::other(error)
}

fn invalid_data(detail: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, detail.into())
}

impl FileBackend {
    /// Open (creating if needed) a store rooted at `root` with
    /// [`DEFAULT_CHUNK_BYTES`] chunks.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_chunk_bytes(root, DEFAULT_CHUNK_BYTES)
    }

    /// Open a store whose new datasets use chunks of about `chunk_bytes`.
    ///
    /// A chunk always holds at least one whole configuration.
    pub fn with_chunk_bytes(root: impl AsRef<Path>, chunk_bytes: usize) -> io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let store: ReadableWritableListableStorage =
            Arc::new(FilesystemStore::new(&root).map_err(other)?);
        if !root.join(METADATA_FILE).is_file() {
            GroupBuilder::new()
                .build(store.clone(), "/")
                .map_err(other)?
                .store_metadata()
                .map_err(other)?;
        }
        Ok(Self {
            root,
            store,
            chunk_bytes,
            write_lock: Mutex::new(()),
        })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the array behind `path`.
    pub fn array_dir(&self, path: &DatasetPath) -> PathBuf {
        self.root.join(path.species()).join(path.property())
    }

    /// Configurations per chunk for a dataset of the given shape.
    pub fn chunk_configurations(&self, shape: &Shape) -> u64 {
        let per_config = shape.bytes_per_configuration().max(1);
        (self.chunk_bytes / per_config).max(1) as u64
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn exists(&self, path: &DatasetPath) -> bool {
        self.array_dir(path).join(METADATA_FILE).is_file()
    }

    fn open_array(&self, path: &DatasetPath) -> io::Result<ZarrArray> {
        if !self.exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("dataset '{path}' not found"),
            ));
        }
        Array::open(self.store.clone(), &node_path(path))
            .map_err(|e| invalid_data(format!("cannot open array: {e}")))
    }

    fn build_array(&self, path: &DatasetPath, shape: Shape) -> io::Result<()> {
        let mut attributes = serde_json::Map::new();
        attributes.insert(POPULATED_ATTRIBUTE.to_string(), json!(0));
        attributes.insert("_ARRAY_DIMENSIONS".to_string(), json!(DIMENSIONS));
        let chunks = vec![
            self.chunk_configurations(&shape),
            shape.n_particles.max(1) as u64,
            shape.n_dims.max(1) as u64,
        ];
        let mut builder = ArrayBuilder::new(
            zarr_shape(&shape),
            chunks,
            DataType::Float64,
            FillValue::from(0.0f64),
        );
        builder.attributes(attributes);
        builder.dimension_names(Some(
            DIMENSIONS.iter().map(|d| Some(d.to_string())).collect::<Vec<_>>(),
        ));
        builder
            .build(self.store.clone(), &node_path(path))
            .map_err(other)?
            .store_metadata()
            .map_err(other)
    }
}

fn node_path(path: &DatasetPath) -> String {
    format!("/{}/{}", path.species(), path.property())
}

fn zarr_shape(shape: &Shape) -> Vec<u64> {
    vec![
        shape.n_configurations as u64,
        shape.n_particles as u64,
        shape.n_dims as u64,
    ]
}

fn dataset_info(array: &ZarrArray) -> io::Result<DatasetInfo> {
    let dims: Vec<usize> = array
        .shape()
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<Result<_, _>>()
        .map_err(|_| invalid_data("array extent does not fit in usize"))?;
    let [n_configurations, n_particles, n_dims] = dims[..] else {
        return Err(invalid_data(format!("expected a 3-d array, found {}-d", dims.len())));
    };
    let populated = array
        .attributes()
        .get(POPULATED_ATTRIBUTE)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| invalid_data(format!("missing '{POPULATED_ATTRIBUTE}' attribute")))?;
    if populated > n_configurations {
        return Err(invalid_data(format!(
            "populated {populated} exceeds allocated {n_configurations}"
        )));
    }
    Ok(DatasetInfo {
        shape: Shape::new(n_particles, n_configurations, n_dims),
        populated,
    })
}

fn check_range(shape: &Shape, start: usize, len: usize) -> io::Result<()> {
    let end = start.saturating_add(len);
    if end > shape.n_configurations {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "configurations {start}..{end} exceed allocated length {}",
                shape.n_configurations
            ),
        ));
    }
    Ok(())
}

fn configurations_in(shape: &Shape, values: &[f64]) -> io::Result<usize> {
    let per_config = shape.values_per_configuration();
    if per_config == 0 {
        return Ok(0);
    }
    if values.len() % per_config != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} values is not a whole number of {per_config}-value configurations",
                values.len()
            ),
        ));
    }
    Ok(values.len() / per_config)
}

fn window(shape: &Shape, start: usize, len: usize) -> ArraySubset {
    ArraySubset::new_with_ranges(&[
        start as u64..(start + len) as u64,
        0..shape.n_particles as u64,
        0..shape.n_dims as u64,
    ])
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &str {
        "zarr"
    }

    fn info(&self, path: &DatasetPath) -> io::Result<Option<DatasetInfo>> {
        if !self.exists(path) {
            return Ok(None);
        }
        dataset_info(&self.open_array(path)?).map(Some)
    }

    fn create(&self, path: &DatasetPath, shape: Shape) -> io::Result<()> {
        let _guard = self.guard();
        if self.exists(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("dataset '{path}' already exists"),
            ));
        }
        let result = self.build_array(path, shape);
        if result.is_err() {
            let dir = self.array_dir(path);
            if let Err(error) = fs::remove_dir_all(&dir) {
                if error.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(dir = %dir.display(), %error, "failed to clean up partial dataset");
                }
            }
        }
        result
    }

    fn grow(&self, path: &DatasetPath, n_configurations: usize) -> io::Result<()> {
        let _guard = self.guard();
        let mut array = self.open_array(path)?;
        let info = dataset_info(&array)?;
        if n_configurations < info.shape.n_configurations {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot shrink from {} to {n_configurations} configurations",
                    info.shape.n_configurations
                ),
            ));
        }
        array
            .set_shape(zarr_shape(&info.shape.with_configurations(n_configurations)))
            .map_err(other)?;
        array.store_metadata().map_err(other)
    }

    fn read_configurations(
        &self,
        path: &DatasetPath,
        start: usize,
        len: usize,
    ) -> io::Result<Vec<f64>> {
        let array = self.open_array(path)?;
        let shape = dataset_info(&array)?.shape;
        check_range(&shape, start, len)?;
        if len == 0 || shape.values_per_configuration() == 0 {
            return Ok(Vec::new());
        }
        array
            .retrieve_array_subset_elements::<f64>(&window(&shape, start, len))
            .map_err(other)
    }

    fn write_configurations(
        &self,
        path: &DatasetPath,
        start: usize,
        values: &[f64],
    ) -> io::Result<()> {
        let _guard = self.guard();
        let array = self.open_array(path)?;
        let shape = dataset_info(&array)?.shape;
        let len = configurations_in(&shape, values)?;
        check_range(&shape, start, len)?;
        if len == 0 {
            return Ok(());
        }
        array
            .store_array_subset_elements::<f64>(&window(&shape, start, len), values)
            .map_err(other)
    }

    fn set_populated(&self, path: &DatasetPath, populated: usize) -> io::Result<()> {
        let _guard = self.guard();
        let mut array = self.open_array(path)?;
        let shape = dataset_info(&array)?.shape;
        check_range(&shape, 0, populated)?;
        array
            .attributes_mut()
            .insert(POPULATED_ATTRIBUTE.to_string(), json!(populated));
        array.store_metadata().map_err(other)
    }

    fn list(&self) -> io::Result<Vec<DatasetPath>> {
        let mut out = Vec::new();
        for species in fs::read_dir(&self.root)? {
            let species = species?;
            if !species.file_type()?.is_dir() {
                continue;
            }
            let species_name = species.file_name().to_string_lossy().into_owned();
            for property in fs::read_dir(species.path())? {
                let property = property?;
                if !property.path().join(METADATA_FILE).is_file() {
                    continue;
                }
                let property_name = property.file_name().to_string_lossy().into_owned();
                out.push(DatasetPath::new(species_name.clone(), property_name));
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, FileBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        (dir, backend)
    }

    #[test]
    fn create_writes_metadata_and_reads_zeros() {
        let (_dir, b) = backend();
        let path = DatasetPath::new("Na", "Positions");
        b.create(&path, Shape::new(2, 3, 3)).unwrap();
        assert!(b.array_dir(&path).join(METADATA_FILE).is_file());
        assert_eq!(
            b.info(&path).unwrap(),
            Some(DatasetInfo {
                shape: Shape::new(2, 3, 3),
                populated: 0
            })
        );
        assert!(b
            .read_configurations(&path, 0, 3)
            .unwrap()
            .iter()
            .all(|&v| v == 0.0));
    }

    #[test]
    fn create_twice_is_already_exists() {
        let (_dir, b) = backend();
        let path = DatasetPath::new("Na", "KE");
        b.create(&path, Shape::new(1, 1, 1)).unwrap();
        let err = b.create(&path, Shape::new(1, 1, 1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn failed_create_leaves_nothing_behind() {
        let (_dir, b) = backend();
        let path = DatasetPath::new("Na", "KE");
        // A directory where the metadata document belongs makes the write fail.
        fs::create_dir_all(b.array_dir(&path).join(METADATA_FILE)).unwrap();
        assert!(b.create(&path, Shape::new(1, 4, 1)).is_err());
        assert!(!b.array_dir(&path).exists());
        assert_eq!(b.info(&path).unwrap(), None);

        b.create(&path, Shape::new(1, 4, 1)).unwrap();
        assert_eq!(b.info(&path).unwrap().unwrap().shape, Shape::new(1, 4, 1));
    }

    #[test]
    fn writes_span_chunk_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        // 2 particles x 1 dim x 8 bytes = 16 bytes per configuration, so 3 per chunk.
        let b = FileBackend::with_chunk_bytes(dir.path(), 48).unwrap();
        let path = DatasetPath::new("Na", "KE");
        let shape = Shape::new(2, 10, 1);
        assert_eq!(b.chunk_configurations(&shape), 3);
        b.create(&path, shape).unwrap();

        let values: Vec<f64> = (0..14).map(f64::from).collect();
        b.write_configurations(&path, 2, &values).unwrap();
        let back = b.read_configurations(&path, 0, 10).unwrap();
        assert_eq!(&back[..4], &[0.0; 4]);
        assert_eq!(&back[4..18], values.as_slice());
        assert_eq!(&back[18..], &[0.0; 2]);
    }

    #[test]
    fn grow_preserves_existing_values() {
        let (_dir, b) = backend();
        let path = DatasetPath::new("Na", "KE");
        b.create(&path, Shape::new(2, 2, 1)).unwrap();
        b.write_configurations(&path, 0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        b.set_populated(&path, 2).unwrap();
        b.grow(&path, 5).unwrap();
        let info = b.info(&path).unwrap().unwrap();
        assert_eq!(info.shape, Shape::new(2, 5, 1));
        assert_eq!(info.populated, 2);
        assert_eq!(
            b.read_configurations(&path, 0, 5).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn populated_mark_is_an_array_attribute() {
        let (_dir, b) = backend();
        let path = DatasetPath::new("Cl", "Velocities");
        b.create(&path, Shape::new(1, 6, 3)).unwrap();
        b.set_populated(&path, 4).unwrap();

        let text = fs::read_to_string(b.array_dir(&path).join(METADATA_FILE)).unwrap();
        let metadata: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(metadata["attributes"][POPULATED_ATTRIBUTE], json!(4));
        assert!(b.set_populated(&path, 7).is_err());
    }

    #[test]
    fn write_past_allocation_is_rejected() {
        let (_dir, b) = backend();
        let path = DatasetPath::new("Na", "KE");
        b.create(&path, Shape::new(1, 2, 1)).unwrap();
        let err = b.write_configurations(&path, 1, &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn list_is_sorted_and_skips_foreign_entries() {
        let (dir, b) = backend();
        b.create(&DatasetPath::new("Na", "Velocities"), Shape::new(1, 1, 3)).unwrap();
        b.create(&DatasetPath::new("Cl", "Positions"), Shape::new(1, 1, 3)).unwrap();
        fs::write(dir.path().join("Na").join("notes.txt"), "x").unwrap();
        fs::create_dir_all(dir.path().join("Na").join("scratch")).unwrap();
        fs::write(dir.path().join("README"), "x").unwrap();
        assert_eq!(
            b.list().unwrap(),
            vec![
                DatasetPath::new("Cl", "Positions"),
                DatasetPath::new("Na", "Velocities"),
            ]
        );
    }

    #[test]
    fn missing_dataset_has_no_info() {
        let (_dir, b) = backend();
        assert_eq!(b.info(&DatasetPath::new("Na", "KE")).unwrap(), None);
    }
}
