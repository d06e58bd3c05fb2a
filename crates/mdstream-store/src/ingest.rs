//! Loading trajectories from a [`TrajectoryReader`] into the store.

use mdstream_core::{DatasetPath, Shape, TrajectoryReader};

use crate::error::StoreError;
use crate::store::TrajectoryStore;

/// Summary of one [`TrajectoryStore::ingest`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestReport {
    /// Configuration index the first chunk was written at.
    pub start: usize,
    /// Configurations written.
    pub n_configurations: usize,
    /// Chunks consumed from the reader.
    pub chunks: usize,
}

impl TrajectoryStore {
    /// Consume `reader`, appending its trajectory to the store.
    ///
    /// Datasets named by the reader's metadata are created when missing
    /// and extended when present. Appending starts at the smallest
    /// populated mark among the existing datasets, so a second file of
    /// the same system continues where the first ended.
    pub fn ingest(&self, reader: &mut dyn TrajectoryReader) -> Result<IngestReport, StoreError> {
        let metadata = reader.metadata().clone();
        let shapes = metadata.dataset_shapes();

        let mut existing = Vec::with_capacity(shapes.len());
        for (path, shape) in &shapes {
            let info = if self.check_existence(path) {
                let info = self.info(path)?;
                if !info.shape.same_rows(shape) {
                    return Err(StoreError::ShapeMismatch {
                        path: path.clone(),
                        stored: info.shape,
                        requested: *shape,
                    });
                }
                Some(info)
            } else {
                None
            };
            existing.push(info);
        }
        let start = existing
            .iter()
            .flatten()
            .map(|info| info.populated)
            .min()
            .unwrap_or(0);
        let target = start + metadata.n_configurations;

        let mut create: Vec<(DatasetPath, Shape)> = Vec::new();
        let mut grow: Vec<(DatasetPath, Shape)> = Vec::new();
        for ((path, shape), info) in shapes.into_iter().zip(existing) {
            match info {
                None => create.push((path, shape.with_configurations(target))),
                Some(info) if info.shape.n_configurations < target => {
                    let extra = target - info.shape.n_configurations;
                    grow.push((path, shape.with_configurations(extra)));
                }
                Some(_) => {}
            }
        }
        self.add_dataset(create)?;
        self.resize_dataset(grow)?;

        let mut cursor = start;
        let mut chunks = 0;
        for chunk in reader.chunks() {
            let chunk = chunk?;
            self.add_data(&chunk, cursor)?;
            cursor += chunk.chunk_size();
            chunks += 1;
        }
        let written = cursor - start;
        if written != metadata.n_configurations {
            tracing::warn!(
                expected = metadata.n_configurations,
                written,
                "reader produced a different number of configurations than announced"
            );
        }
        tracing::info!(start, configurations = written, chunks, "ingested trajectory");
        Ok(IngestReport {
            start,
            n_configurations: written,
            chunks,
        })
    }
}
