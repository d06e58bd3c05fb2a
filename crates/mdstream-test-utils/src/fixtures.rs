//! Reusable transformation fixtures.
//!
//! - [`CumulativeSum`]: running sum along the configuration axis, carried
//!   across batches.
//! - [`CopyProperty`]: copies one property to another name.
//! - [`FailingTransform`]: fails deterministically after N batches.
//!
//! Every fixture records the batches it saw in a shared [`BatchLog`] so
//! tests can assert on batch boundaries after the transformation has been
//! moved into the driver.

use std::sync::{Arc, Mutex};

use mdstream_core::{Array3, PropertyInfo};
use mdstream_transform::{
    BatchAxes, PropertyBatch, ScaleFunction, TransformContext, TransformError, Transformation,
};

/// `(species, start, size)` of every batch a fixture processed.
#[derive(Clone, Debug, Default)]
pub struct BatchLog(Arc<Mutex<Vec<(String, usize, usize)>>>);

impl BatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, species: &str, batch: &PropertyBatch) {
        self.0
            .lock()
            .unwrap()
            .push((species.to_string(), batch.start(), batch.size()));
    }

    /// Snapshot of the recorded batches.
    pub fn entries(&self) -> Vec<(String, usize, usize)> {
        self.0.lock().unwrap().clone()
    }

    /// Number of recorded batches.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Running sum over configurations: `out[p, t] = sum_{s <= t} in[p, s]`.
pub struct CumulativeSum {
    pub input: String,
    pub output: String,
    pub n_dims: usize,
    pub scale: ScaleFunction,
    pub axes: BatchAxes,
    pub log: BatchLog,
    carry: Vec<f64>,
}

impl CumulativeSum {
    pub fn new(input: impl Into<String>, output: impl Into<String>, n_dims: usize) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            n_dims,
            scale: ScaleFunction::Identity,
            axes: BatchAxes::default(),
            log: BatchLog::new(),
            carry: Vec::new(),
        }
    }

    /// Declare that the configuration axis must not be split.
    pub fn unbatchable(mut self) -> Self {
        self.axes.configurations = false;
        self
    }

    pub fn with_scale(mut self, scale: ScaleFunction) -> Self {
        self.scale = scale;
        self
    }

    /// Share an existing log.
    pub fn with_log(mut self, log: BatchLog) -> Self {
        self.log = log;
        self
    }
}

impl Transformation for CumulativeSum {
    fn name(&self) -> &str {
        "cumulative_sum"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(self.output.clone(), self.n_dims)
    }

    fn scale_function(&self) -> ScaleFunction {
        self.scale.clone()
    }

    fn batchable(&self) -> BatchAxes {
        self.axes
    }

    fn begin_species(&mut self, ctx: &TransformContext<'_>) -> Result<(), TransformError> {
        self.carry = vec![0.0; ctx.species.n_particles * self.n_dims];
        Ok(())
    }

    fn resume_inputs(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    fn resume(
        &mut self,
        previous: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        let last = previous.get_checked(&self.output, ctx.species.n_particles, self.n_dims)?;
        self.carry = last.as_slice().to_vec();
        Ok(())
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        self.log.record(&ctx.species.name, batch);
        let input = batch.get_checked(&self.input, ctx.species.n_particles, self.n_dims)?;
        let mut out = Array3::zeros(input.shape());
        for p in 0..ctx.species.n_particles {
            for c in 0..batch.size() {
                for d in 0..self.n_dims {
                    let acc = &mut self.carry[p * self.n_dims + d];
                    *acc += input.get(p, c, d);
                    out.set(p, c, d, *acc);
                }
            }
        }
        Ok(out)
    }
}

/// Copies `input` to `output` unchanged.
pub struct CopyProperty {
    pub input: String,
    pub output: String,
    pub n_dims: usize,
    pub log: BatchLog,
}

impl CopyProperty {
    pub fn new(input: impl Into<String>, output: impl Into<String>, n_dims: usize) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            n_dims,
            log: BatchLog::new(),
        }
    }
}

impl Transformation for CopyProperty {
    fn name(&self) -> &str {
        "copy_property"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(self.output.clone(), self.n_dims)
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        self.log.record(&ctx.species.name, batch);
        Ok(batch
            .get_checked(&self.input, ctx.species.n_particles, self.n_dims)?
            .clone())
    }
}

/// Returns zeros for `succeed_count` batches, then fails every batch.
pub struct FailingTransform {
    pub input: String,
    pub output: String,
    pub succeed_count: usize,
    calls: usize,
}

impl FailingTransform {
    pub fn new(input: impl Into<String>, output: impl Into<String>, succeed_count: usize) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            succeed_count,
            calls: 0,
        }
    }

    /// How many times `transform_batch()` has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Transformation for FailingTransform {
    fn name(&self) -> &str {
        "failing"
    }

    fn inputs(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn output(&self) -> PropertyInfo {
        PropertyInfo::new(self.output.clone(), 1)
    }

    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError> {
        self.calls += 1;
        if self.calls > self.succeed_count {
            return Err(TransformError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful batches",
                    self.succeed_count
                ),
            });
        }
        Ok(Array3::zeros(self.output_shape(ctx.species, batch.size())))
    }
}
