//! The [`Transformation`] trait and the values passed to it.

use indexmap::IndexMap;
use mdstream_core::{Array3, PropertyInfo, Shape, SpeciesInfo};

use crate::error::TransformError;
use crate::scale::ScaleFunction;

/// Axes along which a transformation's input may be split into batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchAxes {
    /// Configurations (time) may be split.
    pub configurations: bool,
    /// Particles may be split.
    pub particles: bool,
}

impl Default for BatchAxes {
    fn default() -> Self {
        Self {
            configurations: true,
            particles: true,
        }
    }
}

/// Experiment facts a transformation may consult for the current species.
#[derive(Clone, Copy, Debug)]
pub struct TransformContext<'a> {
    /// The species being processed.
    pub species: &'a SpeciesInfo,
    /// Simulation box lengths, one per spatial dimension.
    pub box_l: &'a [f64],
    /// Total configurations in the experiment.
    pub n_configurations: usize,
    /// First configuration computed by this run. Non-zero when a partial
    /// output is being extended.
    pub offset: usize,
}

/// One batch of input data, keyed by property name.
///
/// Arrays are shaped `[n_particles, size, n_dims]` and cover
/// configurations `[start, start + size)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyBatch {
    start: usize,
    size: usize,
    data: IndexMap<String, Array3>,
}

impl PropertyBatch {
    /// Assemble a batch.
    pub fn new(start: usize, size: usize, data: IndexMap<String, Array3>) -> Self {
        Self { start, size, data }
    }

    /// First configuration covered.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Configurations covered.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The array for `property`.
    pub fn get(&self, property: &str) -> Result<&Array3, TransformError> {
        self.data
            .get(property)
            .ok_or_else(|| TransformError::MissingInput {
                property: property.to_string(),
            })
    }

    /// The array for `property`, checked against `[n_particles, size, n_dims]`.
    pub fn get_checked(
        &self,
        property: &str,
        n_particles: usize,
        n_dims: usize,
    ) -> Result<&Array3, TransformError> {
        let array = self.get(property)?;
        let expected = Shape::new(n_particles, self.size, n_dims);
        if array.shape() != expected {
            return Err(TransformError::ShapeMismatch {
                property: property.to_string(),
                expected,
                actual: array.shape(),
            });
        }
        Ok(array)
    }

    /// Iterate `(property, array)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array3)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Derives one per-species property from others, one batch at a time.
///
/// # Contract
///
/// - `inputs()` and `output()` are fixed for the lifetime of the value.
/// - `begin_species()` is called before the first batch of every species
///   and must discard any state carried from a previous species.
/// - Batches of one species arrive in configuration order; state carried
///   between them (running sums, image counters) is the implementor's.
/// - When a run continues a partial output (`ctx.offset > 0`), `resume()`
///   is called after `begin_species()` with the values at configuration
///   `ctx.offset - 1`, so carried state matches an uninterrupted run.
/// - `transform_batch()` returns exactly
///   `[output_particles(species), batch.size(), output().n_dims]`.
///
/// # Examples
///
/// ```
/// use indexmap::IndexMap;
/// use mdstream_core::{Array3, PropertyInfo, Shape, SpeciesInfo};
/// use mdstream_transform::{PropertyBatch, TransformContext, TransformError, Transformation};
///
/// struct Doubled;
///
/// impl Transformation for Doubled {
///     fn name(&self) -> &str { "doubled" }
///     fn inputs(&self) -> Vec<String> { vec!["KE".into()] }
///     fn output(&self) -> PropertyInfo { PropertyInfo::new("KE_x2", 1) }
///
///     fn transform_batch(
///         &mut self,
///         batch: &PropertyBatch,
///         _ctx: &TransformContext<'_>,
///     ) -> Result<Array3, TransformError> {
///         let mut out = batch.get("KE")?.clone();
///         out.as_mut_slice().iter_mut().for_each(|v| *v *= 2.0);
///         Ok(out)
///     }
/// }
///
/// let species = SpeciesInfo::new("Na", 1, [PropertyInfo::new("KE", 1)]);
/// let ctx = TransformContext { species: &species, box_l: &[], n_configurations: 2, offset: 0 };
/// let mut data = IndexMap::new();
/// data.insert("KE".to_string(), Array3::from_vec(Shape::new(1, 2, 1), vec![1.0, 2.0]).unwrap());
/// let out = Doubled.transform_batch(&PropertyBatch::new(0, 2, data), &ctx).unwrap();
/// assert_eq!(out.as_slice(), &[2.0, 4.0]);
/// ```
pub trait Transformation: Send {
    /// Human-readable name for logs and errors.
    fn name(&self) -> &str;

    /// Property names read from the species, species-unqualified.
    fn inputs(&self) -> Vec<String>;

    /// The property written, with its per-particle dimensionality.
    fn output(&self) -> PropertyInfo;

    /// Working memory relative to input size. Default: identity.
    fn scale_function(&self) -> ScaleFunction {
        ScaleFunction::Identity
    }

    /// Axes the input may be split along. Default: both.
    fn batchable(&self) -> BatchAxes {
        BatchAxes::default()
    }

    /// Rows of the output dataset. Default: one per particle.
    ///
    /// Collective quantities (currents, dipole moments) return 1.
    fn output_particles(&self, species: &SpeciesInfo) -> usize {
        species.n_particles
    }

    /// Reset per-species state.
    fn begin_species(&mut self, _ctx: &TransformContext<'_>) -> Result<(), TransformError> {
        Ok(())
    }

    /// Properties needed to restore carried state when extending a partial
    /// output. May include the output itself. Default: none (stateless).
    fn resume_inputs(&self) -> Vec<String> {
        Vec::new()
    }

    /// Restore carried state from `previous`, a one-configuration batch
    /// holding [`resume_inputs`](Self::resume_inputs) at `ctx.offset - 1`.
    fn resume(
        &mut self,
        _previous: &PropertyBatch,
        _ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        Ok(())
    }

    /// Compute the output for one batch.
    fn transform_batch(
        &mut self,
        batch: &PropertyBatch,
        ctx: &TransformContext<'_>,
    ) -> Result<Array3, TransformError>;

    /// Shape of the output for `len` configurations of `species`.
    fn output_shape(&self, species: &SpeciesInfo, len: usize) -> Shape {
        Shape::new(self.output_particles(species), len, self.output().n_dims)
    }
}
