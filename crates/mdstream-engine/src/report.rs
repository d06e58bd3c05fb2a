//! Summaries of transformation runs.

/// What happened to one species.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeciesStatus {
    /// The output was already complete; nothing was written.
    Skipped,
    /// Batches were transformed and written.
    Processed,
}

/// Outcome for one species of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeciesOutcome {
    /// Species name.
    pub species: String,
    /// Skipped or processed.
    pub status: SpeciesStatus,
    /// First configuration written.
    pub offset: usize,
    /// Batches transformed.
    pub batches: usize,
    /// Configurations written.
    pub configurations_written: usize,
}

impl SpeciesOutcome {
    pub(crate) fn skipped(species: &str) -> Self {
        Self {
            species: species.to_string(),
            status: SpeciesStatus::Skipped,
            offset: 0,
            batches: 0,
            configurations_written: 0,
        }
    }
}

/// Result of [`Experiment::run_transformation`](crate::Experiment::run_transformation).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Name of the transformation.
    pub transformation: String,
    /// Property written.
    pub output: String,
    /// Per-species outcomes in processing order.
    pub species: Vec<SpeciesOutcome>,
    /// Runs triggered to produce missing inputs, in the order they ran.
    pub dependencies: Vec<RunReport>,
}

impl RunReport {
    pub(crate) fn new(transformation: &str, output: &str) -> Self {
        Self {
            transformation: transformation.to_string(),
            output: output.to_string(),
            ..Self::default()
        }
    }

    /// Species that were processed.
    pub fn processed(&self) -> impl Iterator<Item = &SpeciesOutcome> {
        self.species
            .iter()
            .filter(|o| o.status == SpeciesStatus::Processed)
    }

    /// Species that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &SpeciesOutcome> {
        self.species
            .iter()
            .filter(|o| o.status == SpeciesStatus::Skipped)
    }

    /// Configurations written by this run, excluding dependencies.
    pub fn configurations_written(&self) -> usize {
        self.species.iter().map(|o| o.configurations_written).sum()
    }

    /// Number of dependency runs, counted recursively.
    pub fn dependency_runs(&self) -> usize {
        self.dependencies
            .iter()
            .map(|d| 1 + d.dependency_runs())
            .sum()
    }
}
