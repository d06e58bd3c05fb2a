//! The closed set of transformations the resolver can schedule.

use std::fmt;

use mdstream_core::names;

/// Identifies a transformation implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformKind {
    /// Unwrap positions using stored periodic image counts.
    UnwrapViaIndices,
    /// Unwrap positions by detecting box crossings between configurations.
    UnwrapCoordinates,
    /// Charge-weighted sum of unwrapped positions.
    TranslationalDipoleMoment,
    /// Charge-weighted sum of velocities.
    IonicCurrent,
    /// Energy-weighted sum of unwrapped positions.
    IntegratedHeatCurrent,
    /// Sum of off-diagonal stress components.
    MomentumFlux,
    /// Convective minus stress-work heat flux.
    ThermalFlux,
    /// Energy-weighted positions minus the time-integrated stress work.
    KinaciIntegratedHeatCurrent,
}

impl TransformKind {
    /// Every kind, in declaration order.
    pub const ALL: [TransformKind; 8] = [
        TransformKind::UnwrapViaIndices,
        TransformKind::UnwrapCoordinates,
        TransformKind::TranslationalDipoleMoment,
        TransformKind::IonicCurrent,
        TransformKind::IntegratedHeatCurrent,
        TransformKind::MomentumFlux,
        TransformKind::ThermalFlux,
        TransformKind::KinaciIntegratedHeatCurrent,
    ];

    /// Stable name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            TransformKind::UnwrapViaIndices => "UnwrapViaIndices",
            TransformKind::UnwrapCoordinates => "UnwrapCoordinates",
            TransformKind::TranslationalDipoleMoment => "TranslationalDipoleMoment",
            TransformKind::IonicCurrent => "IonicCurrent",
            TransformKind::IntegratedHeatCurrent => "IntegratedHeatCurrent",
            TransformKind::MomentumFlux => "MomentumFlux",
            TransformKind::ThermalFlux => "ThermalFlux",
            TransformKind::KinaciIntegratedHeatCurrent => "KinaciIntegratedHeatCurrent",
        }
    }

    /// Property written by this kind.
    pub fn output_property(self) -> &'static str {
        match self {
            TransformKind::UnwrapViaIndices | TransformKind::UnwrapCoordinates => {
                names::UNWRAPPED_POSITIONS
            }
            TransformKind::TranslationalDipoleMoment => names::TRANSLATIONAL_DIPOLE_MOMENT,
            TransformKind::IonicCurrent => names::IONIC_CURRENT,
            TransformKind::IntegratedHeatCurrent => names::INTEGRATED_HEAT_CURRENT,
            TransformKind::MomentumFlux => names::MOMENTUM_FLUX,
            TransformKind::ThermalFlux => names::THERMAL_FLUX,
            TransformKind::KinaciIntegratedHeatCurrent => names::KINACI_HEAT_CURRENT,
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
