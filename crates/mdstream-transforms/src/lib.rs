//! Built-in transformations.
//!
//! | Output property                 | Transformation                  | Inputs                          |
//! |---------------------------------|---------------------------------|---------------------------------|
//! | `Unwrapped_Positions`           | [`UnwrapViaIndices`]            | `Positions`, `Box_Images`       |
//! | `Unwrapped_Positions`           | [`UnwrapCoordinates`]           | `Positions`                     |
//! | `Translational_Dipole_Moment`   | [`TranslationalDipoleMoment`]   | `Unwrapped_Positions`           |
//! | `Ionic_Current`                 | [`IonicCurrent`]                | `Velocities`                    |
//! | `Integrated_Heat_Current`       | [`IntegratedHeatCurrent`]       | `Unwrapped_Positions`, `KE`, `PE` |
//! | `Momentum_Flux`                 | [`MomentumFlux`]                | `Stress`                        |
//! | `Thermal_Flux`                  | [`ThermalFlux`]                 | `Stress`, `Velocities`, `KE`, `PE` |
//! | `Kinaci_Heat_Current`           | [`KinaciIntegratedHeatCurrent`] | `Unwrapped_Positions`, `Velocities`, `Stress`, `KE`, `PE` |
//!
//! [`default_registry`] wires every one of them to its [`TransformKind`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod dipole;
pub mod heat_current;
pub mod ionic_current;
pub mod kinaci_heat_current;
pub mod momentum_flux;
mod sum;
pub mod thermal_flux;
pub mod unwrap_coordinates;
pub mod unwrap_indices;

pub use dipole::TranslationalDipoleMoment;
pub use heat_current::IntegratedHeatCurrent;
pub use ionic_current::IonicCurrent;
pub use kinaci_heat_current::KinaciIntegratedHeatCurrent;
pub use momentum_flux::MomentumFlux;
pub use thermal_flux::ThermalFlux;
pub use unwrap_coordinates::UnwrapCoordinates;
pub use unwrap_indices::UnwrapViaIndices;

use mdstream_transform::{Registry, TransformKind};

/// A registry with a constructor for every [`TransformKind`].
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(TransformKind::UnwrapViaIndices, || Box::new(UnwrapViaIndices))
        .register(TransformKind::UnwrapCoordinates, || {
            Box::new(UnwrapCoordinates::new())
        })
        .register(TransformKind::TranslationalDipoleMoment, || {
            Box::new(TranslationalDipoleMoment)
        })
        .register(TransformKind::IonicCurrent, || Box::new(IonicCurrent))
        .register(TransformKind::IntegratedHeatCurrent, || {
            Box::new(IntegratedHeatCurrent)
        })
        .register(TransformKind::MomentumFlux, || Box::new(MomentumFlux))
        .register(TransformKind::ThermalFlux, || Box::new(ThermalFlux::new()))
        .register(TransformKind::KinaciIntegratedHeatCurrent, || {
            Box::new(KinaciIntegratedHeatCurrent::new())
        });
    registry
}
