//! Well-known property names used as dataset path components.
//!
//! Readers and transformations agree on these labels; anything else is
//! a free-form property recorded by a reader.

/// Wrapped particle positions (3 dims).
pub const POSITIONS: &str = "Positions";
/// Positions with periodic wraparound removed (3 dims).
pub const UNWRAPPED_POSITIONS: &str = "Unwrapped_Positions";
/// Periodic image counters per particle (3 dims).
pub const BOX_IMAGES: &str = "Box_Images";
/// Particle velocities (3 dims).
pub const VELOCITIES: &str = "Velocities";
/// Particle forces (3 dims).
pub const FORCES: &str = "Forces";
/// Per-particle kinetic energy (1 dim).
pub const KINETIC_ENERGY: &str = "KE";
/// Per-particle potential energy (1 dim).
pub const POTENTIAL_ENERGY: &str = "PE";
/// Per-particle stress tensor, Voigt order (6 dims).
pub const STRESS: &str = "Stress";
/// Charge-weighted sum of unwrapped positions (3 dims, reduced).
pub const TRANSLATIONAL_DIPOLE_MOMENT: &str = "Translational_Dipole_Moment";
/// Charge-weighted sum of velocities (3 dims, reduced).
pub const IONIC_CURRENT: &str = "Ionic_Current";
/// Energy-weighted sum of unwrapped positions (3 dims, reduced).
pub const INTEGRATED_HEAT_CURRENT: &str = "Integrated_Heat_Current";
/// Sum of off-diagonal stress components (3 dims, reduced).
pub const MOMENTUM_FLUX: &str = "Momentum_Flux";
/// Heat flux from per-particle energies and stress (3 dims, reduced).
pub const THERMAL_FLUX: &str = "Thermal_Flux";
/// Integrated heat current including the stress work term (3 dims, reduced).
pub const KINACI_HEAT_CURRENT: &str = "Kinaci_Heat_Current";
