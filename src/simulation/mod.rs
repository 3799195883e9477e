//! Simulation system
//!
//! The donut particle field, the parameters it reads every frame, and the
//! trait the frame scheduler drives it through.

pub mod params;
pub mod particle_field;
pub mod traits;

pub use params::SimulationParams;
pub use particle_field::{Entity, FieldBounds, FieldSettings, ParticlePool, ParticlePoolBuilder};
pub use traits::Simulation;
