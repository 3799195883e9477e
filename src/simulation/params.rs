//! Live-tunable simulation parameters
//!
//! Owned and written by [`ParameterPanel`](crate::ui::panel::ParameterPanel),
//! read by the particle field every frame.

/// Number of matcap variants shipped with the scene
pub const DEFAULT_VARIANT_COUNT: u32 = 8;

/// Parameters read fresh by every call to
/// [`ParticlePool::update`](super::particle_field::ParticlePool::update)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub rotation_enabled: bool,
    /// Multiplier on each entity's own rotation speed
    pub rotation_speed: f32,
    pub falling_enabled: bool,
    /// Multiplier on the base fall rate
    pub falling_speed: f32,
    /// 1-based index of the shared matcap variant
    pub active_variant: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            rotation_enabled: true,
            rotation_speed: 3.0,
            falling_enabled: true,
            falling_speed: 2.0,
            active_variant: DEFAULT_VARIANT_COUNT,
        }
    }
}
