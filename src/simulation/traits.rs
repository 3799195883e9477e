//! Core simulation trait
//!
//! Defines the interface the frame scheduler drives once per tick.

use super::params::SimulationParams;
use crate::gfx::scene::SceneBackend;

/// A per-frame simulation over scene drawables
///
/// The scheduler calls [`update`](Simulation::update) with the absolute
/// elapsed time and the live parameters, then
/// [`sync_to_scene`](Simulation::sync_to_scene) to publish the new
/// transforms.
pub trait Simulation {
    /// Advance simulation state to `elapsed` seconds
    ///
    /// # Arguments
    /// * `elapsed` - Seconds since the clock started
    /// * `params` - Live parameters, read fresh every call
    fn update(&mut self, elapsed: f64, params: &SimulationParams);

    /// Push entity transforms to their drawables
    fn sync_to_scene(&self, scene: &mut dyn SceneBackend);

    /// Scatter entities to new positions without touching their timers
    fn reset_positions(&mut self);

    /// Get simulation name for UI display
    fn name(&self) -> &str;

    /// Number of entities driven by this simulation
    fn entity_count(&self) -> usize {
        0
    }

    /// Number of entities currently in motion
    fn falling_count(&self) -> usize {
        0
    }
}
