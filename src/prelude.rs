//! # Prelude
//!
//! Commonly used types for driving the donut field, headless or windowed.
//!
//! ```no_run
//! use donut_field::prelude::*;
//!
//! let mut pool = ParticlePool::builder().with_count(10).with_seed(1).build();
//! let clock = ManualClock::new();
//! clock.advance(0.5);
//! pool.update(clock.elapsed(), &SimulationParams::default());
//! ```

// Re-export core application types
pub use crate::app::DonutApp;
pub use crate::config::AppConfig;
pub use crate::error::{DonutError, Result};

// Time and scheduling
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::scheduler::{
    CancellationToken, FrameContext, FrameScheduler, RedrawTarget, SchedulerState, TickOutcome,
};

// Simulation
pub use crate::simulation::{
    FieldSettings, ParticlePool, ParticlePoolBuilder, Simulation, SimulationParams,
};

// Graphics and scene types
pub use crate::gfx::camera::{CameraControls, OrbitControls, PerspectiveCamera};
pub use crate::gfx::geometry::{generate_torus, GeometryData};
pub use crate::gfx::scene::{shared_material, Scene, SceneBackend, SharedMaterial, VariantHandle};

// UI
pub use crate::ui::{ParamChange, ParameterPanel};
