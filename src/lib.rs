// src/lib.rs
//! Falling Donuts
//!
//! A field of matcap-shaded donuts that spin, fall and wrap around forever,
//! driven by a frame scheduler and tuned live from an ImGui panel. Built on
//! wgpu and winit.

pub mod app;
pub mod assets;
pub mod clock;
pub mod config;
pub mod error;
pub mod gfx;
pub mod prelude;
pub mod scheduler;
pub mod simulation;
pub mod ui;

// Re-export main types for convenience
pub use app::DonutApp;
pub use config::AppConfig;
pub use error::{DonutError, Result};

/// Creates the app with defaults and environment overrides
pub fn default() -> Result<DonutApp> {
    DonutApp::new(AppConfig::from_env())
}
