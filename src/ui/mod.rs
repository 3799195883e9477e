//! # User Interface Module
//!
//! Dear ImGui overlay for the donut field.
//!
//! - [`UiManager`] - ImGui integration with winit and wgpu
//! - [`panel`] - The parameter panel and its bounded controls
//!
//! When ImGui wants the mouse, the app stops forwarding device events to the
//! orbit controls so dragging a slider doesn't spin the camera.

pub mod manager;
pub mod panel;

// Re-export main types
pub use manager::UiManager;
pub use panel::{ParamChange, ParameterPanel, PanelStatus};
