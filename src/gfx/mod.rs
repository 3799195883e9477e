//! # Graphics Module
//!
//! Everything between the particle field and the screen:
//!
//! - **Scene** ([`scene`]) - CPU-side drawables and the shared matcap material
//! - **Camera** ([`camera`]) - Perspective camera and damped orbit controls
//! - **Geometry** ([`geometry`]) - Procedural torus mesh
//! - **Rendering** ([`render_engine`]) - Instanced matcap renderer on wgpu
//!
//! The simulation only sees [`scene::SceneBackend`]; nothing in the core
//! depends on wgpu.

pub mod camera;
pub mod geometry;
pub mod render_engine;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use camera::{OrbitControls, PerspectiveCamera};
pub use render_engine::RenderEngine;
pub use scene::Scene;
