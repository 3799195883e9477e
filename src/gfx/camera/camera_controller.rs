use cgmath::{InnerSpace, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, MouseScrollDelta},
};

use super::perspective_camera::PerspectiveCamera;

/// Camera-control collaborator updated once per frame
pub trait CameraControls {
    /// Applies pending input to the camera. Returns true if the camera moved.
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitBounds {
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
}

impl Default for OrbitBounds {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 40.0,
            min_pitch: -std::f32::consts::FRAC_PI_2 + 0.001,
            max_pitch: std::f32::consts::FRAC_PI_2 - 0.001,
        }
    }
}

/// Orbit controls with inertia
///
/// Input accumulates yaw/pitch/zoom velocity; [`update`](CameraControls::update)
/// applies a fraction of it each frame and decays the rest, so the camera
/// keeps drifting briefly after the mouse is released.
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub enable_damping: bool,
    /// Fraction of the pending motion applied per frame when damping
    pub damping_factor: f32,
    pub bounds: OrbitBounds,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    is_mouse_pressed: bool,
}

impl OrbitControls {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            enable_damping: true,
            damping_factor: 0.05,
            bounds: OrbitBounds::default(),
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            is_mouse_pressed: false,
        }
    }

    /// Queue a rotation around the target, in radians
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.yaw_velocity += yaw;
        self.pitch_velocity += pitch;
    }

    /// Queue a zoom; positive moves away from the target
    pub fn zoom(&mut self, amount: f32) {
        self.zoom_velocity += amount;
    }

    pub fn process_events(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
            }
            DeviceEvent::MouseWheel { delta } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 * 0.05
                    }
                };
                self.zoom(scroll_amount * self.zoom_speed);
            }
            DeviceEvent::MouseMotion { delta } => {
                if self.is_mouse_pressed {
                    self.rotate(
                        -delta.0 as f32 * self.rotate_speed,
                        delta.1 as f32 * self.rotate_speed,
                    );
                }
            }
            _ => (),
        }
    }

    fn is_idle(&self) -> bool {
        const REST: f32 = 1e-6;
        self.yaw_velocity.abs() < REST
            && self.pitch_velocity.abs() < REST
            && self.zoom_velocity.abs() < REST
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(0.005, 0.1)
    }
}

impl CameraControls for OrbitControls {
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if self.is_idle() {
            return false;
        }

        let offset = camera.eye - camera.target;
        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return false;
        }

        let mut yaw = offset.x.atan2(offset.z);
        let mut pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        yaw += self.yaw_velocity * factor;
        pitch = (pitch + self.pitch_velocity * factor)
            .clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        let distance = (distance * (1.0 + self.zoom_velocity * factor))
            .clamp(self.bounds.min_distance, self.bounds.max_distance);

        camera.eye = camera.target
            + Vector3::new(
                distance * yaw.sin() * pitch.cos(),
                distance * pitch.sin(),
                distance * yaw.cos() * pitch.cos(),
            );

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.yaw_velocity *= decay;
            self.pitch_velocity *= decay;
            self.zoom_velocity *= decay;
        } else {
            self.yaw_velocity = 0.0;
            self.pitch_velocity = 0.0;
            self.zoom_velocity = 0.0;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::default().with_eye(Vector3::new(0.0, 0.0, 4.0))
    }

    #[test]
    fn test_idle_controls_leave_camera_alone() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        assert!(!controls.update(&mut camera));
        assert_eq!(camera.eye, Vector3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_rotation_keeps_distance() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        controls.rotate(0.5, 0.2);

        for _ in 0..10 {
            controls.update(&mut camera);
        }

        let distance = (camera.eye - camera.target).magnitude();
        assert!((distance - 4.0).abs() < 1e-4);
        assert!(camera.eye.x.abs() > 0.0);
    }

    #[test]
    fn test_damping_decays_motion() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        controls.rotate(1.0, 0.0);

        let before = camera.eye;
        controls.update(&mut camera);
        let first_step = (camera.eye - before).magnitude();

        for _ in 0..200 {
            controls.update(&mut camera);
        }
        let before = camera.eye;
        controls.update(&mut camera);
        let late_step = (camera.eye - before).magnitude();

        assert!(late_step < first_step);
    }

    #[test]
    fn test_without_damping_motion_applies_once() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        controls.enable_damping = false;
        controls.rotate(0.3, 0.0);

        assert!(controls.update(&mut camera));
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn test_zoom_respects_bounds() {
        let mut camera = camera();
        let mut controls = OrbitControls::default();
        controls.enable_damping = false;
        controls.zoom(100.0);
        controls.update(&mut camera);

        let distance = (camera.eye - camera.target).magnitude();
        assert!((distance - controls.bounds.max_distance).abs() < 1e-3);
    }
}
