use cgmath::{perspective, Deg, EuclideanSpace, Matrix4, Point3, Vector3};

use super::camera_utils::{CameraUniform, OPENGL_TO_WGPU_MATRIX};

/// Perspective camera looking at a target point
///
/// The projection is cached; call [`update_projection`](Self::update_projection)
/// after changing `fovy`, `aspect`, `znear` or `zfar`.
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCamera {
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    pub fn new(fovy: Deg<f32>, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            eye: Vector3::new(1.0, 1.0, 2.0),
            target: Vector3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            fovy,
            aspect,
            znear,
            zfar,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection();
        camera
    }

    pub fn with_eye(mut self, eye: Vector3<f32>) -> Self {
        self.eye = eye;
        self
    }

    /// Recomputes the projection matrix from the current parameters
    pub fn update_projection(&mut self) {
        self.projection =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    /// Matches the aspect ratio to a new viewport size
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.update_projection();
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_position: [self.eye.x, self.eye.y, self.eye.z, 1.0],
            view_proj: self.build_view_projection_matrix().into(),
            view: self.view_matrix().into(),
        }
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(Deg(75.0), 1.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cgmath::Vector4;

    /// Camera at the origin looking down -z
    fn looking_down_z(fovy: f32, aspect: f32) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(Deg(fovy), aspect, 1.0, 100.0);
        camera.eye = Vector3::new(0.0, 0.0, 0.0);
        camera.target = Vector3::new(0.0, 0.0, -1.0);
        camera
    }

    fn ndc(camera: &PerspectiveCamera, x: f32, y: f32, z: f32) -> Vector3<f32> {
        let clip = camera.build_view_projection_matrix() * Vector4::new(x, y, z, 1.0);
        clip.truncate() / clip.w
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_frustum_edges_map_to_ndc_bounds() {
        let camera = looking_down_z(90.0, 1.0);

        assert_close(ndc(&camera, 0.0, 10.0, -10.0).y, 1.0);
        assert_close(ndc(&camera, -10.0, 0.0, -10.0).x, -1.0);
        assert_close(ndc(&camera, 0.0, 0.0, -1.0).z, 0.0);
        assert_close(ndc(&camera, 0.0, 0.0, -100.0).z, 1.0);
    }

    #[test]
    fn test_depth_increases_with_distance() {
        let camera = looking_down_z(75.0, 1.0);
        let near = ndc(&camera, 0.0, 0.0, -2.0).z;
        let far = ndc(&camera, 0.0, 0.0, -50.0).z;
        assert!((0.0..1.0).contains(&near));
        assert!(near < far && far < 1.0);
    }

    #[test]
    fn test_resize_updates_aspect_and_projection() {
        let mut camera = looking_down_z(90.0, 1.0);
        camera.resize(1600, 800);
        assert_eq!(camera.aspect, 2.0);

        // twice as wide: the horizontal edge moves out to x = 2 * distance
        assert_close(ndc(&camera, 20.0, 0.0, -10.0).x, 1.0);
        assert_close(ndc(&camera, 0.0, 10.0, -10.0).y, 1.0);
    }

    #[test]
    fn test_resize_ignores_zero_size() {
        let mut camera = PerspectiveCamera::default();
        camera.resize(800, 0);
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn test_projection_is_stale_until_updated() {
        let mut camera = looking_down_z(90.0, 1.0);
        // tan(30°) * 10: top edge of a 60° frustum
        let edge = 10.0 / 3.0_f32.sqrt();

        camera.fovy = Deg(60.0);
        assert_close(ndc(&camera, 0.0, edge, -10.0).y, edge / 10.0);

        camera.update_projection();
        assert_close(ndc(&camera, 0.0, edge, -10.0).y, 1.0);
    }

    #[test]
    fn test_uniform_carries_eye() {
        let camera = PerspectiveCamera::default().with_eye(Vector3::new(0.0, 0.0, 4.0));
        let uniform = camera.uniform();
        assert_eq!(uniform.view_position, [0.0, 0.0, 4.0, 1.0]);
    }
}
