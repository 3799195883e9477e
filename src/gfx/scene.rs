//! # Scene Storage
//!
//! CPU-side store of drawables, geometries and the shared matcap material.
//! The particle field talks to it only through [`SceneBackend`]; the render
//! engine reads it back each frame to build instance buffers.

use cgmath::{Matrix4, Rad, Vector3, Zero};
use std::cell::RefCell;
use std::rc::Rc;

use super::geometry::GeometryData;

/// Opaque handle to one loaded matcap texture (0-based slot in the renderer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantHandle(pub u32);

/// Geometry registered with [`Scene::add_geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(pub usize);

/// Drawable created with [`SceneBackend::create_drawable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableHandle(usize);

impl DrawableHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Matcap material shared by every drawable that references it
#[derive(Debug, Clone, PartialEq)]
pub struct MatcapMaterial {
    pub name: String,
    pub matcap: VariantHandle,
}

/// One material instance, many readers
pub type SharedMaterial = Rc<RefCell<MatcapMaterial>>;

/// Wraps a material so it can be handed out to many drawables
pub fn shared_material(name: &str, matcap: VariantHandle) -> SharedMaterial {
    Rc::new(RefCell::new(MatcapMaterial {
        name: name.to_string(),
        matcap,
    }))
}

/// Position, Euler rotation (radians, XYZ order) and per-axis scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            rotation: Vector3::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Model matrix: T * Rx * Ry * Rz * S
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.position);
        let r = Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z));
        let s = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        t * r * s
    }
}

/// A geometry/material pair placed in the world
pub struct Drawable {
    pub geometry: GeometryId,
    pub material: SharedMaterial,
    pub transform: Transform,
    pub in_scene: bool,
}

/// Capabilities the particle field needs from the scene graph
pub trait SceneBackend {
    /// Creates a drawable; it is not rendered until added to the scene
    fn create_drawable(&mut self, geometry: GeometryId, material: &SharedMaterial)
        -> DrawableHandle;

    fn add_to_scene(&mut self, handle: DrawableHandle);

    fn set_transform(&mut self, handle: DrawableHandle, transform: Transform);
}

/// Scene containing geometries and drawables
#[derive(Default)]
pub struct Scene {
    geometries: Vec<GeometryData>,
    drawables: Vec<Drawable>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers geometry data and returns its id
    pub fn add_geometry(&mut self, geometry: GeometryData) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&GeometryData> {
        self.geometries.get(id.0)
    }

    pub fn geometries(&self) -> &[GeometryData] {
        &self.geometries
    }

    pub fn drawable(&self, handle: DrawableHandle) -> Option<&Drawable> {
        self.drawables.get(handle.0)
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    /// Drawables that have been added to the scene
    pub fn visible_drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.drawables.iter().filter(|d| d.in_scene)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_drawables().count()
    }
}

impl SceneBackend for Scene {
    fn create_drawable(
        &mut self,
        geometry: GeometryId,
        material: &SharedMaterial,
    ) -> DrawableHandle {
        self.drawables.push(Drawable {
            geometry,
            material: Rc::clone(material),
            transform: Transform::default(),
            in_scene: false,
        });
        DrawableHandle(self.drawables.len() - 1)
    }

    fn add_to_scene(&mut self, handle: DrawableHandle) {
        if let Some(drawable) = self.drawables.get_mut(handle.0) {
            drawable.in_scene = true;
        }
    }

    fn set_transform(&mut self, handle: DrawableHandle, transform: Transform) {
        if let Some(drawable) = self.drawables.get_mut(handle.0) {
            drawable.transform = transform;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_torus;
    use cgmath::{SquareMatrix, Vector4};

    #[test]
    fn test_drawables_start_outside_scene() {
        let mut scene = Scene::new();
        let torus = scene.add_geometry(generate_torus(0.3, 0.2, 8, 12));
        let material = shared_material("matcap", VariantHandle(0));

        let handle = scene.create_drawable(torus, &material);
        assert_eq!(scene.visible_count(), 0);

        scene.add_to_scene(handle);
        assert_eq!(scene.visible_count(), 1);
        assert_eq!(scene.drawable(handle).unwrap().geometry, torus);
    }

    #[test]
    fn test_drawables_share_material() {
        let mut scene = Scene::new();
        let torus = scene.add_geometry(generate_torus(0.3, 0.2, 8, 12));
        let material = shared_material("matcap", VariantHandle(0));

        let a = scene.create_drawable(torus, &material);
        let b = scene.create_drawable(torus, &material);

        material.borrow_mut().matcap = VariantHandle(5);

        let a = scene.drawable(a).unwrap();
        let b = scene.drawable(b).unwrap();
        assert!(Rc::ptr_eq(&a.material, &b.material));
        assert_eq!(a.material.borrow().matcap, VariantHandle(5));
    }

    #[test]
    fn test_identity_transform() {
        let transform = Transform::default();
        assert_eq!(transform.to_matrix(), Matrix4::identity());
    }

    #[test]
    fn test_transform_translates_and_scales() {
        let transform = Transform {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::zero(),
            scale: Vector3::new(0.5, 0.5, 0.5),
        };
        let p = transform.to_matrix() * Vector4::new(2.0, 0.0, 0.0, 1.0);
        assert!((p.x - 2.0).abs() < 1e-6);
        assert!((p.y - 2.0).abs() < 1e-6);
        assert!((p.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_transform_ignores_unknown_handle() {
        let mut scene = Scene::new();
        scene.set_transform(DrawableHandle(3), Transform::default());
        scene.add_to_scene(DrawableHandle(3));
        assert!(scene.drawables().is_empty());
    }
}
