//! # Primitive Shape Generation
//!
//! Shapes carry positions and normals; the matcap lookup needs nothing else.

use super::GeometryData;
use std::f32::consts::TAU;

/// Generate a torus lying in the XY plane, centred at the origin
///
/// # Arguments
/// * `radius` - Distance from the centre to the middle of the tube
/// * `tube` - Radius of the tube
/// * `radial_segments` - Subdivisions around the tube cross-section
/// * `tubular_segments` - Subdivisions along the ring
pub fn generate_torus(
    radius: f32,
    tube: f32,
    radial_segments: u32,
    tubular_segments: u32,
) -> GeometryData {
    let mut data = GeometryData::new();

    let radial = radial_segments.max(3);
    let tubular = tubular_segments.max(3);

    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;

            let x = (radius + tube * v.cos()) * u.cos();
            let y = (radius + tube * v.cos()) * u.sin();
            let z = tube * v.sin();
            data.vertices.push([x, y, z]);

            // Normal points away from the ring's centre line
            let centre = [radius * u.cos(), radius * u.sin(), 0.0];
            let n = [x - centre[0], y - centre[1], z - centre[2]];
            let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            data.normals.push([n[0] / length, n[1] / length, n[2] / length]);
        }
    }

    let row = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;

            data.indices.extend_from_slice(&[a, b, d]);
            data.indices.extend_from_slice(&[b, c, d]);
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torus_generation() {
        let torus = generate_torus(0.3, 0.2, 20, 45);
        assert_eq!(torus.vertex_count(), 21 * 46);
        assert_eq!(torus.triangle_count(), 20 * 45 * 2);
        assert_eq!(torus.vertices.len(), torus.normals.len());
    }

    #[test]
    fn test_uploaded_vertices_carry_every_attribute() {
        let torus = generate_torus(0.3, 0.2, 4, 6);
        let vertices = torus.to_vertices();

        assert_eq!(vertices.len(), torus.vertex_count());
        for (i, vertex) in vertices.iter().enumerate() {
            assert_eq!(vertex.position, torus.vertices[i]);
            assert_eq!(vertex.normal, torus.normals[i]);
        }
        assert_eq!(
            std::mem::size_of::<crate::gfx::geometry::Vertex3D>(),
            6 * std::mem::size_of::<f32>()
        );
    }

    #[test]
    fn test_torus_indices_in_range() {
        let torus = generate_torus(1.0, 0.25, 6, 8);
        let count = torus.vertex_count() as u32;
        assert!(torus.indices.iter().all(|&i| i < count));
    }

    #[test]
    fn test_torus_normals_are_unit_length() {
        let torus = generate_torus(0.3, 0.2, 8, 12);
        for n in &torus.normals {
            let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((length - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_torus_extent() {
        let torus = generate_torus(0.3, 0.2, 20, 45);
        let max_x = torus.vertices.iter().map(|v| v[0]).fold(f32::MIN, f32::max);
        let max_z = torus.vertices.iter().map(|v| v[2]).fold(f32::MIN, f32::max);
        assert!((max_x - 0.5).abs() < 1e-4);
        assert!((max_z - 0.2).abs() < 1e-2);
    }

    #[test]
    fn test_segment_minimum() {
        let torus = generate_torus(1.0, 0.5, 0, 1);
        assert_eq!(torus.vertex_count(), 4 * 4);
    }
}
