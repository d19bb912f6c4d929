//! # Primitive Shape Generation
//!
//! Box, sphere, torus and cone generators. Every shape carries outward normals and
//! texture coordinates.

use super::GeometryData;
use cgmath::{ElementWise, InnerSpace, Vector3};
use std::f32::consts::PI;

/// Generate a box centered at the origin
///
/// Each face gets its own four vertices so normals and UVs stay per-face.
pub fn generate_box(width: f32, height: f32, depth: f32) -> GeometryData {
    assert!(
        width > 0.0 && height > 0.0 && depth > 0.0,
        "box extents must be positive"
    );

    let mut data = GeometryData::new();
    let half = Vector3::new(width * 0.5, height * 0.5, depth * 0.5);

    // (normal, right, up) with right x up == normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    for (normal, right, up) in faces {
        let n = Vector3::from(normal);
        let r = Vector3::from(right);
        let u = Vector3::from(up);
        let center = n.mul_element_wise(half);
        let r_extent = r * r.map(f32::abs).dot(half);
        let u_extent = u * u.map(f32::abs).dot(half);

        // Bottom-left, bottom-right, top-right, top-left
        let corners = [
            (center - r_extent - u_extent, [0.0, 1.0]),
            (center + r_extent - u_extent, [1.0, 1.0]),
            (center + r_extent + u_extent, [1.0, 0.0]),
            (center - r_extent + u_extent, [0.0, 0.0]),
        ];

        let base = data.vertices.len() as u32;
        for (position, uv) in corners {
            data.push(position.into(), normal, uv);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

/// Generate a UV sphere centered at the origin
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `width_segments` - Segments around the Y axis (at least 3)
/// * `height_segments` - Segments from pole to pole (at least 2)
pub fn generate_sphere(radius: f32, width_segments: u32, height_segments: u32) -> GeometryData {
    assert!(radius > 0.0, "sphere radius must be positive");
    assert!(
        width_segments >= 3 && height_segments >= 2,
        "sphere needs at least 3x2 segments"
    );

    let mut data = GeometryData::new();

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let phi = v * PI;

        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let theta = u * 2.0 * PI;

            let normal = [
                -theta.cos() * phi.sin(),
                phi.cos(),
                theta.sin() * phi.sin(),
            ];
            let position = [normal[0] * radius, normal[1] * radius, normal[2] * radius];
            data.push(position, normal, [u, v]);
        }
    }

    let row = width_segments + 1;
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;

            // The pole rows collapse to a single point, skip the degenerate half
            if iy != 0 {
                data.indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                data.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    data
}

/// Generate a torus lying in the XY plane
///
/// # Arguments
/// * `radius` - Distance from the center to the middle of the tube
/// * `tube` - Tube radius
/// * `radial_segments` - Segments around the tube cross-section
/// * `tubular_segments` - Segments around the ring
pub fn generate_torus(
    radius: f32,
    tube: f32,
    radial_segments: u32,
    tubular_segments: u32,
) -> GeometryData {
    assert!(
        radius > 0.0 && tube > 0.0,
        "torus radii must be positive"
    );
    assert!(
        radial_segments >= 3 && tubular_segments >= 3,
        "torus needs at least 3 segments each way"
    );

    let mut data = GeometryData::new();

    for j in 0..=radial_segments {
        let v = j as f32 / radial_segments as f32 * 2.0 * PI;
        for i in 0..=tubular_segments {
            let u = i as f32 / tubular_segments as f32 * 2.0 * PI;

            let position = Vector3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vector3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let normal = (position - center).normalize();

            data.push(
                position.into(),
                normal.into(),
                [
                    i as f32 / tubular_segments as f32,
                    1.0 - j as f32 / radial_segments as f32,
                ],
            );
        }
    }

    let row = tubular_segments + 1;
    for j in 1..=radial_segments {
        for i in 1..=tubular_segments {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;

            data.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    data
}

/// Generate a cone with its apex on +Y and a closed base
///
/// # Arguments
/// * `radius` - Base radius
/// * `height` - Apex to base distance, centered on the origin
/// * `radial_segments` - Segments around the Y axis
pub fn generate_cone(radius: f32, height: f32, radial_segments: u32) -> GeometryData {
    assert!(
        radius > 0.0 && height > 0.0,
        "cone radius and height must be positive"
    );
    assert!(radial_segments >= 3, "cone needs at least 3 radial segments");

    let mut data = GeometryData::new();
    let half_height = height * 0.5;
    let slope = radius / height;

    // Side: one apex vertex per segment so each keeps its own normal
    let base_ring = data.vertices.len() as u32;
    for x in 0..=radial_segments {
        let u = x as f32 / radial_segments as f32;
        let theta = u * 2.0 * PI;
        let normal = Vector3::new(theta.sin(), slope, theta.cos()).normalize();
        data.push(
            [radius * theta.sin(), -half_height, radius * theta.cos()],
            normal.into(),
            [u, 1.0],
        );
    }
    let apex_ring = data.vertices.len() as u32;
    for x in 0..=radial_segments {
        let u = x as f32 / radial_segments as f32;
        let theta = (u + 0.5 / radial_segments as f32) * 2.0 * PI;
        let normal = Vector3::new(theta.sin(), slope, theta.cos()).normalize();
        data.push([0.0, half_height, 0.0], normal.into(), [u, 0.0]);
    }
    for x in 0..radial_segments {
        data.indices
            .extend_from_slice(&[base_ring + x, base_ring + x + 1, apex_ring + x]);
    }

    // Base cap, facing -Y
    let center = data.push([0.0, -half_height, 0.0], [0.0, -1.0, 0.0], [0.5, 0.5]);
    let cap_ring = data.vertices.len() as u32;
    for x in 0..=radial_segments {
        let theta = x as f32 / radial_segments as f32 * 2.0 * PI;
        data.push(
            [radius * theta.sin(), -half_height, radius * theta.cos()],
            [0.0, -1.0, 0.0],
            [0.5 + theta.sin() * 0.5, 0.5 + theta.cos() * 0.5],
        );
    }
    for x in 0..radial_segments {
        data.indices
            .extend_from_slice(&[cap_ring + x + 1, cap_ring + x, center]);
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(data: &GeometryData, tri: usize) -> Vector3<f32> {
        let idx = &data.indices[tri * 3..tri * 3 + 3];
        let a = Vector3::from(data.vertices[idx[0] as usize]);
        let b = Vector3::from(data.vertices[idx[1] as usize]);
        let c = Vector3::from(data.vertices[idx[2] as usize]);
        (b - a).cross(c - a)
    }

    fn assert_outward_winding(data: &GeometryData) {
        for tri in 0..data.triangle_count() {
            let face = triangle_normal(data, tri);
            if face.magnitude2() < 1e-12 {
                continue;
            }
            let idx = data.indices[tri * 3] as usize;
            let vertex_normal = Vector3::from(data.normals[idx]);
            assert!(
                face.dot(vertex_normal) > 0.0,
                "triangle {tri} winds against its vertex normal"
            );
        }
    }

    #[test]
    fn test_box_generation() {
        let cube = generate_box(1.0, 1.0, 1.0);
        assert_eq!(cube.vertices.len(), 24); // 6 faces * 4 vertices
        assert_eq!(cube.indices.len(), 36); // 6 faces * 2 triangles * 3 indices
        assert_eq!(cube.triangle_count(), 12);
        for v in &cube.vertices {
            assert!(v.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
        }
        assert_outward_winding(&cube);
    }

    #[test]
    fn test_box_extents() {
        let slab = generate_box(2.0, 1.0, 0.5);
        let max_x = slab.vertices.iter().map(|v| v[0]).fold(f32::MIN, f32::max);
        let max_z = slab.vertices.iter().map(|v| v[2]).fold(f32::MIN, f32::max);
        assert!((max_x - 1.0).abs() < 1e-6);
        assert!((max_z - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = generate_sphere(1.0, 32, 32);
        assert_eq!(sphere.vertices.len(), 33 * 33);
        assert_eq!(sphere.vertices.len(), sphere.normals.len());
        assert_eq!(sphere.vertices.len(), sphere.tex_coords.len());
        // Pole rows contribute one triangle per segment, the others two
        assert_eq!(sphere.triangle_count(), 32 * (2 * 32 - 2));
        for v in &sphere.vertices {
            let r = Vector3::from(*v).magnitude();
            assert!((r - 1.0).abs() < 1e-5);
        }
        assert_outward_winding(&sphere);
    }

    #[test]
    fn test_torus_generation() {
        let torus = generate_torus(0.7, 0.2, 15, 100);
        assert_eq!(torus.vertex_count(), 16 * 101);
        assert_eq!(torus.triangle_count(), 15 * 100 * 2);
        for v in &torus.vertices {
            assert!(v[2].abs() <= 0.2 + 1e-6);
        }
        assert_outward_winding(&torus);
    }

    #[test]
    fn test_cone_generation() {
        let cone = generate_cone(1.0, 2.0, 16);
        // Side ring + apex ring + cap center + cap ring
        assert_eq!(cone.vertex_count(), 17 + 17 + 1 + 17);
        assert_eq!(cone.triangle_count(), 16 * 2);
        let min_y = cone.vertices.iter().map(|v| v[1]).fold(f32::MAX, f32::min);
        let max_y = cone.vertices.iter().map(|v| v[1]).fold(f32::MIN, f32::max);
        assert!((min_y + 1.0).abs() < 1e-6);
        assert!((max_y - 1.0).abs() < 1e-6);
        assert_outward_winding(&cone);
    }

    #[test]
    #[should_panic]
    fn test_degenerate_sphere_panics() {
        generate_sphere(1.0, 2, 2);
    }

    #[test]
    #[should_panic]
    fn test_negative_box_panics() {
        generate_box(-1.0, 1.0, 1.0);
    }
}
