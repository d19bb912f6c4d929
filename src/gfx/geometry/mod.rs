//! # Procedural Geometry
//!
//! Shape descriptions and the vertex data generated from them. Geometry is built
//! once when the scene is assembled and never mutated afterwards.
//!
//! ## Supported Primitives
//!
//! - **Box**: axis-aligned box with independent extents
//! - **Sphere**: UV sphere with configurable subdivision
//! - **Torus**: ring in the XY plane
//! - **Cone**: apex up, base centered at `-height / 2`
//!
//! All shapes are Y-up with counter-clockwise front faces and image-space texture
//! coordinates (v = 0 at the top row).
//!
//! ```rust
//! use shapes_sandbox::gfx::geometry::GeometryDesc;
//!
//! let data = GeometryDesc::Sphere { radius: 1.0, width_segments: 32, height_segments: 32 }.generate();
//! assert_eq!(data.vertex_count(), 33 * 33);
//! ```

pub mod primitives;

pub use primitives::*;

use crate::gfx::scene::vertex::Vertex3D;

/// Immutable shape description
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryDesc {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Torus {
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    },
    Cone {
        radius: f32,
        height: f32,
        radial_segments: u32,
    },
}

impl GeometryDesc {
    /// Generates vertex data for this shape.
    ///
    /// # Panics
    /// Panics on non-positive extents or too few segments.
    pub fn generate(&self) -> GeometryData {
        match *self {
            GeometryDesc::Box {
                width,
                height,
                depth,
            } => generate_box(width, height, depth),
            GeometryDesc::Sphere {
                radius,
                width_segments,
                height_segments,
            } => generate_sphere(radius, width_segments, height_segments),
            GeometryDesc::Torus {
                radius,
                tube,
                radial_segments,
                tubular_segments,
            } => generate_torus(radius, tube, radial_segments, tubular_segments),
            GeometryDesc::Cone {
                radius,
                height,
                radial_segments,
            } => generate_cone(radius, height, radial_segments),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GeometryDesc::Box { .. } => "box",
            GeometryDesc::Sphere { .. } => "sphere",
            GeometryDesc::Torus { .. } => "torus",
            GeometryDesc::Cone { .. } => "cone",
        }
    }
}

/// Generated geometry data ready for GPU upload
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaves positions, normals and texture coordinates into the renderer's vertex format
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, position)| Vertex3D {
                position: *position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                tex_coords: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }

    fn push(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(position);
        self.normals.push(normal);
        self.tex_coords.push(uv);
        index
    }
}

/// A generated shape owned by the scene
#[derive(Debug, Clone)]
pub struct Geometry {
    pub desc: GeometryDesc,
    pub data: GeometryData,
}

impl Geometry {
    pub fn new(desc: GeometryDesc) -> Self {
        Self {
            data: desc.generate(),
            desc,
        }
    }
}
