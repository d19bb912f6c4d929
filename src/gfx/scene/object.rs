use cgmath::{Matrix4, Rad, Vector3};

use crate::gfx::resources::material::MaterialId;
use crate::gfx::scene::GeometryId;

/// Stable handle to a node in a [`Scene`](super::Scene)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Position, Euler XYZ rotation in radians, and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Default::default()
        }
    }

    /// T * R * S, with R = Rx * Ry * Rz
    pub fn matrix(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.position);
        let r = Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z));
        let s = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        t * r * s
    }
}

/// A drawable: one geometry, one material, one transform
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transform: Transform,
    pub visible: bool,
}

impl Node {
    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn test_identity_transform() {
        let matrix = Transform::default().matrix();
        let p = matrix * Vector4::new(1.0, 2.0, 3.0, 1.0);
        assert_eq!(p, Vector4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn test_rotation_then_translation() {
        let mut transform = Transform::at(2.0, 0.0, 0.0);
        transform.rotation.y = std::f32::consts::FRAC_PI_2;
        let p = transform.matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        // +X rotated a quarter turn about +Y lands on -Z
        assert!((p.x - 2.0).abs() < 1e-6);
        assert!((p.z + 1.0).abs() < 1e-6);
    }
}
