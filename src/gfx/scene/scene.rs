use std::collections::BTreeMap;

use cgmath::Vector3;

use crate::gfx::{
    camera::perspective_camera::PerspectiveCamera,
    geometry::{Geometry, GeometryDesc},
    resources::{
        material::{Material, MaterialId, MaterialManager},
        texture::{TextureId, TextureStore},
    },
};

use super::light::Light;
use super::object::{Node, NodeId, Transform};

/// Stable handle to a geometry in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub(crate) u32);

/// Nodes, the camera, lights and every resource they reference
pub struct Scene {
    pub camera: PerspectiveCamera,
    pub lights: Vec<Light>,
    /// Panoramic reflection map, owned by the scene rather than a material
    pub environment: Option<TextureId>,
    pub materials: MaterialManager,
    pub textures: TextureStore,
    nodes: Vec<Node>,
    geometries: BTreeMap<GeometryId, Geometry>,
    next_node_id: u32,
    next_geometry_id: u32,
}

impl Scene {
    pub fn new(camera: PerspectiveCamera) -> Self {
        Self {
            camera,
            lights: Vec::new(),
            environment: None,
            materials: MaterialManager::new(),
            textures: TextureStore::new(),
            nodes: Vec::new(),
            geometries: BTreeMap::new(),
            next_node_id: 0,
            next_geometry_id: 0,
        }
    }

    /// Generates vertex data for `desc` and stores it
    pub fn add_geometry(&mut self, desc: GeometryDesc) -> GeometryId {
        let id = GeometryId(self.next_geometry_id);
        self.next_geometry_id += 1;
        self.geometries.insert(id, Geometry::new(desc));
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(&id)
    }

    pub fn geometry_ids(&self) -> impl Iterator<Item = GeometryId> + '_ {
        self.geometries.keys().copied()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.add_material(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get_material(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_material_mut(id)
    }

    pub fn add_node(
        &mut self,
        name: &str,
        geometry: GeometryId,
        material: MaterialId,
        position: Vector3<f32>,
    ) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            geometry,
            material,
            transform: Transform {
                position,
                ..Default::default()
            },
            visible: true,
        });
        id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The scene always has exactly one active camera
    pub fn camera_count(&self) -> usize {
        1
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn dispose_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.remove(&id).is_some()
    }

    /// Removes a material and releases textures no other material (or the
    /// environment slot) still references. Returns the number of textures released.
    pub fn dispose_material(&mut self, id: MaterialId) -> usize {
        let Some(material) = self.materials.remove_material(id) else {
            return 0;
        };

        let mut released = 0;
        for texture in material.maps.ids() {
            if Some(texture) == self.environment || self.materials.references_texture(texture) {
                continue;
            }
            if self.textures.remove(texture).is_some() {
                released += 1;
            }
        }
        log::debug!(
            "Disposed material '{}' ({} texture(s) released)",
            material.name,
            released
        );
        released
    }

    pub fn dispose_environment(&mut self) {
        if let Some(id) = self.environment.take() {
            self.textures.remove(id);
        }
    }

    /// Removes every node and returns how many there were; resources stay
    pub fn clear_nodes(&mut self) -> usize {
        let count = self.nodes.len();
        self.nodes.clear();
        count
    }

    /// True once every node and resource is gone
    pub fn is_disposed(&self) -> bool {
        self.nodes.is_empty()
            && self.geometries.is_empty()
            && self.materials.is_empty()
            && self.textures.is_empty()
    }
}
