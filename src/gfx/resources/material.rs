//! Material definitions and storage
//!
//! Materials live in a [`MaterialManager`] and nodes reference them by
//! [`MaterialId`], so one material can be shared by several nodes. Range limits on
//! parameters are applied by the parameter bindings, not here.

use std::collections::BTreeMap;

use crate::gfx::resources::texture::TextureId;

/// Stable handle to a material in a [`MaterialManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub(crate) u32);

/// Lighting model used by the fragment shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadingModel {
    /// Unlit, color map times base color
    Basic,
    Physical,
    /// Diffuse term quantized through the gradient map
    Toon,
    /// View-space normal lookup into the matcap image
    Matcap,
}

impl ShadingModel {
    pub fn label(self) -> &'static str {
        match self {
            ShadingModel::Basic => "Basic",
            ShadingModel::Physical => "Physical",
            ShadingModel::Toon => "Toon",
            ShadingModel::Matcap => "Matcap",
        }
    }

    pub(crate) fn shader_index(self) -> u32 {
        match self {
            ShadingModel::Basic => 0,
            ShadingModel::Physical => 1,
            ShadingModel::Toon => 2,
            ShadingModel::Matcap => 3,
        }
    }
}

/// Which faces are rasterized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Back,
    Double,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Front, Side::Back, Side::Double];

    pub fn label(self) -> &'static str {
        match self {
            Side::Front => "Front",
            Side::Back => "Back",
            Side::Double => "Double",
        }
    }
}

/// Texture bindings of a material; `None` samples the neutral fallback
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextureSlots {
    pub color: Option<TextureId>,
    pub alpha: Option<TextureId>,
    pub ambient_occlusion: Option<TextureId>,
    pub displacement: Option<TextureId>,
    pub metalness: Option<TextureId>,
    pub normal: Option<TextureId>,
    pub roughness: Option<TextureId>,
    pub transmission: Option<TextureId>,
    pub gradient: Option<TextureId>,
    pub matcap: Option<TextureId>,
}

impl TextureSlots {
    /// Every bound texture id, in slot order
    pub fn ids(&self) -> impl Iterator<Item = TextureId> {
        [
            self.color,
            self.alpha,
            self.ambient_occlusion,
            self.displacement,
            self.metalness,
            self.normal,
            self.roughness,
            self.transmission,
            self.gradient,
            self.matcap,
        ]
        .into_iter()
        .flatten()
    }

    pub fn references(&self, id: TextureId) -> bool {
        self.ids().any(|bound| bound == id)
    }
}

/// Named shading configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub shading: ShadingModel,
    pub maps: TextureSlots,

    /// Linear RGB base color
    pub color: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,

    pub roughness: f32,
    pub metalness: f32,
    pub displacement_scale: f32,
    pub iridescence: f32,
    pub iridescence_ior: f32,
    /// Thin-film thickness range in nanometres
    pub iridescence_thickness_range: [f32; 2],
    pub transmission: f32,
    pub shininess: f32,
    pub specular_color: [f32; 3],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            shading: ShadingModel::Physical,
            maps: TextureSlots::default(),
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            roughness: 1.0,
            metalness: 0.0,
            displacement_scale: 1.0,
            iridescence: 0.0,
            iridescence_ior: 1.3,
            iridescence_thickness_range: [100.0, 400.0],
            transmission: 0.0,
            shininess: 30.0,
            specular_color: [1.0, 1.0, 1.0],
        }
    }
}

impl Material {
    /// Unlit material
    pub fn basic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shading: ShadingModel::Basic,
            ..Default::default()
        }
    }

    /// Physically-shaded material
    pub fn physical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            shading: ShadingModel::Physical,
            ..Default::default()
        }
    }

    /// Builder pattern: Set base color from RGB values
    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.color = [r, g, b];
        self
    }

    /// Builder pattern: Set opacity and mark the material transparent
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = true;
        self
    }

    pub fn with_maps(mut self, maps: TextureSlots) -> Self {
        self.maps = maps;
        self
    }

    pub fn with_displacement_scale(mut self, scale: f32) -> Self {
        self.displacement_scale = scale;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Whether fragments must be blended rather than written opaque
    pub fn is_blended(&self) -> bool {
        self.transparent || self.maps.alpha.is_some()
    }
}

/// Central storage for every material in a scene
#[derive(Debug, Default)]
pub struct MaterialManager {
    materials: BTreeMap<MaterialId, Material>,
    next_id: u32,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.next_id);
        self.next_id += 1;
        self.materials.insert(id, material);
        id
    }

    pub fn get_material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    pub fn get_material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(&id)
    }

    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(&id)
    }

    /// True when any remaining material binds `texture`
    pub fn references_texture(&self, texture: TextureId) -> bool {
        self.materials
            .values()
            .any(|material| material.maps.references(texture))
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter().map(|(id, material)| (*id, material))
    }

    pub fn ids(&self) -> Vec<MaterialId> {
        self.materials.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_defaults() {
        let material = Material::physical("shared");
        assert_eq!(material.shading, ShadingModel::Physical);
        assert_eq!(material.iridescence_ior, 1.3);
        assert_eq!(material.iridescence_thickness_range, [100.0, 400.0]);
        assert!(!material.is_blended());
    }

    #[test]
    fn test_alpha_map_forces_blending() {
        let maps = TextureSlots {
            alpha: Some(TextureId(3)),
            ..Default::default()
        };
        let material = Material::physical("door").with_maps(maps);
        assert!(material.is_blended());
        assert!(material.maps.references(TextureId(3)));
        assert!(!material.maps.references(TextureId(4)));
    }

    #[test]
    fn test_manager_ids_are_unique_and_stable() {
        let mut manager = MaterialManager::new();
        let a = manager.add_material(Material::basic("a"));
        let b = manager.add_material(Material::basic("b"));
        assert_ne!(a, b);

        manager.remove_material(a);
        let c = manager.add_material(Material::basic("c"));
        assert_ne!(a, c);
        assert_eq!(manager.get_material(b).unwrap().name, "b");
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_texture_reference_tracking() {
        let mut manager = MaterialManager::new();
        let shared = TextureSlots {
            color: Some(TextureId(0)),
            ..Default::default()
        };
        let a = manager.add_material(Material::basic("a").with_maps(shared));
        let b = manager.add_material(Material::basic("b").with_maps(shared));

        manager.remove_material(a);
        assert!(manager.references_texture(TextureId(0)));
        manager.remove_material(b);
        assert!(!manager.references_texture(TextureId(0)));
    }
}
