//! Assembly of the fixed demo scene
//!
//! Textures are requested through the [`ResourceLoader`] and bound while still
//! pending; they fill in as loads complete.

use cgmath::Vector3;

use crate::config::{AssetManifest, CameraConfig};
use crate::gfx::{
    camera::perspective_camera::PerspectiveCamera,
    geometry::GeometryDesc,
    resources::{
        loader::ResourceLoader,
        material::{Material, MaterialId, TextureSlots},
        texture::{TextureId, TextureRole},
    },
};

use super::light::Light;
use super::object::NodeId;
use super::scene::{GeometryId, Scene};

pub const TORUS: &str = "torus";
pub const CUBE: &str = "cube";
pub const CONE: &str = "cone";
pub const SPHERE: &str = "sphere";

/// Handles to everything the builder created
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltScene {
    pub torus: NodeId,
    pub cube: NodeId,
    pub cone: NodeId,
    pub sphere: NodeId,
    /// Physically-shaded material used by both the cube and the cone
    pub shared_material: MaterialId,
    pub torus_material: MaterialId,
    pub sphere_material: MaterialId,
    pub geometries: Vec<GeometryId>,
    pub materials: Vec<MaterialId>,
}

/// Builds the scene camera for a viewport aspect ratio
pub fn build_camera(config: &CameraConfig, aspect: f32) -> PerspectiveCamera {
    PerspectiveCamera::from_config(config, aspect)
}

/// Populates `scene` with the four shapes and both lights.
pub fn build_scene(
    scene: &mut Scene,
    loader: &mut ResourceLoader,
    assets: &AssetManifest,
) -> BuiltScene {
    let mut load = |path: &str, role: TextureRole| loader.load(&mut scene.textures, path, role);

    // Door set for the shared physical material
    let shared_maps = TextureSlots {
        color: Some(load(&assets.door_color, TextureRole::Color)),
        alpha: Some(load(&assets.door_alpha, TextureRole::Alpha)),
        ambient_occlusion: Some(load(
            &assets.door_ambient_occlusion,
            TextureRole::AmbientOcclusion,
        )),
        displacement: Some(load(&assets.door_height, TextureRole::Displacement)),
        metalness: Some(load(&assets.door_metalness, TextureRole::Metalness)),
        normal: Some(load(&assets.door_normal, TextureRole::Normal)),
        roughness: Some(load(&assets.door_roughness, TextureRole::Roughness)),
        transmission: assets
            .transmission
            .as_deref()
            .map(|path| load(path, TextureRole::Transmission)),
        gradient: Some(load(&assets.gradient, TextureRole::Gradient)),
        matcap: Some(load(&assets.matcap, TextureRole::Matcap)),
    };

    let torus_maps = TextureSlots {
        color: Some(load(&assets.onyx_color, TextureRole::Color)),
        displacement: Some(load(&assets.onyx_displacement, TextureRole::Displacement)),
        normal: Some(load(&assets.onyx_normal, TextureRole::Normal)),
        roughness: Some(load(&assets.onyx_roughness, TextureRole::Roughness)),
        ..Default::default()
    };

    let sphere_maps = TextureSlots {
        color: Some(load(&assets.rock_color, TextureRole::Color)),
        ..Default::default()
    };

    let environment = assets
        .environment
        .as_deref()
        .map(|path| load(path, TextureRole::Environment));

    for id in torus_maps.ids().chain(sphere_maps.ids()) {
        center_texture(scene, id);
    }
    scene.environment = environment;

    let shared_material = scene.add_material(
        Material::physical("shared")
            .with_maps(shared_maps)
            .with_displacement_scale(0.1),
    );
    let torus_material = scene.add_material(Material::basic("torus").with_maps(torus_maps));
    let sphere_material = scene.add_material(
        Material::basic("sphere")
            .with_maps(sphere_maps)
            .with_opacity(0.5),
    );

    let torus_geometry = scene.add_geometry(GeometryDesc::Torus {
        radius: 0.7,
        tube: 0.2,
        radial_segments: 15,
        tubular_segments: 100,
    });
    let cube_geometry = scene.add_geometry(GeometryDesc::Box {
        width: 1.0,
        height: 1.0,
        depth: 1.0,
    });
    let cone_geometry = scene.add_geometry(GeometryDesc::Cone {
        radius: 0.5,
        height: 1.0,
        radial_segments: 32,
    });
    let sphere_geometry = scene.add_geometry(GeometryDesc::Sphere {
        radius: 1.0,
        width_segments: 32,
        height_segments: 32,
    });

    let torus = scene.add_node(
        TORUS,
        torus_geometry,
        torus_material,
        Vector3::new(-2.0, 0.0, 0.0),
    );
    let cube = scene.add_node(
        CUBE,
        cube_geometry,
        shared_material,
        Vector3::new(0.0, 0.0, 0.0),
    );
    let cone = scene.add_node(
        CONE,
        cone_geometry,
        shared_material,
        Vector3::new(2.0, 2.0, 0.0),
    );
    let sphere = scene.add_node(
        SPHERE,
        sphere_geometry,
        sphere_material,
        Vector3::new(2.0, 0.0, 0.0),
    );

    scene.add_light(Light::directional([1.0, 1.0, 1.0], 1.0, [2.0, 2.0, 5.0]));
    scene.add_light(Light::ambient([1.0, 1.0, 1.0], 0.2));

    log::info!(
        "Scene built: {} nodes, {} materials, {} textures requested",
        scene.node_count(),
        scene.materials.len(),
        scene.textures.len()
    );

    BuiltScene {
        torus,
        cube,
        cone,
        sphere,
        shared_material,
        torus_material,
        sphere_material,
        geometries: vec![torus_geometry, cube_geometry, cone_geometry, sphere_geometry],
        materials: vec![shared_material, torus_material, sphere_material],
    }
}

fn center_texture(scene: &mut Scene, id: TextureId) {
    if let Some(texture) = scene.textures.get_mut(id) {
        texture.center = [0.5, 0.5];
    }
}
