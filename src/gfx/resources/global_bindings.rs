//! Per-frame uniforms shared by every draw: camera and lights
//!
//! Bound to group 0 in the mesh pipelines.

use crate::{
    gfx::{camera::camera_utils::Camera, rendering::light_direction, scene::Light, scene::Scene},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Must match `Globals` in shader.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// xyz: direction light travels
    pub light_direction: [f32; 4],
    /// rgb: directional color times intensity
    pub light_radiance: [f32; 4],
    /// rgb: summed ambient radiance, a: 1 when an environment map is ready
    pub ambient: [f32; 4],
}

impl GlobalUniform {
    /// Collects camera matrices and lights; only the first directional light is used
    pub fn from_scene(scene: &Scene) -> Self {
        let camera = &scene.camera;
        let mut uniform = Self {
            view_position: [camera.position.x, camera.position.y, camera.position.z, 1.0],
            view_proj: camera.build_view_projection_matrix().into(),
            view: camera.view_matrix().into(),
            light_direction: [0.0, -1.0, 0.0, 0.0],
            light_radiance: [0.0; 4],
            ambient: [0.0; 4],
        };

        let mut directional_found = false;
        for light in &scene.lights {
            let [r, g, b] = light.radiance();
            match *light {
                Light::Directional { position, .. } if !directional_found => {
                    directional_found = true;
                    uniform.light_direction = light_direction(position).extend(0.0).into();
                    uniform.light_radiance = [r, g, b, 1.0];
                }
                Light::Directional { .. } => {}
                Light::Ambient { .. } => {
                    uniform.ambient[0] += r;
                    uniform.ambient[1] += g;
                    uniform.ambient[2] += b;
                }
            }
        }
        let environment_ready = scene
            .environment
            .and_then(|id| scene.textures.get(id))
            .is_some_and(|texture| texture.is_ready());
        uniform.ambient[3] = if environment_ready { 1.0 } else { 0.0 };
        uniform
    }
}

pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// Layout and bind group for [`GlobalUniform`]
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
