//! wgpu render target
//!
//! Draws a [`Scene`] into a window surface, then the debug panel on top. GPU copies
//! of meshes, textures and materials are created on demand and refreshed when the
//! scene-side data changes.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{Matrix, Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::config::{PanelConfig, RenderConfig};
use crate::error::RenderError;
use crate::gfx::{
    resources::{
        global_bindings::{GlobalBindings, GlobalUBO, GlobalUniform},
        material::{Material, MaterialId},
        texture::{TextureId, TextureRole},
        texture_resource::TextureResource,
    },
    scene::{GeometryId, Node, NodeId, Scene},
};
use crate::params::PanelModel;
use crate::ui::{draw_panel, UiCapture, UiManager};
use crate::viewport::ViewportContext;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

use super::pipeline_manager::{PipelineConfig, PipelineKey, PipelineManager};
use super::{draw_order, FrameOutput, RenderTarget};

const SHADER: &str = "shader.wgsl";
const PANEL_FONT_SIZE: f32 = 18.0;

/// Material texture slots in shader binding order
const MATERIAL_SLOTS: [TextureRole; 8] = [
    TextureRole::Color,
    TextureRole::Alpha,
    TextureRole::AmbientOcclusion,
    TextureRole::Displacement,
    TextureRole::Metalness,
    TextureRole::Roughness,
    TextureRole::Gradient,
    TextureRole::Matcap,
];

/// Must match `NodeUniform` in shader.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct NodeUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl NodeUniform {
    pub fn from_node(node: &Node) -> Self {
        let model = node.model_matrix();
        let normal = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(Matrix4::identity());
        Self {
            model: model.into(),
            normal: normal.into(),
        }
    }
}

/// Must match `MaterialUniform` in shader.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub specular: [f32; 4],
    pub params0: [f32; 4],
    pub params1: [f32; 4],
    pub flags: [u32; 4],
    /// Columns of the UV transform
    pub uv: [[f32; 4]; 3],
}

impl MaterialUniform {
    /// `uv_transform` is row-major, as produced by `Texture::uv_transform`
    pub fn from_material(material: &Material, uv_transform: [[f32; 3]; 3]) -> Self {
        let [r, g, b] = material.color;
        let [sr, sg, sb] = material.specular_color;
        let [thin, thick] = material.iridescence_thickness_range;
        let column = |j: usize| {
            [
                uv_transform[0][j],
                uv_transform[1][j],
                uv_transform[2][j],
                0.0,
            ]
        };
        Self {
            color: [r, g, b, material.opacity],
            specular: [sr, sg, sb, material.shininess],
            params0: [
                material.roughness,
                material.metalness,
                material.displacement_scale,
                material.transmission,
            ],
            params1: [
                material.iridescence,
                material.iridescence_ior,
                thin,
                thick,
            ],
            flags: [
                material.shading.shader_index(),
                material.maps.alpha.is_some() as u32,
                material.transparent as u32,
                0,
            ],
            uv: [column(0), column(1), column(2)],
        }
    }
}

/// Texture ids in [`MATERIAL_SLOTS`] order
fn slot_textures(material: &Material) -> [Option<TextureId>; 8] {
    let maps = &material.maps;
    [
        maps.color,
        maps.alpha,
        maps.ambient_occlusion,
        maps.displacement,
        maps.metalness,
        maps.roughness,
        maps.gradient,
        maps.matcap,
    ]
}

/// The first bound slot drives the material's UV transform
fn material_uv_transform(scene: &Scene, material: &Material) -> [[f32; 3]; 3] {
    slot_textures(material)
        .into_iter()
        .flatten()
        .find_map(|id| scene.textures.get(id))
        .map(|texture| texture.uv_transform())
        .unwrap_or([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    version: u64,
    resource: TextureResource,
}

struct NodeBinding {
    ubo: UniformBuffer<NodeUniform>,
    bind_group: wgpu::BindGroup,
}

struct MaterialBinding {
    ubo: UniformBuffer<MaterialUniform>,
    bind_group: wgpu::BindGroup,
    /// Texture versions the bind group was built with; `None` means fallback
    bound: [Option<(TextureId, u64)>; 8],
}

pub struct WgpuRenderTarget {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    node_layout: BindGroupLayoutWithDesc,
    material_layout: BindGroupLayoutWithDesc,
    fallbacks: HashMap<TextureRole, TextureResource>,
    meshes: HashMap<GeometryId, GpuMesh>,
    textures: HashMap<TextureId, GpuTexture>,
    nodes: HashMap<NodeId, NodeBinding>,
    materials: HashMap<MaterialId, MaterialBinding>,
    ui: UiManager,
    panel_config: PanelConfig,
    clear_color: wgpu::Color,
    disposed: bool,
}

impl WgpuRenderTarget {
    /// Creates the surface, device, pipelines and panel renderer for `window`
    ///
    /// # Arguments
    /// * `window` - Window to draw into; the target keeps a handle to it
    /// * `viewport` - Initial logical size and pixel ratio of the drawing buffer
    /// * `render_config` - Clear color and vsync preference
    /// * `panel_config` - Font size for the debug panel
    ///
    /// # Returns
    /// The render target, or a [`RenderError`] when no adapter or device is available
    pub async fn new(
        window: Arc<Window>,
        viewport: &ViewportContext,
        render_config: &RenderConfig,
        panel_config: &PanelConfig,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|err| RenderError::Surface(err.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| RenderError::Surface(format!("no adapter: {}", err)))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|err| RenderError::Surface(format!("no device: {}", err)))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface reports no formats".to_string()))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (width, height) = viewport.physical_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if render_config.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}x{} {:?} (pixel ratio {})",
            width,
            height,
            format,
            viewport.pixel_ratio()
        );

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let global_ubo = GlobalUBO::new(&device);
        let global_bindings = GlobalBindings::new(&device, &global_ubo);

        let node_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(&device, "Node Bind Group Layout");

        let mut material_layout_builder =
            BindGroupLayoutBuilder::new().next_binding_rendering(binding_types::uniform());
        for _ in MATERIAL_SLOTS {
            material_layout_builder = material_layout_builder
                .next_binding_rendering(binding_types::texture_2d())
                .next_binding_rendering(binding_types::sampler(
                    wgpu::SamplerBindingType::Filtering,
                ));
        }
        let material_layout = material_layout_builder.create(&device, "Material Bind Group Layout");

        let fallbacks = MATERIAL_SLOTS
            .iter()
            .map(|&role| (role, TextureResource::fallback(&device, &queue, role)))
            .collect();

        let ui = UiManager::new(&device, &queue, format, &window, PANEL_FONT_SIZE);

        let device: Arc<wgpu::Device> = Arc::new(device);
        let queue: Arc<wgpu::Queue> = Arc::new(queue);
        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader(SHADER, include_str!("shader.wgsl"));
        for key in PipelineKey::all() {
            pipeline_manager.register_pipeline(
                key,
                PipelineConfig::for_key(key, SHADER, format)
                    .with_depth_stencil(TextureResource::DEPTH_FORMAT)
                    .with_bind_group_layouts(vec![
                        global_bindings.layout().clone(),
                        node_layout.layout.clone(),
                        material_layout.layout.clone(),
                    ]),
            );
        }

        let [r, g, b] = render_config.clear_color;
        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            global_ubo,
            global_bindings,
            node_layout,
            material_layout,
            fallbacks,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            nodes: HashMap::new(),
            materials: HashMap::new(),
            ui,
            panel_config: panel_config.clone(),
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            disposed: false,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Passes a window event to the panel and reports what it wants to capture
    pub fn handle_window_event(
        &mut self,
        window_id: winit::window::WindowId,
        event: &winit::event::WindowEvent,
    ) -> UiCapture {
        if self.disposed {
            return UiCapture::default();
        }
        self.ui.handle_window_event(&self.window, window_id, event)
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn sync_meshes(&mut self, scene: &Scene) {
        self.meshes.retain(|id, _| scene.geometry(*id).is_some());
        for id in scene.geometry_ids() {
            if self.meshes.contains_key(&id) {
                continue;
            }
            let Some(geometry) = scene.geometry(id) else {
                continue;
            };
            let label = geometry.desc.kind();
            let vertices = geometry.data.to_vertices();
            let vertex_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(&geometry.data.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            self.meshes.insert(
                id,
                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: geometry.data.indices.len() as u32,
                },
            );
        }
    }

    fn sync_textures(&mut self, scene: &Scene) {
        self.textures
            .retain(|id, _| scene.textures.get(*id).is_some_and(|texture| texture.is_ready()));

        for (id, texture) in scene.textures.iter() {
            let Some(image) = texture.image() else {
                continue;
            };
            if self
                .textures
                .get(&id)
                .is_some_and(|gpu| gpu.version == texture.version())
            {
                continue;
            }
            log::debug!(
                "Uploading {} ({}x{})",
                texture.source,
                image.width(),
                image.height()
            );
            let resource = TextureResource::from_texture(&self.device, &self.queue, texture, image);
            self.textures.insert(
                id,
                GpuTexture {
                    version: texture.version(),
                    resource,
                },
            );
        }
    }

    fn sync_materials(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.materials
            .retain(|id, _| scene.material(*id).is_some());

        for (id, material) in scene.materials.iter() {
            let bound = slot_textures(material).map(|slot| {
                slot.and_then(|texture_id| {
                    self.textures
                        .get(&texture_id)
                        .map(|gpu| (texture_id, gpu.version))
                })
            });

            let stale = self
                .materials
                .get(&id)
                .is_none_or(|binding| binding.bound != bound);
            if stale {
                let binding = self.create_material_binding(&material.name, bound)?;
                self.materials.insert(id, binding);
            }

            let uniform = MaterialUniform::from_material(material, material_uv_transform(scene, material));
            if let Some(binding) = self.materials.get_mut(&id) {
                binding.ubo.update_content(&self.queue, uniform);
            }
        }
        Ok(())
    }

    fn create_material_binding(
        &self,
        name: &str,
        bound: [Option<(TextureId, u64)>; 8],
    ) -> Result<MaterialBinding, RenderError> {
        let ubo = UniformBuffer::<MaterialUniform>::new(&self.device);
        let mut builder = BindGroupBuilder::new(&self.material_layout).resource(ubo.binding_resource());
        for (role, slot) in MATERIAL_SLOTS.iter().zip(bound) {
            let resource = match slot.and_then(|(id, _)| self.textures.get(&id)) {
                Some(gpu) => &gpu.resource,
                None => self.fallbacks.get(role).ok_or_else(|| {
                    RenderError::MissingResource(format!("fallback texture for {:?}", role))
                })?,
            };
            builder = builder
                .texture(&resource.view)
                .sampler(&resource.sampler);
        }
        let bind_group = builder.create(&self.device, &format!("Material: {}", name));
        Ok(MaterialBinding {
            ubo,
            bind_group,
            bound,
        })
    }

    fn sync_nodes(&mut self, scene: &Scene) {
        self.nodes
            .retain(|id, _| scene.node(*id).is_some());

        for node in scene.nodes() {
            let binding = self.nodes.entry(node.id).or_insert_with(|| {
                let ubo = UniformBuffer::<NodeUniform>::new(&self.device);
                let bind_group = BindGroupBuilder::new(&self.node_layout)
                    .resource(ubo.binding_resource())
                    .create(&self.device, &format!("Node: {}", node.name));
                NodeBinding { ubo, bind_group }
            });
            binding.ubo.update_content(&self.queue, NodeUniform::from_node(node));
        }
    }

    fn acquire_frame(&mut self) -> Result<wgpu::SurfaceTexture, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Err(RenderError::SurfaceLost)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory),
            Err(err) => Err(RenderError::Surface(err.to_string())),
        }
    }
}

impl RenderTarget for WgpuRenderTarget {
    fn resize(&mut self, viewport: &ViewportContext) {
        if self.disposed || !viewport.has_area() {
            return;
        }
        let (width, height) = viewport.physical_size();
        if (width, height) == (self.config.width, self.config.height) {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
        self.ui.update_display_size(width, height);
        log::debug!(
            "Resized surface to {}x{} (pixel ratio {})",
            width,
            height,
            viewport.pixel_ratio()
        );
    }

    fn render(
        &mut self,
        scene: &Scene,
        panel: Option<&PanelModel>,
    ) -> Result<FrameOutput, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }

        self.sync_meshes(scene);
        self.sync_textures(scene);
        self.sync_materials(scene)?;
        self.sync_nodes(scene);
        self.global_ubo
            .update_content(&self.queue, GlobalUniform::from_scene(scene));

        let frame = self.acquire_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut draw_calls = 0;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

            for node in draw_order(scene) {
                let (Some(material), Some(material_binding), Some(node_binding), Some(mesh)) = (
                    scene.material(node.material),
                    self.materials.get(&node.material),
                    self.nodes.get(&node.id),
                    self.meshes.get(&node.geometry),
                ) else {
                    log::debug!("Skipping '{}': GPU resources missing", node.name);
                    continue;
                };

                let pipeline = self
                    .pipeline_manager
                    .get_pipeline(PipelineKey::for_material(material))?;
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, &node_binding.bind_group, &[]);
                render_pass.set_bind_group(2, &material_binding.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                draw_calls += 1;
            }
        }

        let mut edits = Vec::new();
        if let Some(model) = panel {
            let panel_config = &self.panel_config;
            edits = self
                .ui
                .update_logic(&self.window, |ui| draw_panel(ui, model, panel_config));
            self.ui
                .render_display_only(&self.device, &self.queue, &mut encoder, &view)?;
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(FrameOutput { draw_calls, edits })
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.nodes.clear();
        self.materials.clear();
        self.textures.clear();
        self.meshes.clear();
        self.fallbacks.clear();
        self.pipeline_manager.clear();
        self.disposed = true;
        log::info!("Render target disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::material::ShadingModel;
    use crate::gfx::scene::Transform;
    use cgmath::Vector3;

    #[test]
    fn test_material_uniform_packs_parameters() {
        let mut material = Material::basic("sphere").with_opacity(0.5).with_color(0.2, 0.4, 0.6);
        material.shading = ShadingModel::Toon;
        material.specular_color = [1.0, 0.5, 0.0];
        material.shininess = 120.0;
        let uniform = MaterialUniform::from_material(
            &material,
            [[1.0, 0.0, 0.25], [0.0, 1.0, 0.5], [0.0, 0.0, 1.0]],
        );

        assert_eq!(uniform.color, [0.2, 0.4, 0.6, 0.5]);
        assert_eq!(uniform.specular, [1.0, 0.5, 0.0, 120.0]);
        assert_eq!(uniform.flags, [2, 0, 1, 0]);
        assert_eq!(uniform.uv[2], [0.25, 0.5, 1.0, 0.0]);
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }

    #[test]
    fn test_shader_reads_specular_and_shininess() {
        let source = include_str!("shader.wgsl");
        assert!(source.contains("material.specular.rgb"));
        assert!(source.contains("material.specular.a"));
    }

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let mut node = Node {
            id: NodeId(0),
            name: "cube".to_string(),
            geometry: GeometryId(0),
            material: MaterialId(0),
            transform: Transform::default(),
            visible: true,
        };
        node.transform.scale = Vector3::new(2.0, 1.0, 1.0);

        let uniform = NodeUniform::from_node(&node);
        assert_eq!(uniform.model[0][0], 2.0);
        assert!((uniform.normal[0][0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_slot_order_matches_shader_layout() {
        assert_eq!(MATERIAL_SLOTS[0], TextureRole::Color);
        assert_eq!(MATERIAL_SLOTS[3], TextureRole::Displacement);
        assert_eq!(MATERIAL_SLOTS[7], TextureRole::Matcap);
    }
}
