//! Render pipeline management for wgpu
//!
//! Pipelines are registered as configurations and created lazily on first use.
//! Materials pick a pipeline through a [`PipelineKey`], so materials that agree on
//! face culling and blending share one pipeline.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::error::RenderError;
use crate::gfx::resources::material::{Material, Side};
use crate::gfx::scene::vertex::Vertex3D;

/// Fixed-function state that varies between materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub side: Side,
    pub blended: bool,
}

impl PipelineKey {
    pub fn for_material(material: &Material) -> Self {
        Self {
            side: material.side,
            blended: material.is_blended(),
        }
    }

    /// Every key a material can map to
    pub fn all() -> impl Iterator<Item = PipelineKey> {
        Side::ALL.into_iter().flat_map(|side| {
            [false, true]
                .into_iter()
                .map(move |blended| PipelineKey { side, blended })
        })
    }

    pub fn cull_mode(self) -> Option<Face> {
        match self.side {
            Side::Front => Some(Face::Back),
            Side::Back => Some(Face::Front),
            Side::Double => None,
        }
    }

    pub fn blend_state(self) -> BlendState {
        if self.blended {
            BlendState::ALPHA_BLENDING
        } else {
            BlendState::REPLACE
        }
    }

    /// Blended surfaces test against depth but do not occlude each other
    pub fn depth_write(self) -> bool {
        !self.blended
    }

    pub fn label(self) -> String {
        format!(
            "Mesh Pipeline ({}, {})",
            self.side.label(),
            if self.blended { "blended" } else { "opaque" }
        )
    }
}

/// Everything needed to create one render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub cull_mode: Option<Face>,
    pub depth_format: Option<TextureFormat>,
    pub depth_write: bool,
    pub color_targets: Vec<Option<ColorTargetState>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "shader.wgsl".to_string(),
            bind_group_layouts: Vec::new(),
            cull_mode: Some(Face::Back),
            depth_format: None,
            depth_write: true,
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8Unorm,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
        }
    }
}

impl PipelineConfig {
    /// Mesh pipeline config for `key` drawing into `surface_format`
    pub fn for_key(key: PipelineKey, shader: &str, surface_format: TextureFormat) -> Self {
        Self {
            label: key.label(),
            shader: shader.to_string(),
            cull_mode: key.cull_mode(),
            depth_write: key.depth_write(),
            color_targets: vec![Some(ColorTargetState {
                format: surface_format,
                blend: Some(key.blend_state()),
                write_mask: ColorWrites::ALL,
            })],
            ..Default::default()
        }
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    /// Enables depth testing against a buffer of `format`
    pub fn with_depth_stencil(mut self, format: TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn with_color_targets(mut self, targets: Vec<Option<ColorTargetState>>) -> Self {
        self.color_targets = targets;
        self
    }
}

/// Caches render pipelines and creates them on first request
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    pipeline_configs: HashMap<PipelineKey, PipelineConfig>,
    shader_modules: HashMap<String, ShaderModule>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            pipeline_configs: HashMap::new(),
            shader_modules: HashMap::new(),
        }
    }

    /// Registers a configuration without creating the pipeline
    pub fn register_pipeline(&mut self, key: PipelineKey, config: PipelineConfig) {
        self.pipelines.remove(&key);
        self.pipeline_configs.insert(key, config);
    }

    pub fn load_shader(&mut self, name: &str, source: &str) {
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        self.shader_modules.insert(name.to_string(), shader_module);
    }

    /// Returns the pipeline for `key`, creating it from its config if needed
    pub fn get_pipeline(&mut self, key: PipelineKey) -> Result<&RenderPipeline, RenderError> {
        if !self.pipelines.contains_key(&key) {
            let config = self.pipeline_configs.get(&key).ok_or_else(|| {
                RenderError::MissingResource(format!("pipeline config {}", key.label()))
            })?;
            let pipeline = self.create_pipeline_from_config(config)?;
            log::debug!("Created {}", config.label);
            self.pipelines.insert(key, pipeline);
        }

        self.pipelines
            .get(&key)
            .ok_or_else(|| RenderError::MissingResource(key.label()))
    }

    pub fn has_pipeline(&self, key: PipelineKey) -> bool {
        self.pipeline_configs.contains_key(&key)
    }

    /// Number of pipelines created so far
    pub fn created_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Drops every created pipeline and shader module
    pub fn clear(&mut self) {
        self.pipelines.clear();
        self.pipeline_configs.clear();
        self.shader_modules.clear();
    }

    fn create_pipeline_from_config(
        &self,
        config: &PipelineConfig,
    ) -> Result<RenderPipeline, RenderError> {
        let shader = self.shader_modules.get(&config.shader).ok_or_else(|| {
            RenderError::MissingResource(format!("shader '{}'", config.shader))
        })?;

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: config.depth_write,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        Ok(self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex3D::desc()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            }))
    }
}
