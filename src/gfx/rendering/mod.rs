//! Core rendering functionality
//!
//! [`RenderTarget`] is the draw-call surface the sandbox talks to. The wgpu
//! implementation draws to a window; [`HeadlessTarget`] records what would have
//! been drawn.

pub mod headless;
pub mod pipeline_manager;
pub mod render_engine;

pub use headless::{DrawRecord, FrameRecord, HeadlessTarget};
pub use pipeline_manager::{PipelineConfig, PipelineKey, PipelineManager};
pub use render_engine::WgpuRenderTarget;

use cgmath::{EuclideanSpace, InnerSpace, Vector3};

use crate::error::RenderError;
use crate::gfx::scene::{Node, Scene};
use crate::params::{PanelModel, ParamEdit};
use crate::viewport::ViewportContext;

/// What one rendered frame did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub draw_calls: usize,
    /// Edits made in the debug panel during this frame
    pub edits: Vec<ParamEdit>,
}

pub trait RenderTarget {
    /// Matches the drawing buffer to the viewport's physical size
    fn resize(&mut self, viewport: &ViewportContext);

    /// Draws `scene` through its camera, plus the panel when `panel` is given
    fn render(
        &mut self,
        scene: &Scene,
        panel: Option<&PanelModel>,
    ) -> Result<FrameOutput, RenderError>;

    /// Releases GPU resources; later renders fail with [`RenderError::Disposed`]
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

/// Visible nodes in draw order: opaque first, then blended back to front
pub fn draw_order(scene: &Scene) -> Vec<&Node> {
    let eye = scene.camera.position.to_vec();
    let blended = |node: &Node| {
        scene
            .material(node.material)
            .is_some_and(|material| material.is_blended())
    };
    let distance = |node: &Node| (node.transform.position - eye).magnitude2();

    let (mut transparent, opaque): (Vec<&Node>, Vec<&Node>) = scene
        .nodes()
        .iter()
        .filter(|node| node.visible)
        .partition(|node| blended(*node));

    transparent.sort_by(|a, b| distance(*b).total_cmp(&distance(*a)));

    let mut ordered = opaque;
    ordered.extend(transparent);
    ordered
}

/// World-space direction light travels for a directional light at `position`
pub(crate) fn light_direction(position: [f32; 3]) -> Vector3<f32> {
    let to_origin = -Vector3::from(position);
    if to_origin.magnitude2() > 0.0 {
        to_origin.normalize()
    } else {
        -Vector3::unit_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::gfx::camera::PerspectiveCamera;
    use crate::gfx::geometry::GeometryDesc;
    use crate::gfx::resources::material::Material;

    #[test]
    fn test_opaque_nodes_draw_before_transparent() {
        let mut scene = Scene::new(PerspectiveCamera::from_config(&CameraConfig::default(), 1.0));
        let geometry = scene.add_geometry(GeometryDesc::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        });
        let glass = scene.add_material(Material::basic("glass").with_opacity(0.5));
        let solid = scene.add_material(Material::physical("solid"));

        scene.add_node("near_glass", geometry, glass, Vector3::new(0.0, 0.0, 1.0));
        scene.add_node("far_glass", geometry, glass, Vector3::new(0.0, 0.0, -5.0));
        scene.add_node("solid", geometry, solid, Vector3::new(0.0, 0.0, 0.0));

        let names: Vec<&str> = draw_order(&scene)
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["solid", "far_glass", "near_glass"]);
    }

    #[test]
    fn test_light_direction_points_at_origin() {
        let direction = light_direction([2.0, 2.0, 5.0]);
        assert!((direction.magnitude() - 1.0).abs() < 1e-6);
        assert!(direction.z < 0.0 && direction.x < 0.0);
        assert_eq!(light_direction([0.0; 3]), -Vector3::unit_y());
    }
}
