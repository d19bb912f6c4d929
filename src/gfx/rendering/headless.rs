use std::collections::VecDeque;

use crate::error::RenderError;
use crate::gfx::resources::material::MaterialId;
use crate::gfx::scene::Scene;
use crate::params::{PanelModel, ParamEdit};
use crate::viewport::ViewportContext;

use super::{draw_order, FrameOutput, RenderTarget};

/// One draw call as the GPU would have received it
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub node: String,
    pub material: MaterialId,
    pub color: [f32; 3],
    pub opacity: f32,
    pub blended: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub draws: Vec<DrawRecord>,
    pub pixel_ratio: f64,
    pub size: (u32, u32),
    pub aspect: f32,
    pub panel_shown: bool,
}

/// Render target without a GPU that records every frame
///
/// Edits queued with [`HeadlessTarget::queue_edit`] are reported by the next
/// frame that shows the panel, the way a user interaction would be.
#[derive(Debug, Default)]
pub struct HeadlessTarget {
    frames: Vec<FrameRecord>,
    pixel_ratio: f64,
    size: (u32, u32),
    resize_count: usize,
    pending_edits: VecDeque<ParamEdit>,
    disposed: bool,
}

impl HeadlessTarget {
    pub fn new() -> Self {
        Self {
            pixel_ratio: 1.0,
            size: (1, 1),
            ..Default::default()
        }
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn resize_count(&self) -> usize {
        self.resize_count
    }

    pub fn queue_edit(&mut self, edit: ParamEdit) {
        self.pending_edits.push_back(edit);
    }
}

impl RenderTarget for HeadlessTarget {
    fn resize(&mut self, viewport: &ViewportContext) {
        if self.disposed {
            return;
        }
        self.pixel_ratio = viewport.pixel_ratio();
        self.size = viewport.physical_size();
        self.resize_count += 1;
    }

    fn render(
        &mut self,
        scene: &Scene,
        panel: Option<&PanelModel>,
    ) -> Result<FrameOutput, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }

        let mut draws = Vec::new();
        for node in draw_order(scene) {
            let material = scene.material(node.material).ok_or_else(|| {
                RenderError::MissingResource(format!("material for node '{}'", node.name))
            })?;
            draws.push(DrawRecord {
                node: node.name.clone(),
                material: node.material,
                color: material.color,
                opacity: material.opacity,
                blended: material.is_blended(),
            });
        }

        let edits = if panel.is_some() {
            self.pending_edits.drain(..).collect()
        } else {
            Vec::new()
        };

        let draw_calls = draws.len();
        self.frames.push(FrameRecord {
            draws,
            pixel_ratio: self.pixel_ratio,
            size: self.size,
            aspect: scene.camera.aspect,
            panel_shown: panel.is_some(),
        });

        Ok(FrameOutput { draw_calls, edits })
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.pending_edits.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::gfx::camera::PerspectiveCamera;

    #[test]
    fn test_render_after_dispose_fails() {
        let scene = Scene::new(PerspectiveCamera::from_config(&CameraConfig::default(), 1.0));
        let mut target = HeadlessTarget::new();
        assert!(target.render(&scene, None).is_ok());

        target.dispose();
        assert!(matches!(
            target.render(&scene, None),
            Err(RenderError::Disposed)
        ));
        assert_eq!(target.frames().len(), 1);
    }

    #[test]
    fn test_edits_only_flow_while_panel_is_shown() {
        let scene = Scene::new(PerspectiveCamera::from_config(&CameraConfig::default(), 1.0));
        let panel = PanelModel {
            title: "Debug".to_string(),
            entries: Vec::new(),
        };
        let mut target = HeadlessTarget::new();
        target.queue_edit(ParamEdit::Trigger { index: 0 });

        assert!(target.render(&scene, None).unwrap().edits.is_empty());
        let output = target.render(&scene, Some(&panel)).unwrap();
        assert_eq!(output.edits, vec![ParamEdit::Trigger { index: 0 }]);
    }

    #[test]
    fn test_resize_tracks_capped_pixel_ratio() {
        let mut target = HeadlessTarget::new();
        target.resize(&ViewportContext::new(640.0, 480.0, 3.0, 2.0));
        assert_eq!(target.pixel_ratio(), 2.0);
        assert_eq!(target.size(), (1280, 960));
        assert_eq!(target.resize_count(), 1);
    }
}
