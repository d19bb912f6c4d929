use crate::gfx::camera::PerspectiveCamera;

/// Hard ceiling on the pixel ratio; configuration can lower it, never raise it
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Logical viewport size and the display's pixel density
///
/// Passed explicitly to whatever depends on the window size; nothing reads the
/// window directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportContext {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    /// Upper bound on the pixel ratio the render target uses, itself held to [`MAX_PIXEL_RATIO`]
    pub max_pixel_ratio: f64,
}

impl ViewportContext {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64, max_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
            max_pixel_ratio,
        }
    }

    /// `min(device_pixel_ratio, max_pixel_ratio, 2)`; non-positive ratios count as 1
    pub fn pixel_ratio(&self) -> f64 {
        let sane = |ratio: f64| ratio.is_finite() && ratio > 0.0;
        let dpr = if sane(self.device_pixel_ratio) {
            self.device_pixel_ratio
        } else {
            1.0
        };
        let cap = if sane(self.max_pixel_ratio) {
            self.max_pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            MAX_PIXEL_RATIO
        };
        dpr.min(cap)
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Width over height, or `None` for a zero-area viewport
    pub fn aspect(&self) -> Option<f32> {
        self.has_area().then(|| (self.width / self.height) as f32)
    }

    /// Drawing-buffer size in physical pixels, never zero
    pub fn physical_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        let w = (self.width * ratio).round().max(1.0) as u32;
        let h = (self.height * ratio).round().max(1.0) as u32;
        (w, h)
    }

    /// Stores a new size; returns whether the viewport has area afterwards
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> bool {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.device_pixel_ratio = device_pixel_ratio;
        self.has_area()
    }

    /// Copies the aspect ratio into `camera` and rebuilds its projection.
    ///
    /// Zero-area viewports leave the camera untouched.
    pub fn apply_to_camera(&self, camera: &mut PerspectiveCamera) -> bool {
        let Some(aspect) = self.aspect() else {
            return false;
        };
        camera.set_aspect(aspect);
        camera.update_projection_matrix();
        camera.update_view_proj();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, SandboxConfig};
    use rand::Rng;

    #[test]
    fn test_pixel_ratio_is_capped() {
        let mut viewport = ViewportContext::new(800.0, 600.0, 3.0, 2.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        assert_eq!(viewport.physical_size(), (1600, 1200));

        viewport.resize(800.0, 600.0, 1.25);
        assert_eq!(viewport.pixel_ratio(), 1.25);
        assert_eq!(viewport.physical_size(), (1000, 750));
    }

    #[test]
    fn test_configured_ratio_cannot_exceed_two() {
        let config = SandboxConfig::from_toml_str("[render]\nmax_pixel_ratio = 4.0").unwrap();
        let viewport = ViewportContext::new(800.0, 600.0, 3.0, config.render.max_pixel_ratio);
        assert_eq!(viewport.pixel_ratio(), MAX_PIXEL_RATIO);
        assert_eq!(viewport.physical_size(), (1600, 1200));

        let lowered = ViewportContext::new(800.0, 600.0, 3.0, 1.5);
        assert_eq!(lowered.pixel_ratio(), 1.5);
    }

    #[test]
    fn test_zero_area_keeps_camera_aspect() {
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.5);
        let mut viewport = ViewportContext::new(1200.0, 800.0, 1.0, 2.0);

        assert!(!viewport.resize(0.0, 800.0, 1.0));
        assert!(!viewport.apply_to_camera(&mut camera));
        assert_eq!(camera.aspect, 1.5);
        assert_eq!(viewport.physical_size(), (1, 800));
    }

    #[test]
    fn test_random_resizes_keep_aspect_and_ratio_cap() {
        let mut rng = rand::rng();
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        let mut viewport = ViewportContext::new(1.0, 1.0, 1.0, 8.0);

        for _ in 0..500 {
            let width = rng.random_range(1..4000) as f64;
            let height = rng.random_range(1..4000) as f64;
            let dpr = rng.random_range(0.5..4.0);

            assert!(viewport.resize(width, height, dpr));
            assert!(viewport.apply_to_camera(&mut camera));
            assert_eq!(camera.aspect, (width / height) as f32);
            assert!(viewport.pixel_ratio() <= 2.0);
        }
    }
}
