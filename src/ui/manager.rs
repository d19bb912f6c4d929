//! ImGui integration with wgpu and winit
//!
//! Owns the imgui context, feeds it window input and draws its output as an
//! overlay on top of the rendered scene.

use imgui::{Context, FontConfig, FontSource, MouseCursor};
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use std::time::Instant;
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

use crate::error::RenderError;

/// Window events grouped by the imgui capture flag that governs them
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputClass {
    Pointer,
    Keyboard,
    Focus,
    Other,
}

impl InputClass {
    pub fn of(event: &WindowEvent) -> Self {
        match event {
            WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseInput { .. }
            | WindowEvent::MouseWheel { .. } => InputClass::Pointer,
            WindowEvent::KeyboardInput { .. } | WindowEvent::ModifiersChanged(_) => {
                InputClass::Keyboard
            }
            WindowEvent::Focused(_) => InputClass::Focus,
            _ => InputClass::Other,
        }
    }
}

/// imgui's `want_capture_mouse` / `want_capture_keyboard` after the last event
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct UiCapture {
    pub mouse: bool,
    pub keyboard: bool,
}

impl UiCapture {
    /// Whether an event of `class` stops at the panel
    ///
    /// Hovering the panel only captures pointer input; keys reach the app
    /// unless a widget holds keyboard focus. Focus changes are never kept.
    pub fn consumes(self, class: InputClass) -> bool {
        match class {
            InputClass::Pointer => self.mouse,
            InputClass::Keyboard => self.keyboard,
            InputClass::Focus | InputClass::Other => false,
        }
    }
}

pub struct UiManager {
    pub context: Context,
    platform: WinitPlatform,
    renderer: Renderer,
    last_frame: Instant,
    last_cursor: Option<MouseCursor>,
}

impl UiManager {
    /// Creates the imgui context and its wgpu renderer
    ///
    /// DPI is locked to 1.0; fonts are sized in physical pixels instead.
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating renderer resources
    /// * `queue` - WGPU queue for renderer operations
    /// * `output_color_format` - Format of the surface the panel is drawn onto
    /// * `window` - Window for platform integration
    /// * `font_size` - Panel font size in physical pixels
    pub fn new(
        device: &Device,
        queue: &Queue,
        output_color_format: TextureFormat,
        window: &Window,
        font_size: f32,
    ) -> Self {
        let mut context = Context::create();
        context.set_ini_filename(None);

        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(context.io_mut(), window, HiDpiMode::Locked(1.0));

        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        let renderer_config = RendererConfig {
            texture_format: output_color_format,
            ..Default::default()
        };
        let renderer = Renderer::new(&mut context, device, queue, renderer_config);

        Self {
            context,
            platform,
            renderer,
            last_frame: Instant::now(),
            last_cursor: None,
        }
    }

    pub fn update_display_size(&mut self, width: u32, height: u32) {
        self.context.io_mut().display_size = [width as f32, height as f32];
    }

    /// Feeds a window event to imgui
    ///
    /// # Arguments
    /// * `window` - Window the event came from
    /// * `window_id` - Id of that window
    /// * `event` - Event to forward; non-input events are ignored
    ///
    /// # Returns
    /// imgui's capture flags after the event. Pair them with [`InputClass::of`]
    /// through [`UiCapture::consumes`] to decide whether the event stops here.
    pub fn handle_window_event(
        &mut self,
        window: &Window,
        window_id: WindowId,
        event: &WindowEvent,
    ) -> UiCapture {
        if InputClass::of(event) == InputClass::Other {
            return UiCapture::default();
        }
        let ui_event: Event<()> = Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        self.platform
            .handle_event(self.context.io_mut(), window, &ui_event);
        self.capture()
    }

    pub fn capture(&self) -> UiCapture {
        let io = self.context.io();
        UiCapture {
            mouse: io.want_capture_mouse,
            keyboard: io.want_capture_keyboard,
        }
    }

    /// Builds one imgui frame with `run_ui` and returns what it produced
    pub fn update_logic<F, R>(&mut self, window: &Window, run_ui: F) -> R
    where
        F: FnOnce(&imgui::Ui) -> R,
    {
        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        if let Err(err) = self.platform.prepare_frame(self.context.io_mut(), window) {
            log::warn!("imgui frame preparation failed: {}", err);
        }

        let ui = self.context.new_frame();
        let output = run_ui(ui);

        if self.last_cursor != ui.mouse_cursor() {
            self.last_cursor = ui.mouse_cursor();
            self.platform.prepare_render(ui, window);
        }

        output
    }

    /// Draws the frame built by [`UiManager::update_logic`] over `color_attachment`
    pub fn render_display_only(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        color_attachment: &TextureView,
    ) -> Result<(), RenderError> {
        let draw_data = self.context.render();
        if draw_data.display_size[0] <= 0.0 || draw_data.display_size[1] <= 0.0 {
            return Ok(());
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("imgui_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.renderer
            .render(draw_data, queue, device, &mut render_pass)
            .map_err(|err| RenderError::Surface(format!("imgui: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;
    use winit::event::Modifiers;
    use winit::keyboard::ModifiersState;

    #[test]
    fn test_events_are_classified() {
        assert_eq!(
            InputClass::of(&WindowEvent::ModifiersChanged(Modifiers::from(ModifiersState::SHIFT))),
            InputClass::Keyboard
        );
        assert_eq!(InputClass::of(&WindowEvent::Focused(true)), InputClass::Focus);
        assert_eq!(
            InputClass::of(&WindowEvent::Resized(PhysicalSize::new(10, 10))),
            InputClass::Other
        );
    }

    #[test]
    fn test_mouse_capture_leaves_keys_alone() {
        let hovering = UiCapture {
            mouse: true,
            keyboard: false,
        };
        assert!(hovering.consumes(InputClass::Pointer));
        assert!(!hovering.consumes(InputClass::Keyboard));

        let typing = UiCapture {
            mouse: false,
            keyboard: true,
        };
        assert!(typing.consumes(InputClass::Keyboard));
        assert!(!typing.consumes(InputClass::Pointer));
        assert!(!UiCapture::default().consumes(InputClass::Focus));
    }
}
