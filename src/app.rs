use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::SandboxConfig;
use crate::gfx::rendering::WgpuRenderTarget;
use crate::gfx::resources::loader::FileAssetSource;
use crate::input::{InputEvent, WinitFullscreen};
use crate::lifecycle::Sandbox;
use crate::ui::manager::{InputClass, UiCapture};
use crate::viewport::ViewportContext;

/// Pixels of wheel travel that count as one scroll line
const PIXELS_PER_LINE: f64 = 100.0;

/// Desktop shell: owns the window and turns winit events into sandbox input
pub struct SandboxApp {
    config: SandboxConfig,
    sandbox: Option<Sandbox<WgpuRenderTarget>>,
    pointer: PointerState,
    failed: Option<anyhow::Error>,
}

#[derive(Default)]
struct PointerState {
    position: Option<PhysicalPosition<f64>>,
    rotating: bool,
    panning: bool,
    shift: bool,
}

impl SandboxApp {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            sandbox: None,
            pointer: PointerState::default(),
            failed: None,
        }
    }

    /// Loads the config (or defaults) and runs the event loop until the window closes
    pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
        let config = SandboxConfig::load_or_default(config_path)?;
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = SandboxApp::new(config);
        event_loop.run_app(&mut app)?;

        match app.failed.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<Sandbox<WgpuRenderTarget>> {
        let attributes = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let viewport = viewport_for(&window, self.config.render.max_pixel_ratio);

        let target = pollster::block_on(WgpuRenderTarget::new(
            window.clone(),
            &viewport,
            &self.config.render,
            &self.config.panel,
        ))?;

        let source = Arc::new(FileAssetSource::new(self.config.assets.root.clone()));
        let sandbox = Sandbox::mount(
            self.config.clone(),
            target,
            source,
            Some(Box::new(WinitFullscreen::new(window))),
            viewport,
            Instant::now(),
        )?;
        Ok(sandbox)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.failed = Some(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut sandbox) = self.sandbox.take() {
            sandbox.teardown();
        }
        event_loop.exit();
    }

    fn translate(&mut self, window: &Window, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Character(text),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => text.chars().next().map(|key| InputEvent::KeyDown { key }),
            WindowEvent::Resized(size) => Some(resized(*size, window.scale_factor())),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                Some(resized(window.inner_size(), *scale_factor))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => {
                        self.pointer.rotating = pressed;
                        pressed.then(|| InputEvent::PrimaryPress { at: Instant::now() })
                    }
                    MouseButton::Right | MouseButton::Middle => {
                        self.pointer.panning = pressed;
                        None
                    }
                    _ => None,
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.pointer.position.replace(*position)?;
                if !self.pointer.rotating && !self.pointer.panning {
                    return None;
                }
                Some(InputEvent::PointerDrag {
                    dx: (position.x - previous.x) as f32,
                    dy: (position.y - previous.y) as f32,
                    pan: self.pointer.panning || self.pointer.shift,
                })
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.pointer.shift = modifiers.state().shift_key();
                None
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer = PointerState {
                    shift: self.pointer.shift,
                    ..PointerState::default()
                };
                None
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
                };
                Some(InputEvent::Scroll { delta: lines })
            }
            _ => None,
        }
    }
}

fn resized(size: PhysicalSize<u32>, scale_factor: f64) -> InputEvent {
    let logical = size.to_logical::<f64>(scale_factor);
    InputEvent::Resized {
        width: logical.width,
        height: logical.height,
        device_pixel_ratio: scale_factor,
    }
}

/// Feeds an event to the panel while it is shown; true when the panel keeps it
///
/// A hidden panel sees nothing, so its capture flags never go stale.
fn offer_to_panel(panel_visible: bool, class: InputClass, feed: impl FnOnce() -> UiCapture) -> bool {
    panel_visible && feed().consumes(class)
}

fn viewport_for(window: &Window, max_pixel_ratio: f64) -> ViewportContext {
    let scale_factor = window.scale_factor();
    let logical = window.inner_size().to_logical::<f64>(scale_factor);
    ViewportContext::new(logical.width, logical.height, scale_factor, max_pixel_ratio)
}

impl ApplicationHandler for SandboxApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.sandbox.is_some() {
            return;
        }
        match self.mount(event_loop) {
            Ok(sandbox) => self.sandbox = Some(sandbox),
            Err(err) => self.fail(event_loop, err.context("failed to start sandbox")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(sandbox) = self.sandbox.as_mut() else {
            return;
        };
        let window = sandbox.target().window().clone();
        if window.id() != window_id {
            return;
        }

        let kept = offer_to_panel(sandbox.panel_visible(), InputClass::of(&event), || {
            sandbox.target_mut().handle_window_event(window_id, &event)
        });
        if kept {
            window.request_redraw();
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
                return;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.shutdown(event_loop);
                return;
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = sandbox.tick(Instant::now()) {
                    self.fail(event_loop, err.into());
                }
                return;
            }
            _ => {}
        }

        if let Some(input) = self.translate(&window, &event) {
            if let Some(sandbox) = self.sandbox.as_mut() {
                sandbox.dispatch(input);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(sandbox) = self.sandbox.as_ref() {
            if sandbox.is_running() {
                sandbox.target().window().request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut sandbox) = self.sandbox.take() {
            sandbox.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::HeadlessTarget;
    use crate::gfx::resources::loader::MemoryAssetSource;
    use std::cell::Cell;

    const HOVERING: UiCapture = UiCapture {
        mouse: true,
        keyboard: false,
    };

    fn headless_sandbox() -> Sandbox<HeadlessTarget> {
        Sandbox::mount(
            SandboxConfig::default(),
            HeadlessTarget::new(),
            Arc::new(MemoryAssetSource::new()),
            None,
            ViewportContext::new(800.0, 600.0, 1.0, 2.0),
            Instant::now(),
        )
        .unwrap()
    }

    /// Mirrors `window_event`: the panel sees the key first, the sandbox gets it otherwise
    fn press(sandbox: &mut Sandbox<HeadlessTarget>, key: char, capture: UiCapture) -> bool {
        let kept = offer_to_panel(sandbox.panel_visible(), InputClass::Keyboard, || capture);
        !kept && sandbox.dispatch(InputEvent::KeyDown { key })
    }

    #[test]
    fn test_toggle_key_passes_hovered_panel() {
        let mut sandbox = headless_sandbox();
        assert!(sandbox.panel_visible());

        assert!(press(&mut sandbox, 'h', HOVERING));
        assert!(!sandbox.panel_visible());
        assert!(press(&mut sandbox, 'h', HOVERING));
        assert!(sandbox.panel_visible());
    }

    #[test]
    fn test_focused_widget_keeps_keys() {
        let mut sandbox = headless_sandbox();
        let typing = UiCapture {
            mouse: false,
            keyboard: true,
        };
        assert!(!press(&mut sandbox, 'h', typing));
        assert!(sandbox.panel_visible());
    }

    #[test]
    fn test_hovered_panel_keeps_pointer_input() {
        assert!(offer_to_panel(true, InputClass::Pointer, || HOVERING));
        assert!(!offer_to_panel(true, InputClass::Focus, || HOVERING));
        assert!(!offer_to_panel(true, InputClass::Other, || UiCapture {
            mouse: true,
            keyboard: true,
        }));
    }

    #[test]
    fn test_hidden_panel_is_not_fed() {
        let fed = Cell::new(false);
        let kept = offer_to_panel(false, InputClass::Pointer, || {
            fed.set(true);
            HOVERING
        });
        assert!(!kept);
        assert!(!fed.get());
    }
}
