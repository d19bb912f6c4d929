//! Mount, per-frame tick and teardown of the sandbox
//!
//! [`Sandbox`] owns the scene and everything that mutates it. The window shell
//! feeds it [`InputEvent`]s and calls [`Sandbox::tick`] once per redraw; nothing
//! here knows about winit, so the whole lifecycle runs against a
//! [`HeadlessTarget`](crate::gfx::rendering::HeadlessTarget) in tests.

use std::sync::Arc;
use std::time::Instant;

use crate::config::SandboxConfig;
use crate::error::{ParamError, RenderError, Result, SandboxError};
use crate::gfx::camera::{CameraController, ControlState, OrbitControls, PerspectiveCamera};
use crate::gfx::rendering::{FrameOutput, RenderTarget};
use crate::gfx::resources::loader::{AssetSource, LoadEvent, ResourceLoader};
use crate::gfx::resources::material::{Material, MaterialId};
use crate::gfx::scene::{build_camera, build_scene, BuiltScene, Node, Scene};
use crate::input::{toggle_fullscreen, DoubleClickDetector, FullscreenApi, InputEvent, ListenerKind, ListenerSet};
use crate::params::{bind_scene_params, PanelModel, ParamContext, ParamEdit, ParamRegistry};
use crate::render_loop::{LoopState, RenderLoop};
use crate::tween::{TweenHandle, Tweener};
use crate::viewport::ViewportContext;

/// Everything a user could observe about the scene, camera and controls
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxSnapshot {
    pub camera: PerspectiveCamera,
    pub controls: ControlState,
    pub nodes: Vec<Node>,
    pub materials: Vec<(MaterialId, Material)>,
    pub rotation_speed: f32,
    pub viewport: ViewportContext,
}

pub struct Sandbox<T: RenderTarget> {
    config: SandboxConfig,
    scene: Scene,
    built: BuiltScene,
    loader: ResourceLoader,
    registry: ParamRegistry,
    tweens: Tweener,
    rotation_speed: f32,
    controls: OrbitControls,
    controller: CameraController,
    render_loop: RenderLoop,
    listeners: ListenerSet,
    double_click: DoubleClickDetector,
    fullscreen: Option<Box<dyn FullscreenApi>>,
    viewport: ViewportContext,
    panel_visible: bool,
    target: T,
    torn_down: bool,
}

impl<T: RenderTarget> Sandbox<T> {
    /// Builds the scene, starts texture loads and starts the render loop
    ///
    /// # Arguments
    /// * `config` - Settings for every subsystem
    /// * `target` - Where frames are drawn; resized right away when the viewport has area
    /// * `source` - Where texture bytes come from
    /// * `fullscreen` - Fullscreen control for double clicks, if the host has one
    /// * `viewport` - Initial viewport; also sets the camera aspect
    /// * `now` - Clock origin for the render loop
    ///
    /// # Returns
    /// A running sandbox. Texture loads are still in flight and show fallbacks until they land.
    pub fn mount(
        config: SandboxConfig,
        mut target: T,
        source: Arc<dyn AssetSource>,
        fullscreen: Option<Box<dyn FullscreenApi>>,
        viewport: ViewportContext,
        now: Instant,
    ) -> Result<Self> {
        let mut scene = Scene::new(build_camera(
            &config.camera,
            viewport.aspect().unwrap_or(1.0),
        ));

        let mut listeners = ListenerSet::new();
        for kind in ListenerKind::ALL {
            listeners.register(kind);
        }

        let mut loader = ResourceLoader::new(source, config.loader.worker_threads);
        let built = build_scene(&mut scene, &mut loader, &config.assets);
        let registry = bind_scene_params(&built, &config.spin);

        let controls = OrbitControls::new(&scene.camera, &config.controls);
        let controller = CameraController::from_config(&config.controls);

        if viewport.has_area() {
            target.resize(&viewport);
        }

        let mut render_loop = RenderLoop::new();
        render_loop.start(now)?;

        log::info!(
            "Sandbox mounted: {} node(s), {} texture load(s) in flight",
            scene.node_count(),
            loader.pending_count()
        );

        Ok(Self {
            rotation_speed: config.spin.default_speed,
            panel_visible: config.panel.start_visible,
            config,
            scene,
            built,
            loader,
            registry,
            tweens: Tweener::new(),
            controls,
            controller,
            render_loop,
            listeners,
            double_click: DoubleClickDetector::default(),
            fullscreen,
            viewport,
            target,
            torn_down: false,
        })
    }

    /// Runs one frame: drain loads, advance tweens and controls, render, apply panel edits.
    ///
    /// # Arguments
    /// * `now` - Frame timestamp; deltas are measured against the previous tick
    ///
    /// # Returns
    /// The frame's draw count and panel edits, or `Ok(None)` once the loop is stopped.
    /// A lost surface skips the frame and returns an empty output.
    pub fn tick(&mut self, now: Instant) -> Result<Option<FrameOutput>> {
        let Some(frame) = self.render_loop.begin_tick(now) else {
            return Ok(None);
        };

        for event in self.loader.poll(&mut self.scene.textures) {
            if let LoadEvent::Failed { path, error, .. } = event {
                log::debug!("Rendering fallback for {}: {}", path, error);
            }
        }

        self.tweens.update(frame.delta, &mut self.scene);
        self.controls.update(&mut self.scene.camera);

        let panel = self.panel_model();
        let output = match self.target.render(&self.scene, panel.as_ref()) {
            Ok(output) => output,
            Err(RenderError::SurfaceLost) => {
                log::warn!("Frame {} skipped: surface lost", frame.frame);
                return Ok(Some(FrameOutput::default()));
            }
            Err(err) => {
                log::error!("Frame {} failed: {}", frame.frame, err);
                return Err(err.into());
            }
        };

        for edit in &output.edits {
            if let Err(err) = self.apply_edit(*edit) {
                log::warn!("Panel edit {:?} rejected: {}", edit, err);
            }
        }

        Ok(Some(output))
    }

    /// Handles one input event; returns whether a listener consumed it
    pub fn dispatch(&mut self, event: InputEvent) -> bool {
        if !self.listeners.is_listening(ListenerKind::for_event(&event)) {
            return false;
        }

        match event {
            InputEvent::KeyDown { key } => {
                if key.to_ascii_lowercase() != self.config.panel.toggle_key.to_ascii_lowercase() {
                    return false;
                }
                self.panel_visible = !self.panel_visible;
                log::debug!("Panel visible: {}", self.panel_visible);
                true
            }
            InputEvent::Resized {
                width,
                height,
                device_pixel_ratio,
            } => {
                self.resize(width, height, device_pixel_ratio);
                true
            }
            InputEvent::PrimaryPress { at } => {
                if self.double_click.press(at) {
                    if let Some(fullscreen) = toggle_fullscreen(self.fullscreen.as_deref_mut()) {
                        log::debug!("Fullscreen: {}", fullscreen);
                    }
                }
                true
            }
            InputEvent::PointerDrag { .. } | InputEvent::Scroll { .. } => {
                self.controller
                    .process_event(&event, &mut self.controls, &self.scene.camera)
            }
        }
    }

    fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        if !self.viewport.resize(width, height, device_pixel_ratio) {
            log::debug!("Ignoring zero-area resize to {}x{}", width, height);
            return;
        }
        self.viewport.apply_to_camera(&mut self.scene.camera);
        self.target.resize(&self.viewport);
        log::debug!(
            "Viewport {}x{} at pixel ratio {}",
            width,
            height,
            self.viewport.pixel_ratio()
        );
    }

    /// Applies a panel edit through the parameter registry
    pub fn apply_edit(&mut self, edit: ParamEdit) -> Result<Option<TweenHandle>, ParamError> {
        let mut ctx = ParamContext {
            scene: &mut self.scene,
            tweens: &mut self.tweens,
            rotation_speed: &mut self.rotation_speed,
        };
        self.registry.apply(edit, &mut ctx)
    }

    /// Applies the edit to the parameter at `folder`/`label`
    pub fn edit_param(
        &mut self,
        folder: &str,
        label: &str,
        edit: impl FnOnce(usize) -> ParamEdit,
    ) -> Result<Option<TweenHandle>> {
        if self.torn_down {
            return Err(SandboxError::TornDown);
        }
        let index = self
            .registry
            .find(folder, label)
            .ok_or_else(|| ParamError::NotFound {
                folder: folder.to_string(),
                label: label.to_string(),
            })?;
        Ok(self.apply_edit(edit(index))?)
    }

    fn panel_model(&self) -> Option<PanelModel> {
        self.panel_visible.then(|| {
            self.registry
                .snapshot(&self.config.panel.title, &self.scene, self.rotation_speed)
        })
    }

    pub fn snapshot(&self) -> SandboxSnapshot {
        SandboxSnapshot {
            camera: self.scene.camera,
            controls: self.controls.state(),
            nodes: self.scene.nodes().to_vec(),
            materials: self
                .scene
                .materials
                .iter()
                .map(|(id, material)| (id, material.clone()))
                .collect(),
            rotation_speed: self.rotation_speed,
            viewport: self.viewport,
        }
    }

    /// Stops everything and releases every resource the sandbox created.
    ///
    /// Runs at most once; returns false on repeat calls.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;

        self.render_loop.stop();
        let cancelled = self.tweens.cancel_all();
        let listeners = self.listeners.clear();
        self.loader.shutdown();
        self.target.dispose();

        let nodes = self.scene.clear_nodes();
        for id in &self.built.geometries {
            self.scene.dispose_geometry(*id);
        }
        let mut released = 0;
        for id in &self.built.materials {
            released += self.scene.dispose_material(*id);
        }
        self.scene.dispose_environment();

        log::info!(
            "Sandbox torn down: {} node(s) removed, {} tween(s) cancelled, {} listener(s) removed, {} texture(s) released",
            nodes,
            cancelled,
            listeners,
            released
        );
        true
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn built(&self) -> &BuiltScene {
        &self.built
    }

    pub fn registry(&self) -> &ParamRegistry {
        &self.registry
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn tweens(&self) -> &Tweener {
        &self.tweens
    }

    pub fn viewport(&self) -> &ViewportContext {
        &self.viewport
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    /// True while the loop still wants redraws
    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn loop_state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<T: RenderTarget> Drop for Sandbox<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::HeadlessTarget;
    use crate::gfx::resources::loader::{encode_solid_png, MemoryAssetSource};
    use crate::gfx::scene::builder::{CONE, CUBE, SPHERE};
    use crate::params::{ParamValue, CUBE_FOLDER, SPHERE_FOLDER};
    use std::cell::RefCell;
    use std::f32::consts::TAU;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Default)]
    struct FullscreenLog {
        active: bool,
        requests: usize,
        exits: usize,
    }

    struct SharedFullscreen(Rc<RefCell<FullscreenLog>>);

    impl FullscreenApi for SharedFullscreen {
        fn is_fullscreen(&self) -> bool {
            self.0.borrow().active
        }

        fn request_fullscreen(&mut self) {
            let mut log = self.0.borrow_mut();
            log.active = true;
            log.requests += 1;
        }

        fn exit_fullscreen(&mut self) {
            let mut log = self.0.borrow_mut();
            log.active = false;
            log.exits += 1;
        }
    }

    fn viewport() -> ViewportContext {
        ViewportContext::new(800.0, 600.0, 1.0, 2.0)
    }

    fn mount_with(
        source: MemoryAssetSource,
        fullscreen: Option<Box<dyn FullscreenApi>>,
        now: Instant,
    ) -> Sandbox<HeadlessTarget> {
        Sandbox::mount(
            SandboxConfig::default(),
            HeadlessTarget::new(),
            Arc::new(source),
            fullscreen,
            viewport(),
            now,
        )
        .unwrap()
    }

    fn mount(now: Instant) -> Sandbox<HeadlessTarget> {
        mount_with(MemoryAssetSource::new(), None, now)
    }

    fn draw_color(sandbox: &Sandbox<HeadlessTarget>, node: &str) -> [f32; 3] {
        sandbox
            .target()
            .last_frame()
            .unwrap()
            .draws
            .iter()
            .find(|draw| draw.node == node)
            .unwrap()
            .color
    }

    #[test]
    fn test_one_tick_builds_full_scene() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        let output = sandbox.tick(start + Duration::from_millis(16)).unwrap().unwrap();

        let scene = sandbox.scene();
        assert_eq!(scene.node_count(), 4);
        assert_eq!(scene.camera_count(), 1);
        assert_eq!(scene.light_count(), 2);
        assert_eq!(output.draw_calls, 4);

        let cube = scene.node_by_name(CUBE).unwrap();
        let cone = scene.node_by_name(CONE).unwrap();
        assert_eq!(cube.material, cone.material);
        assert_eq!(sandbox.listener_count(), ListenerKind::ALL.len());
    }

    #[test]
    fn test_shared_material_edit_reaches_both_nodes() {
        let start = Instant::now();
        let mut sandbox = mount(start);

        sandbox
            .edit_param(CUBE_FOLDER, "color", |index| ParamEdit::Set {
                index,
                value: ParamValue::Color([0.9, 0.1, 0.3]),
            })
            .unwrap();
        sandbox.tick(start + Duration::from_millis(16)).unwrap();

        assert_eq!(draw_color(&sandbox, CUBE), [0.9, 0.1, 0.3]);
        assert_eq!(draw_color(&sandbox, CONE), [0.9, 0.1, 0.3]);
        assert_ne!(draw_color(&sandbox, SPHERE), [0.9, 0.1, 0.3]);
    }

    #[test]
    fn test_panel_edits_apply_after_render() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        let opacity = sandbox.registry().find(SPHERE_FOLDER, "opacity").unwrap();
        sandbox.target_mut().queue_edit(ParamEdit::Set {
            index: opacity,
            value: ParamValue::Scalar(0.25),
        });

        let material = sandbox.built().sphere_material;
        let before = sandbox.scene().material(material).unwrap().opacity;
        sandbox.tick(start + Duration::from_millis(16)).unwrap();

        // The frame that carried the edit was drawn with the old value
        let frame = sandbox.target().last_frame().unwrap();
        let sphere = frame.draws.iter().find(|draw| draw.node == SPHERE).unwrap();
        assert_eq!(sphere.opacity, before);
        let after = sandbox.scene().material(material).unwrap().opacity;
        assert!((after - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_spin_completes_one_turn() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        sandbox
            .edit_param(CUBE_FOLDER, "spin", |index| ParamEdit::Trigger { index })
            .unwrap()
            .unwrap();

        // Default speed 0.5 rot/s gives a two second turn; deltas are capped at 250 ms
        let mut now = start;
        for _ in 0..12 {
            now += Duration::from_millis(200);
            sandbox.tick(now).unwrap();
        }
        let cube = sandbox.scene().node_by_name(CUBE).unwrap();
        assert!((cube.transform.rotation.y - TAU).abs() < 1e-5);
        assert_eq!(sandbox.tweens().active_count(), 0);
    }

    #[test]
    fn test_resize_updates_aspect_and_caps_pixel_ratio() {
        let start = Instant::now();
        let mut sandbox = mount(start);

        assert!(sandbox.dispatch(InputEvent::Resized {
            width: 1000.0,
            height: 500.0,
            device_pixel_ratio: 3.0,
        }));
        assert_eq!(sandbox.scene().camera.aspect, 2.0);
        assert_eq!(sandbox.target().pixel_ratio(), 2.0);
        assert_eq!(sandbox.target().size(), (2000, 1000));

        let resizes = sandbox.target().resize_count();
        sandbox.dispatch(InputEvent::Resized {
            width: 0.0,
            height: 0.0,
            device_pixel_ratio: 1.0,
        });
        assert_eq!(sandbox.scene().camera.aspect, 2.0);
        assert_eq!(sandbox.target().resize_count(), resizes);
    }

    #[test]
    fn test_panel_toggle_changes_nothing_else() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        sandbox.tick(start + Duration::from_millis(16)).unwrap();
        let before = sandbox.snapshot();
        let visible = sandbox.panel_visible();

        assert!(sandbox.dispatch(InputEvent::KeyDown { key: 'h' }));
        assert_eq!(sandbox.panel_visible(), !visible);
        assert_eq!(sandbox.snapshot(), before);

        assert!(!sandbox.dispatch(InputEvent::KeyDown { key: 'x' }));
        assert_eq!(sandbox.panel_visible(), !visible);

        sandbox.tick(start + Duration::from_millis(32)).unwrap();
        let frame = sandbox.target().last_frame().unwrap();
        assert_eq!(frame.panel_shown, !visible);
    }

    #[test]
    fn test_double_click_toggles_fullscreen() {
        let start = Instant::now();
        let log = Rc::new(RefCell::new(FullscreenLog::default()));
        let mut sandbox = mount_with(
            MemoryAssetSource::new(),
            Some(Box::new(SharedFullscreen(log.clone()))),
            start,
        );

        sandbox.dispatch(InputEvent::PrimaryPress { at: start });
        sandbox.dispatch(InputEvent::PrimaryPress {
            at: start + Duration::from_millis(300),
        });
        assert!(log.borrow().active);

        sandbox.dispatch(InputEvent::PrimaryPress {
            at: start + Duration::from_millis(2000),
        });
        sandbox.dispatch(InputEvent::PrimaryPress {
            at: start + Duration::from_millis(2100),
        });
        assert!(!log.borrow().active);
        assert_eq!((log.borrow().requests, log.borrow().exits), (1, 1));
    }

    #[test]
    fn test_double_click_without_fullscreen_api_is_harmless() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        assert!(sandbox.dispatch(InputEvent::PrimaryPress { at: start }));
        assert!(sandbox.dispatch(InputEvent::PrimaryPress {
            at: start + Duration::from_millis(100),
        }));
    }

    #[test]
    fn test_unknown_param_is_reported() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        assert!(matches!(
            sandbox.edit_param("Nowhere", "nothing", |index| ParamEdit::Trigger { index }),
            Err(SandboxError::Param(ParamError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_teardown_releases_everything_once() {
        let start = Instant::now();
        let mut sandbox = mount(start);
        sandbox
            .edit_param(CUBE_FOLDER, "spin", |index| ParamEdit::Trigger { index })
            .unwrap();

        assert!(sandbox.teardown());
        assert!(!sandbox.teardown());

        assert_eq!(sandbox.loop_state(), LoopState::Stopped);
        assert!(!sandbox.is_running());
        assert_eq!(sandbox.tweens().active_count(), 0);
        assert_eq!(sandbox.listener_count(), 0);
        assert!(!sandbox.loader().is_mounted());
        assert!(sandbox.target().is_disposed());
        assert_eq!(sandbox.scene().geometry_count(), 0);
        assert!(sandbox.scene().materials.is_empty());
        assert!(sandbox.scene().textures.is_empty());
        assert_eq!(sandbox.scene().node_count(), 0);
        assert!(sandbox.scene().is_disposed());
        assert!(sandbox.snapshot().nodes.is_empty());

        assert!(sandbox.tick(start + Duration::from_millis(16)).unwrap().is_none());
        assert!(!sandbox.dispatch(InputEvent::KeyDown { key: 'h' }));
        assert!(matches!(
            sandbox.edit_param(CUBE_FOLDER, "spin", |index| ParamEdit::Trigger { index }),
            Err(SandboxError::TornDown)
        ));
    }

    #[test]
    fn test_load_finishing_after_teardown_is_discarded() {
        let start = Instant::now();
        let manifest = SandboxConfig::default().assets;
        let mut source = MemoryAssetSource::new();
        let gate = source.insert_gated(manifest.door_color.clone(), encode_solid_png(2, 2, [1, 2, 3, 255]));

        let mut sandbox = mount_with(source, None, start);
        sandbox.tick(start + Duration::from_millis(16)).unwrap();
        sandbox.teardown();
        gate.release();

        let deadline = Instant::now() + Duration::from_secs(5);
        while sandbox.loader().discarded_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(sandbox.loader().discarded_count() >= 1);
        assert!(sandbox.tick(start + Duration::from_millis(32)).unwrap().is_none());
        assert!(sandbox.scene().textures.is_empty());
    }
}
