use super::orbit_controls::OrbitControls;
use super::perspective_camera::PerspectiveCamera;
use crate::config::ControlsConfig;
use crate::input::InputEvent;

/// Turns pointer input into orbit deltas
///
/// Nothing moves here; the deltas are applied by [`OrbitControls::update`] on
/// the next tick.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32, pan_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed,
        }
    }

    pub fn from_config(config: &ControlsConfig) -> Self {
        Self::new(config.rotate_speed, config.zoom_speed, config.pan_speed)
    }

    /// Feeds one event into `controls`; returns false for non-orbit events
    pub fn process_event(
        &self,
        event: &InputEvent,
        controls: &mut OrbitControls,
        camera: &PerspectiveCamera,
    ) -> bool {
        match *event {
            InputEvent::PointerDrag { dx, dy, pan: true } => {
                // Pan distance scales with how far the camera is from its target
                let distance = controls.state().radius.max(1.0);
                controls.pan(
                    -dx * self.pan_speed * distance,
                    dy * self.pan_speed * distance,
                    camera,
                );
                true
            }
            InputEvent::PointerDrag { dx, dy, pan: false } => {
                controls.rotate_left(dx * self.rotate_speed);
                controls.rotate_up(dy * self.rotate_speed);
                true
            }
            InputEvent::Scroll { delta } => {
                controls.dolly((1.0 + self.zoom_speed).powf(-delta));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn setup() -> (CameraController, OrbitControls, PerspectiveCamera) {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        let config = ControlsConfig {
            enable_damping: false,
            ..Default::default()
        };
        (
            CameraController::from_config(&config),
            OrbitControls::new(&camera, &config),
            camera,
        )
    }

    #[test]
    fn test_scroll_zooms_in_and_out() {
        let (controller, mut controls, mut camera) = setup();
        controller.process_event(&InputEvent::Scroll { delta: 1.0 }, &mut controls, &camera);
        controls.update(&mut camera);
        let closer = controls.state().radius;
        assert!(closer < 3.0);

        controller.process_event(&InputEvent::Scroll { delta: -1.0 }, &mut controls, &camera);
        controls.update(&mut camera);
        assert!((controls.state().radius - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_drag_is_deferred_until_update() {
        let (controller, mut controls, mut camera) = setup();
        let drag = InputEvent::PointerDrag {
            dx: 100.0,
            dy: 0.0,
            pan: false,
        };
        assert!(controller.process_event(&drag, &mut controls, &camera));
        assert_eq!(camera.position.x, 0.0);

        assert!(controls.update(&mut camera));
        assert!(camera.position.x < 0.0);
    }

    #[test]
    fn test_shift_drag_pans_target() {
        let (controller, mut controls, mut camera) = setup();
        let drag = InputEvent::PointerDrag {
            dx: 0.0,
            dy: 50.0,
            pan: true,
        };
        controller.process_event(&drag, &mut controls, &camera);
        controls.update(&mut camera);
        assert!(controls.target.y > 0.0);
    }

    #[test]
    fn test_non_orbit_events_are_ignored() {
        let (controller, mut controls, camera) = setup();
        let handled =
            controller.process_event(&InputEvent::KeyDown { key: 'h' }, &mut controls, &camera);
        assert!(!handled);
        assert!(!controls.is_settling());
    }
}
