//! Damped orbit controls
//!
//! Input adds to pending spherical and pan deltas; [`OrbitControls::update`]
//! applies a fraction of them each frame and decays the rest, which gives the
//! camera its glide after a drag ends.

use cgmath::*;

use super::perspective_camera::PerspectiveCamera;
use crate::config::ControlsConfig;

const EPS: f32 = 1e-6;

/// Snapshot of the orbit state, used for change detection and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub target: Point3<f32>,
    /// Angle around +Y, measured from +Z
    pub azimuth: f32,
    /// Angle down from +Y
    pub polar: f32,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,

    azimuth: f32,
    polar: f32,
    radius: f32,

    azimuth_delta: f32,
    polar_delta: f32,
    pan_offset: Vector3<f32>,
    scale: f32,
}

impl OrbitControls {
    /// Creates controls orbiting `camera.target` from the camera's current position
    pub fn new(camera: &PerspectiveCamera, config: &ControlsConfig) -> Self {
        let mut controls = Self {
            target: camera.target,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            min_polar: 0.0,
            max_polar: std::f32::consts::PI,
            azimuth: 0.0,
            polar: 0.0,
            radius: 0.0,
            azimuth_delta: 0.0,
            polar_delta: 0.0,
            pan_offset: Vector3::zero(),
            scale: 1.0,
        };
        controls.sync_from_camera(camera);
        controls
    }

    pub fn state(&self) -> ControlState {
        ControlState {
            target: self.target,
            azimuth: self.azimuth,
            polar: self.polar,
            radius: self.radius,
        }
    }

    /// Orbit horizontally; positive moves the camera to its left
    pub fn rotate_left(&mut self, angle: f32) {
        self.azimuth_delta -= angle;
    }

    /// Orbit vertically; positive moves the camera upward
    pub fn rotate_up(&mut self, angle: f32) {
        self.polar_delta -= angle;
    }

    /// Moves the target in the camera's screen plane, in world units
    pub fn pan(&mut self, right: f32, up: f32, camera: &PerspectiveCamera) {
        let forward = camera.target - camera.position;
        if forward.magnitude2() < EPS {
            return;
        }
        let forward = forward.normalize();
        let screen_right = forward.cross(camera.up);
        if screen_right.magnitude2() < EPS {
            return;
        }
        let screen_right = screen_right.normalize();
        let screen_up = screen_right.cross(forward).normalize();

        self.pan_offset += screen_right * right + screen_up * up;
    }

    /// Scales the orbit radius; values below one move closer
    pub fn dolly(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.scale *= factor;
        }
    }

    /// True while undamped motion remains
    pub fn is_settling(&self) -> bool {
        self.azimuth_delta.abs() > EPS
            || self.polar_delta.abs() > EPS
            || self.pan_offset.magnitude2() > EPS * EPS
            || (self.scale - 1.0).abs() > EPS
    }

    /// Applies pending input to `camera`; returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let before = self.state();
        let position_before = camera.position;
        self.sync_from_camera(camera);

        if self.enable_damping {
            self.azimuth += self.azimuth_delta * self.damping_factor;
            self.polar += self.polar_delta * self.damping_factor;
        } else {
            self.azimuth += self.azimuth_delta;
            self.polar += self.polar_delta;
        }

        let min_polar = self.min_polar.max(EPS);
        let max_polar = self.max_polar.min(std::f32::consts::PI - EPS);
        self.polar = self.polar.clamp(min_polar, max_polar);

        self.radius = (self.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        let position = self.target + self.offset();
        let moved = (position - position_before).magnitude2() > EPS * EPS
            || self.target != before.target;

        if self.enable_damping {
            self.azimuth_delta *= 1.0 - self.damping_factor;
            self.polar_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.azimuth_delta = 0.0;
            self.polar_delta = 0.0;
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        if moved {
            camera.position = position;
            camera.look_at(self.target);
            camera.update_view_proj();
        }
        moved
    }

    fn sync_from_camera(&mut self, camera: &PerspectiveCamera) {
        let offset = camera.position - self.target;
        self.radius = offset.magnitude();
        if self.radius < EPS {
            self.azimuth = 0.0;
            self.polar = std::f32::consts::FRAC_PI_2;
            return;
        }
        self.azimuth = offset.x.atan2(offset.z);
        self.polar = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
    }

    fn offset(&self) -> Vector3<f32> {
        let sin_polar_radius = self.polar.sin() * self.radius;
        Vector3::new(
            sin_polar_radius * self.azimuth.sin(),
            self.polar.cos() * self.radius,
            sin_polar_radius * self.azimuth.cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn setup(enable_damping: bool) -> (PerspectiveCamera, OrbitControls) {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        let config = ControlsConfig {
            enable_damping,
            ..Default::default()
        };
        let controls = OrbitControls::new(&camera, &config);
        (camera, controls)
    }

    #[test]
    fn test_initial_state_from_camera() {
        let (_, controls) = setup(true);
        let state = controls.state();
        assert!((state.radius - 3.0).abs() < 1e-6);
        assert!(state.azimuth.abs() < 1e-6);
        assert!((state.polar - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_idle_update_does_not_move_camera() {
        let (mut camera, mut controls) = setup(true);
        let before = camera;
        assert!(!controls.update(&mut camera));
        assert_eq!(camera.position, before.position);
    }

    #[test]
    fn test_undamped_rotation_applies_fully() {
        let (mut camera, mut controls) = setup(false);
        controls.rotate_left(-std::f32::consts::FRAC_PI_2);
        assert!(controls.update(&mut camera));

        // Quarter turn around +Y brings the camera from +Z to +X
        assert!((camera.position.x - 3.0).abs() < 1e-4);
        assert!(camera.position.z.abs() < 1e-4);
        assert!(!controls.is_settling());
    }

    #[test]
    fn test_damping_spreads_motion_over_frames() {
        let (mut camera, mut controls) = setup(true);
        controls.rotate_left(-1.0);

        controls.update(&mut camera);
        let first = controls.state().azimuth;
        assert!((first - 0.05).abs() < 1e-4);
        assert!(controls.is_settling());

        for _ in 0..400 {
            controls.update(&mut camera);
        }
        // Geometric series converges on the full delta
        assert!((controls.state().azimuth - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_polar_angle_is_clamped_away_from_poles() {
        let (mut camera, mut controls) = setup(false);
        controls.rotate_up(10.0);
        controls.update(&mut camera);
        let polar = controls.state().polar;
        assert!(polar > 0.0 && polar < 0.01);
        assert!(camera.position.y > 2.99);
    }

    #[test]
    fn test_dolly_respects_distance_bounds() {
        let (mut camera, mut controls) = setup(false);
        controls.dolly(1e-3);
        controls.update(&mut camera);
        assert!((controls.state().radius - controls.min_distance).abs() < 1e-5);

        controls.dolly(1e6);
        controls.update(&mut camera);
        assert!((controls.state().radius - controls.max_distance).abs() < 1e-3);
    }

    #[test]
    fn test_pan_moves_target_and_camera_together() {
        let (mut camera, mut controls) = setup(false);
        controls.pan(1.0, 0.0, &camera);
        controls.update(&mut camera);

        assert!((controls.target.x - 1.0).abs() < 1e-5);
        assert!((camera.position.x - 1.0).abs() < 1e-5);
        assert!((camera.position.z - 3.0).abs() < 1e-5);
    }
}
