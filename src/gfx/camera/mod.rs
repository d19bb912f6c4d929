pub mod camera_controller;
pub mod camera_utils;
pub mod orbit_controls;
pub mod perspective_camera;

pub use camera_controller::CameraController;
pub use camera_utils::{Camera, CameraUniform};
pub use orbit_controls::{ControlState, OrbitControls};
pub use perspective_camera::PerspectiveCamera;
