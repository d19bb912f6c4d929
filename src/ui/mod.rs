//! # Debug Panel
//!
//! Dear ImGui overlay for tweaking the scene at runtime.
//!
//! - [`UiManager`] wires imgui into winit input and the wgpu frame
//! - [`draw_panel`] turns a [`PanelModel`] into widgets and collects the edits
//!
//! Input the panel captures does not reach the orbit controls.
//!
//! [`PanelModel`]: crate::params::PanelModel

pub mod manager;
pub mod panel;

pub use manager::{InputClass, UiCapture, UiManager};
pub use panel::draw_panel;
