//! Shapes Sandbox
//!
//! An interactive scene of four textured shapes with a damped orbit camera and
//! a debug panel for live material edits, rendered with wgpu inside a winit window.
//!
//! The lifecycle lives in [`lifecycle::Sandbox`], which is independent of the
//! window system; [`app::SandboxApp`] is the desktop shell around it.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod input;
pub mod lifecycle;
pub mod params;
pub mod render_loop;
pub mod tween;
pub mod ui;
pub mod viewport;
pub mod wgpu_utils;

pub use app::SandboxApp;
pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use lifecycle::{Sandbox, SandboxSnapshot};

/// Opens the sandbox window and blocks until it closes.
///
/// Logging defaults to `info` and honours `RUST_LOG`.
pub fn run(config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
    SandboxApp::run(config_path)
}
