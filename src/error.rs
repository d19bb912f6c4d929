//! Error types for the sandbox
//!
//! Each concern gets its own `thiserror` enum; [`SandboxError`] wraps them for the
//! lifecycle surface. Application bring-up uses `anyhow` on top of these.

use crate::gfx::resources::texture::TextureId;

/// Errors raised while reading the startup configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Errors raised by a single texture load
///
/// Load failures are never fatal; they are reported as events and the affected
/// slot falls back to a neutral texture.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to read asset {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to decode image {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("loader shut down before {0:?} completed")]
    Cancelled(TextureId),

    #[error("no loader worker accepted the request for {0}")]
    QueueClosed(String),
}

/// Errors reported by a render target
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("surface lost or outdated, frame skipped")]
    SurfaceLost,

    #[error("GPU out of memory")]
    OutOfMemory,

    #[error("surface error: {0}")]
    Surface(String),

    #[error("render target already disposed")]
    Disposed,

    #[error("missing GPU resource: {0}")]
    MissingResource(String),
}

/// Errors from the render loop state machine
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("render loop already running")]
    AlreadyRunning,

    #[error("render loop was stopped and cannot be restarted")]
    AlreadyStopped,
}

/// Errors from parameter edits
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("no parameter at index {0}")]
    Unknown(usize),

    #[error("no parameter {label} in folder {folder}")]
    NotFound { folder: String, label: String },

    #[error("parameter {label} expects a {expected} value")]
    KindMismatch {
        label: &'static str,
        expected: &'static str,
    },

    #[error("parameter {0} no longer has a target")]
    MissingTarget(&'static str),
}

/// Umbrella error for the lifecycle surface
#[derive(thiserror::Error, Debug)]
pub enum SandboxError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("sandbox has been torn down")]
    TornDown,
}

pub type Result<T, E = SandboxError> = std::result::Result<T, E>;
