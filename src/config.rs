//! Startup configuration
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys it
//! overrides. Parameter edits made at runtime are never written back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub render: RenderConfig,
    pub panel: PanelConfig,
    pub spin: SpinConfig,
    pub loader: LoaderConfig,
    pub assets: AssetManifest,
}

impl SandboxConfig {
    /// Loads a TOML configuration file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if !is_toml {
            return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads `path` when given and present, otherwise falls back to defaults.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::load_from_file(path)
            }
            Some(path) => {
                log::info!("Config {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Shapes".to_string(),
            width: 1200,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Starting distance along +Z
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            distance: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            pan_speed: 0.002,
            min_distance: 0.5,
            max_distance: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Ceiling applied to the window's device pixel ratio; values above 2 act as 2
    pub max_pixel_ratio: f64,
    pub clear_color: [f32; 3],
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            clear_color: [0.0, 0.0, 0.0],
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub title: String,
    pub width: f32,
    pub toggle_key: char,
    /// Folders start collapsed
    pub start_collapsed: bool,
    pub start_visible: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: "Debug UI Settings".to_string(),
            width: 300.0,
            toggle_key: 'h',
            start_collapsed: true,
            start_visible: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    /// Rotations per second
    pub default_speed: f32,
    /// Duration used when the speed is zero, and the ceiling for every other duration
    pub fallback_duration_secs: f32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            default_speed: 0.5,
            fallback_duration_secs: 9999.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub worker_threads: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { worker_threads: 2 }
    }
}

/// Asset paths, relative to `root`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManifest {
    pub root: PathBuf,
    pub door_color: String,
    pub door_alpha: String,
    pub door_ambient_occlusion: String,
    pub door_height: String,
    pub door_metalness: String,
    pub door_normal: String,
    pub door_roughness: String,
    pub matcap: String,
    pub gradient: String,
    pub rock_color: String,
    pub onyx_color: String,
    pub onyx_displacement: String,
    pub onyx_normal: String,
    pub onyx_roughness: String,
    pub transmission: Option<String>,
    /// Panoramic image used for reflections
    pub environment: Option<String>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            door_color: "textures/door/color.jpg".to_string(),
            door_alpha: "textures/door/alpha.jpg".to_string(),
            door_ambient_occlusion: "textures/door/ambientOcclusion.jpg".to_string(),
            door_height: "textures/door/height.jpg".to_string(),
            door_metalness: "textures/door/metalness.jpg".to_string(),
            door_normal: "textures/door/normal.jpg".to_string(),
            door_roughness: "textures/door/roughness.jpg".to_string(),
            matcap: "textures/matcaps/1.png".to_string(),
            gradient: "textures/gradients/3.jpg".to_string(),
            rock_color: "Rock052_1K-JPG/Rock052_1K-JPG_Color.jpg".to_string(),
            onyx_color: "Onyx002_1K-JPG/Onyx002_1K-JPG_Color.jpg".to_string(),
            onyx_displacement: "Onyx002_1K-JPG/Onyx002_1K-JPG_Displacement.jpg".to_string(),
            onyx_normal: "Onyx002_1K-JPG/Onyx002_1K-JPG_NormalDX.jpg".to_string(),
            onyx_roughness: "Onyx002_1K-JPG/Onyx002_1K-JPG_Roughness.jpg".to_string(),
            transmission: None,
            environment: None,
        }
    }
}
