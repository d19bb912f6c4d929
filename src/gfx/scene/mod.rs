//! # Scene Management Module
//!
//! The scene graph: nodes that pair a geometry with a material and a transform,
//! the active camera, lights, and the stores that own every geometry, material
//! and texture.
//!
//! ## Key Components
//!
//! - [`Scene`] - container addressed by typed ids
//! - [`Node`] - one drawable with its [`Transform`]
//! - [`Light`] - directional or ambient
//! - [`build_scene`] - assembles the fixed four-shape scene
//! - [`Vertex3D`] - interleaved vertex layout used by the renderer
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use shapes_sandbox::config::SandboxConfig;
//! use shapes_sandbox::gfx::resources::loader::{FileAssetSource, ResourceLoader};
//! use shapes_sandbox::gfx::scene::{build_camera, build_scene, Scene};
//!
//! let config = SandboxConfig::default();
//! let mut scene = Scene::new(build_camera(&config.camera, 1.5));
//! let source = Arc::new(FileAssetSource::new(&config.assets.root));
//! let mut loader = ResourceLoader::new(source, config.loader.worker_threads);
//! let built = build_scene(&mut scene, &mut loader, &config.assets);
//! assert_eq!(scene.node(built.cube).unwrap().material, built.shared_material);
//! ```

pub mod builder;
pub mod light;
pub mod object;
pub mod scene;
pub mod vertex;

pub use builder::{build_camera, build_scene, BuiltScene};
pub use light::Light;
pub use object::{Node, NodeId, Transform};
pub use scene::{GeometryId, Scene};
pub use vertex::Vertex3D;
