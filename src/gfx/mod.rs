//! # Graphics Module
//!
//! Everything between the scene description and pixels on screen.
//!
//! - **Camera** ([`camera`]) - perspective camera and damped orbit controls
//! - **Geometry** ([`geometry`]) - procedural torus, box, cone and sphere meshes
//! - **Scene** ([`scene`]) - nodes, lights, and the fixed four-shape layout
//! - **Resources** ([`resources`]) - materials, textures and the background texture loader
//! - **Rendering** ([`rendering`]) - the [`RenderTarget`] seam with wgpu and headless backends
//!
//! [`RenderTarget`]: rendering::RenderTarget

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::{OrbitControls, PerspectiveCamera};
pub use rendering::{HeadlessTarget, RenderTarget, WgpuRenderTarget};
pub use scene::Scene;
