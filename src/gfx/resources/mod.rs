//! Scene resources
//!
//! CPU-side textures and materials, the background loader that fills textures in,
//! and their GPU counterparts.

pub mod global_bindings;
pub mod loader;
pub mod material;
pub mod texture;
pub mod texture_resource;

pub use global_bindings::{GlobalBindings, GlobalUBO, GlobalUniform};
pub use loader::{AssetSource, FileAssetSource, LoadEvent, MemoryAssetSource, ResourceLoader};
pub use material::{Material, MaterialId, MaterialManager, ShadingModel, Side, TextureSlots};
pub use texture::{Texture, TextureId, TextureRole, TextureState, TextureStore};
pub use texture_resource::TextureResource;
