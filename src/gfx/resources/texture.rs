//! CPU-side texture model
//!
//! A [`Texture`] is created as a placeholder the moment a load is requested and
//! filled in when the loader delivers decoded pixels. Color interpretation and
//! sampling policy come from the texture's [`TextureRole`] and never change.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::LoadError;

/// Stable handle to a texture in a [`TextureStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

impl TextureId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// How stored texel values are interpreted by the shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Raw data, sampled as-is
    Linear,
    /// Display-encoded color, decoded to linear on sample
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Filtering and mip generation for one texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplingPolicy {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub generate_mipmaps: bool,
}

impl SamplingPolicy {
    /// Trilinear filtering with a full mip chain
    pub const SMOOTH: Self = Self {
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        generate_mipmaps: true,
    };

    /// Nearest-neighbor with no mips, keeps hard bands hard
    pub const DISCRETE: Self = Self {
        mag_filter: FilterMode::Nearest,
        min_filter: FilterMode::Nearest,
        generate_mipmaps: false,
    };
}

/// What a texture is used for; fixes its color space and sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Color,
    Alpha,
    AmbientOcclusion,
    Displacement,
    Metalness,
    Normal,
    Roughness,
    Transmission,
    /// Lookup ramp for toon shading
    Gradient,
    Matcap,
    /// Panoramic reflection image
    Environment,
}

impl TextureRole {
    pub fn color_space(self) -> ColorSpace {
        match self {
            TextureRole::Color
            | TextureRole::Gradient
            | TextureRole::Matcap
            | TextureRole::Environment => ColorSpace::Srgb,
            TextureRole::Alpha
            | TextureRole::AmbientOcclusion
            | TextureRole::Displacement
            | TextureRole::Metalness
            | TextureRole::Normal
            | TextureRole::Roughness
            | TextureRole::Transmission => ColorSpace::Linear,
        }
    }

    pub fn sampling(self) -> SamplingPolicy {
        match self {
            TextureRole::Gradient => SamplingPolicy::DISCRETE,
            _ => SamplingPolicy::SMOOTH,
        }
    }

    /// Texel used while the slot is unset, pending or failed
    ///
    /// Each value is the identity for how the shader combines that map.
    pub fn fallback_texel(self) -> [u8; 4] {
        match self {
            TextureRole::Normal => [128, 128, 255, 255],
            TextureRole::Displacement | TextureRole::Transmission | TextureRole::Environment => {
                [0, 0, 0, 255]
            }
            _ => [255, 255, 255, 255],
        }
    }
}

/// Load state of a texture's pixels
#[derive(Debug, Clone)]
pub enum TextureState {
    Pending,
    Ready(Arc<RgbaImage>),
    Failed(LoadError),
}

#[derive(Debug, Clone)]
pub struct Texture {
    /// Asset path, for logging
    pub source: String,
    pub role: TextureRole,
    pub color_space: ColorSpace,
    pub sampling: SamplingPolicy,
    /// UV pivot for rotation and repeat
    pub center: [f32; 2],
    pub rotation: f32,
    pub repeat: [f32; 2],
    state: TextureState,
    version: u64,
}

impl Texture {
    pub fn pending(source: impl Into<String>, role: TextureRole) -> Self {
        Self {
            source: source.into(),
            role,
            color_space: role.color_space(),
            sampling: role.sampling(),
            center: [0.0, 0.0],
            rotation: 0.0,
            repeat: [1.0, 1.0],
            state: TextureState::Pending,
            version: 0,
        }
    }

    pub fn with_center(mut self, u: f32, v: f32) -> Self {
        self.center = [u, v];
        self
    }

    pub fn state(&self) -> &TextureState {
        &self.state
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        match &self.state {
            TextureState::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, TextureState::Ready(_))
    }

    /// Bumped on every state change so GPU caches know when to re-upload
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Row-major 3x3 UV transform: translate(-center), scale(repeat), rotate, translate(center)
    pub fn uv_transform(&self) -> [[f32; 3]; 3] {
        let (s, c) = self.rotation.sin_cos();
        let [sx, sy] = self.repeat;
        let [cx, cy] = self.center;
        [
            [sx * c, sx * s, -sx * (c * cx + s * cy) + cx],
            [-sy * s, sy * c, -sy * (-s * cx + c * cy) + cy],
            [0.0, 0.0, 1.0],
        ]
    }

    fn set_state(&mut self, state: TextureState) {
        self.state = state;
        self.version += 1;
    }
}

/// Owns every texture in the scene, addressed by [`TextureId`]
#[derive(Debug, Default)]
pub struct TextureStore {
    textures: BTreeMap<TextureId, Texture>,
    next_id: u32,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: Texture) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, texture);
        id
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id)
    }

    pub fn get_mut(&mut self, id: TextureId) -> Option<&mut Texture> {
        self.textures.get_mut(&id)
    }

    /// Stores decoded pixels; returns false when the texture is gone
    pub fn set_ready(&mut self, id: TextureId, image: Arc<RgbaImage>) -> bool {
        match self.textures.get_mut(&id) {
            Some(texture) => {
                texture.set_state(TextureState::Ready(image));
                true
            }
            None => false,
        }
    }

    pub fn set_failed(&mut self, id: TextureId, error: LoadError) -> bool {
        match self.textures.get_mut(&id) {
            Some(texture) => {
                texture.set_state(TextureState::Failed(error));
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: TextureId) -> Option<Texture> {
        self.textures.remove(&id)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &Texture)> {
        self.textures.iter().map(|(id, texture)| (*id, texture))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_color_space_tagging() {
        for role in [
            TextureRole::Color,
            TextureRole::Matcap,
            TextureRole::Environment,
            TextureRole::Gradient,
        ] {
            assert_eq!(role.color_space(), ColorSpace::Srgb, "{role:?}");
        }
        for role in [
            TextureRole::Normal,
            TextureRole::Roughness,
            TextureRole::Displacement,
            TextureRole::Metalness,
            TextureRole::Alpha,
            TextureRole::AmbientOcclusion,
            TextureRole::Transmission,
        ] {
            assert_eq!(role.color_space(), ColorSpace::Linear, "{role:?}");
        }
    }

    #[test]
    fn test_gradient_is_nearest_without_mips() {
        let gradient = Texture::pending("gradients/3.jpg", TextureRole::Gradient);
        assert_eq!(gradient.sampling.mag_filter, FilterMode::Nearest);
        assert_eq!(gradient.sampling.min_filter, FilterMode::Nearest);
        assert!(!gradient.sampling.generate_mipmaps);

        let color = Texture::pending("door/color.jpg", TextureRole::Color);
        assert!(color.sampling.generate_mipmaps);
    }

    #[test]
    fn test_state_changes_bump_version() {
        let mut store = TextureStore::new();
        let id = store.insert(Texture::pending("a.png", TextureRole::Color));
        assert_eq!(store.get(id).unwrap().version(), 0);

        assert!(store.set_ready(id, Arc::new(RgbaImage::new(1, 1))));
        assert_eq!(store.get(id).unwrap().version(), 1);
        assert!(store.get(id).unwrap().is_ready());

        store.remove(id);
        assert!(!store.set_ready(id, Arc::new(RgbaImage::new(1, 1))));
        assert!(!store.set_failed(id, LoadError::NotFound("a.png".into())));
    }

    #[test]
    fn test_uv_transform_identity_and_center_rotation() {
        let texture = Texture::pending("a.png", TextureRole::Color).with_center(0.5, 0.5);
        let m = texture.uv_transform();
        assert_eq!(m, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

        let mut rotated = texture.clone();
        rotated.rotation = std::f32::consts::PI;
        let m = rotated.uv_transform();
        // The pivot stays fixed
        let px = m[0][0] * 0.5 + m[0][1] * 0.5 + m[0][2];
        let py = m[1][0] * 0.5 + m[1][1] * 0.5 + m[1][2];
        assert!((px - 0.5).abs() < 1e-5 && (py - 0.5).abs() < 1e-5);
        // (0, 0) maps to (1, 1)
        assert!((m[0][2] - 1.0).abs() < 1e-5 && (m[1][2] - 1.0).abs() < 1e-5);
    }
}
