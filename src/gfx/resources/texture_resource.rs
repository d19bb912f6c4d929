//! GPU texture upload
//!
//! Turns decoded [`Texture`]s into wgpu textures, views and samplers, honoring the
//! color space and sampling policy of the texture's role.

use std::borrow::Cow;

use image::{imageops, RgbaImage};

use crate::gfx::resources::texture::{ColorSpace, FilterMode, SamplingPolicy, Texture, TextureRole};

/// GPU texture with its view and sampler
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth buffer matching the surface configuration
    pub fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads a ready texture, with a CPU-built mip chain when its policy asks for one.
    ///
    /// Images larger than the device's 2D texture limit are downscaled first.
    pub fn from_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &Texture,
        image: &RgbaImage,
    ) -> Self {
        let image = fit_to_limit(image, device.limits().max_texture_dimension_2d);
        if let Cow::Owned(scaled) = &image {
            log::warn!(
                "{} exceeds the device texture limit, uploading at {}x{}",
                texture.source,
                scaled.width(),
                scaled.height()
            );
        }
        let levels = if texture.sampling.generate_mipmaps {
            mip_chain(&image)
        } else {
            vec![image.into_owned()]
        };
        Self::upload(
            device,
            queue,
            &levels,
            texture_format(texture.color_space),
            texture.sampling,
            &texture.source,
        )
    }

    /// 1x1 texture holding the neutral value for `role`
    pub fn fallback(device: &wgpu::Device, queue: &wgpu::Queue, role: TextureRole) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(role.fallback_texel()));
        Self::upload(
            device,
            queue,
            &[image],
            texture_format(role.color_space()),
            SamplingPolicy {
                generate_mipmaps: false,
                ..role.sampling()
            },
            &format!("Fallback {:?}", role),
        )
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        levels: &[RgbaImage],
        format: wgpu::TextureFormat,
        sampling: SamplingPolicy,
        label: &str,
    ) -> Self {
        let (width, height) = levels
            .first()
            .map(|level| level.dimensions())
            .unwrap_or((1, 1));

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len().max(1) as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            let (level_width, level_height) = level.dimensions();
            let (data, bytes_per_row) = padded_rows(level.as_raw(), level_width, level_height);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu_filter(sampling.mag_filter),
            min_filter: wgpu_filter(sampling.min_filter),
            mipmap_filter: if sampling.generate_mipmaps {
                wgpu::FilterMode::Linear
            } else {
                wgpu::FilterMode::Nearest
            },
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn texture_format(color_space: ColorSpace) -> wgpu::TextureFormat {
    match color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    }
}

fn wgpu_filter(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// Largest size no wider or taller than `max` with the same aspect ratio
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let max = max.max(1);
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = |side: u32| ((side as u64 * max as u64) / longest as u64).max(1) as u32;
    (scale(width), scale(height))
}

/// Borrows `image` when it fits in `max`, otherwise returns a downscaled copy
pub fn fit_to_limit(image: &RgbaImage, max: u32) -> Cow<'_, RgbaImage> {
    let (width, height) = image.dimensions();
    let (fit_width, fit_height) = fit_within(width, height, max);
    if (fit_width, fit_height) == (width, height) {
        return Cow::Borrowed(image);
    }
    Cow::Owned(imageops::resize(
        image,
        fit_width,
        fit_height,
        imageops::FilterType::Triangle,
    ))
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Full mip chain down to 1x1, level 0 first
pub fn mip_chain(image: &RgbaImage) -> Vec<RgbaImage> {
    let (width, height) = image.dimensions();
    let count = mip_level_count(width, height);
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(image.clone());

    for level in 1..count {
        let level_width = (width >> level).max(1);
        let level_height = (height >> level).max(1);
        let previous = &levels[level as usize - 1];
        let next = imageops::resize(
            previous,
            level_width,
            level_height,
            imageops::FilterType::Triangle,
        );
        levels.push(next);
    }
    levels
}

/// Pads each RGBA row to the copy alignment; returns the data and its row pitch
fn padded_rows(data: &[u8], width: u32, height: u32) -> (Cow<'_, [u8]>, u32) {
    let row_bytes = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row_bytes = row_bytes.div_ceil(align) * align;
    if padded_row_bytes == row_bytes {
        return (Cow::Borrowed(data), row_bytes);
    }

    let mut padded = vec![0u8; (padded_row_bytes * height) as usize];
    for (src, dst) in data
        .chunks_exact(row_bytes as usize)
        .zip(padded.chunks_exact_mut(padded_row_bytes as usize))
    {
        dst[..row_bytes as usize].copy_from_slice(src);
    }
    (Cow::Owned(padded), padded_row_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(300, 20), 9);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn test_mip_chain_halves_to_one_pixel() {
        let image = RgbaImage::from_pixel(8, 4, image::Rgba([200, 100, 50, 255]));
        let levels = mip_chain(&image);
        let sizes: Vec<(u32, u32)> = levels.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
        assert_eq!(levels[3].get_pixel(0, 0), &image::Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn test_oversized_images_fit_the_limit() {
        assert_eq!(fit_within(8192, 4096, 4096), (4096, 2048));
        assert_eq!(fit_within(5000, 3, 4096), (4096, 2));
        assert_eq!(fit_within(1, 10000, 4096), (1, 4096));
        assert_eq!(fit_within(4096, 4096, 4096), (4096, 4096));
        assert_eq!(fit_within(300, 200, 4096), (300, 200));
    }

    #[test]
    fn test_fit_to_limit_only_copies_when_needed() {
        let image = RgbaImage::from_pixel(16, 8, image::Rgba([10, 20, 30, 255]));
        assert!(matches!(fit_to_limit(&image, 16), Cow::Borrowed(_)));

        let scaled = fit_to_limit(&image, 4);
        assert!(matches!(scaled, Cow::Owned(_)));
        assert_eq!(scaled.dimensions(), (4, 2));
        assert_eq!(scaled.get_pixel(1, 1), &image::Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_rows_are_padded_to_copy_alignment() {
        let data = vec![7u8; 3 * 2 * 4];
        let (padded, pitch) = padded_rows(&data, 3, 2);
        assert_eq!(pitch, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        assert_eq!(padded.len(), (pitch * 2) as usize);
        assert_eq!(&padded[pitch as usize..pitch as usize + 12], &data[12..]);
        assert_eq!(padded[12], 0);

        let aligned = vec![1u8; 64 * 4];
        let (unchanged, pitch) = padded_rows(&aligned, 64, 1);
        assert!(matches!(unchanged, Cow::Borrowed(_)));
        assert_eq!(pitch, 256);
    }

    #[test]
    fn test_format_follows_color_space() {
        assert_eq!(
            texture_format(TextureRole::Color.color_space()),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(
            texture_format(TextureRole::Roughness.color_space()),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }
}
