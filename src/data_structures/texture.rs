//! Texture data and GPU texture creation utilities.
//!
//! [`Texture`] holds decoded image data on the CPU side so that effects can
//! reference textures without a GPU device in reach. [`GpuTexture`] wraps
//! the WGPU resources and is created from a [`Texture`] (or directly for
//! depth attachments) when a model is uploaded for drawing.

use anyhow::*;
use image::{ImageFormat, load_from_memory_with_format};

/// Decoded image data referenced by effect uniforms.
#[derive(Clone, Debug)]
pub struct Texture {
    pub name: String,
    pub rgba: image::RgbaImage,
    /// Whether the data is color (sRGB) rather than linear.
    pub srgb: bool,
}

impl Texture {
    /// Decode a texture from raw image file bytes (PNG, JPEG, etc.).
    ///
    /// `format` is an optional file format hint (e.g. "png"); when `None`
    /// the format is auto-detected from the data.
    pub fn from_bytes(bytes: &[u8], name: &str, format: Option<&str>) -> Result<Self> {
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => {
                let format = ImageFormat::from_extension(fmt)
                    .ok_or_else(|| anyhow!("unknown image format hint: {fmt}"))?;
                load_from_memory_with_format(bytes, format)?
            }
        };
        Ok(Self::from_image(&img, name))
    }

    pub fn from_image(img: &image::DynamicImage, name: &str) -> Self {
        Self {
            name: name.to_string(),
            rgba: img.to_rgba8(),
            srgb: true,
        }
    }

    /// A 1x1 solid white texture, used as the fallback binding for parts
    /// that have no texture so the pipeline layout never changes.
    pub fn white() -> Self {
        let mut rgba = image::RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 255, 255, 255]));
        Self {
            name: "white".to_string(),
            rgba,
            srgb: true,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }
}

/// A GPU texture with a view and sampler.
#[derive(Debug)]
pub struct GpuTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuTexture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture suitable as a `RENDER_ATTACHMENT` for
    /// depth-testing during model rendering.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload decoded image data to the GPU.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, source: &Texture) -> Self {
        let dimensions = source.dimensions();
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if source.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&source.name),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &source.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);
        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
