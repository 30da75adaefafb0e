//! Central GPU context owning device, queue and the offscreen render
//! targets. The context is headless: rendering goes into an internal
//! color texture that can be read back as an image, which keeps the
//! drawing path identical between applications and integration tests.

use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};

use crate::data_structures::texture::GpuTexture;

/// Texture format of the offscreen color target.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub clear_colour: wgpu::Color,
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_texture: GpuTexture,
    width: u32,
    height: u32,
}

impl Context {
    pub async fn new(width: u32, height: u32) -> Result<Self> {
        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter found")?;
        log::debug!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let (color_texture, color_view) = Self::mk_color_target(&device, width, height);
        let depth_texture =
            GpuTexture::create_depth_texture(&device, [width, height], "depth_texture");

        Ok(Self {
            device,
            queue,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            color_texture,
            color_view,
            depth_texture,
            width,
            height,
        })
    }

    /// Synchronous constructor for callers without an async runtime.
    pub fn new_blocking(width: u32, height: u32) -> Result<Self> {
        futures::executor::block_on(Self::new(width, height))
    }

    fn mk_color_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("color_target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        COLOR_FORMAT
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy the offscreen color target into a CPU image.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_to_image(&self) -> Result<image::RgbaImage> {
        let u32_size = std::mem::size_of::<u32>() as u32;
        // Rows in a texture-to-buffer copy must be 256-byte aligned.
        let unpadded_bytes_per_row = u32_size * self.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded_bytes_per_row * self.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: None,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let image = futures::executor::block_on(async {
            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let buffer_slice = output_buffer.slice(..);
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                tx.send(result).unwrap();
            });
            self.device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: Some(Duration::from_secs(3)),
                })
                .map_err(|e| anyhow!("GPU poll failed: {e:?}"))?;
            rx.receive()
                .await
                .context("readback channel closed")?
                .context("buffer mapping failed")?;

            let data = buffer_slice.get_mapped_range();
            let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * self.height) as usize);
            for row in data.chunks(padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
            }
            image::RgbaImage::from_raw(self.width, self.height, pixels)
                .context("readback size mismatch")
        })?;
        output_buffer.unmap();
        Ok(image)
    }
}
