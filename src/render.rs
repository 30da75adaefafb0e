//! Draw submission: the renderer seam, draw-list batching, and the WGPU
//! backend.
//!
//! [`ModelInstance::draw`] walks meshes in asset order and hands each one to
//! a [`DrawMesh`] implementation. The backend here is two-phase: a
//! [`DrawList`] first collects per-part uniform blocks and texture handles
//! while the instance is walked, then [`ModelRenderer::render`] writes the
//! uniform slots and replays the list inside a single render pass. Tests use
//! their own recording `DrawMesh` impls instead.
//!
//! # Key types
//!
//! - [`DrawMesh`] is the per-mesh draw submission seam
//! - [`DrawList`] batches draw calls with their flushed uniforms
//! - [`GpuModel`] holds uploaded vertex/index buffers per mesh part
//! - [`ModelRenderer`] owns the pipeline and uniform/texture bind groups

use std::{collections::HashMap, iter, num::NonZeroU64, rc::Rc};

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        effect::{self, Effect},
        instance::{MeshPartState, ModelInstance},
        model::{Mesh, Model},
        texture::{GpuTexture, Texture},
    },
    pipelines,
};

/// Uniform slot stride; matches the common minimum dynamic-offset alignment.
pub const UNIFORM_SLOT_SIZE: u64 = 256;

/// The renderer collaborator: receives one call per mesh, in asset order,
/// with world/view/projection already written into each part's effect.
pub trait DrawMesh {
    fn draw_mesh(&mut self, mesh_index: usize, mesh: &Mesh, parts: &[MeshPartState]);
}

/// The per-part uniform block flushed from an effect by slot name.
///
/// Exactly one 256-byte dynamic-offset slot. `material` packs the scalar
/// flags: specular power, specular enabled, texture enabled, clip enabled.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PartUniforms {
    world: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    diffuse_color: [f32; 4],
    camera_position: [f32; 4],
    clip_plane: [f32; 4],
    material: [f32; 4],
}

impl PartUniforms {
    /// Read the named slots the shader consumes out of an effect.
    /// Undeclared slots fall back to neutral values.
    pub fn from_effect(e: &Effect) -> Self {
        use cgmath::SquareMatrix;
        let matrix =
            |name| e.matrix(name).unwrap_or_else(cgmath::Matrix4::identity);
        let diffuse = e
            .vec3(effect::DIFFUSE_COLOR)
            .unwrap_or(cgmath::Vector3::new(1.0, 1.0, 1.0));
        let camera = e
            .vec3(effect::CAMERA_POSITION)
            .unwrap_or(cgmath::Vector3::new(0.0, 0.0, 0.0));
        let clip = e
            .vec4(effect::CLIP_PLANE)
            .unwrap_or(cgmath::Vector4::new(0.0, 0.0, 0.0, 0.0));
        let flag = |name| {
            if e.bool_(name).unwrap_or(false) { 1.0 } else { 0.0 }
        };
        Self {
            world: matrix(effect::WORLD).into(),
            view: matrix(effect::VIEW).into(),
            projection: matrix(effect::PROJECTION).into(),
            diffuse_color: [diffuse.x, diffuse.y, diffuse.z, 1.0],
            camera_position: [camera.x, camera.y, camera.z, 1.0],
            clip_plane: clip.into(),
            material: [
                e.float(effect::SPECULAR_POWER).unwrap_or(16.0),
                flag(effect::SPECULAR_ENABLED),
                flag(effect::TEXTURE_ENABLED),
                flag(effect::CLIP_PLANE_ENABLED),
            ],
        }
    }
}

/// One recorded part draw: where the geometry lives and what to bind.
pub struct DrawCall {
    pub mesh_index: usize,
    pub part_index: usize,
    pub uniforms: PartUniforms,
    pub texture: Option<Rc<Texture>>,
}

/// A `DrawMesh` impl that batches draw calls for later replay.
#[derive(Default)]
pub struct DrawList {
    pub calls: Vec<DrawCall>,
}

impl DrawMesh for DrawList {
    fn draw_mesh(&mut self, mesh_index: usize, _mesh: &Mesh, parts: &[MeshPartState]) {
        for (part_index, state) in parts.iter().enumerate() {
            let e = state.effect.borrow();
            self.calls.push(DrawCall {
                mesh_index,
                part_index,
                uniforms: PartUniforms::from_effect(&e),
                texture: if e.bool_(effect::TEXTURE_ENABLED).unwrap_or(false) {
                    e.texture(effect::BASIC_TEXTURE)
                } else {
                    None
                },
            });
        }
    }
}

/// Uploaded geometry for one mesh part.
pub struct GpuPart {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

/// Vertex/index buffers for a whole model, parallel to its mesh/part
/// structure. Texture binding stays with [`ModelRenderer`], since active
/// effects (and with them textures) change per instance.
pub struct GpuModel {
    parts: Vec<Vec<GpuPart>>,
}

impl GpuModel {
    pub fn new(device: &wgpu::Device, model: &Model) -> Self {
        let parts = model
            .meshes
            .iter()
            .map(|mesh| {
                mesh.parts
                    .iter()
                    .map(|part| {
                        let vertex_buffer =
                            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
                                contents: bytemuck::cast_slice(&part.vertices),
                                usage: wgpu::BufferUsages::VERTEX,
                            });
                        let index_buffer =
                            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some(&format!("{:?} Index Buffer", mesh.name)),
                                contents: bytemuck::cast_slice(&part.indices),
                                usage: wgpu::BufferUsages::INDEX,
                            });
                        GpuPart {
                            vertex_buffer,
                            index_buffer,
                            num_elements: part.indices.len() as u32,
                        }
                    })
                    .collect()
            })
            .collect();
        Self { parts }
    }

    pub fn part(&self, mesh_index: usize, part_index: usize) -> &GpuPart {
        &self.parts[mesh_index][part_index]
    }
}

/// The WGPU backend: pipeline, dynamic-offset uniform buffer and cached
/// texture bind groups.
pub struct ModelRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// Texture bind groups cached by texture data address. Each entry
    /// retains its `Rc<Texture>`, so an address can never be recycled by a
    /// different texture while its group is still cached.
    texture_groups: HashMap<usize, (Rc<Texture>, wgpu::BindGroup)>,
    white_group: wgpu::BindGroup,
    capacity: usize,
}

impl ModelRenderer {
    pub fn new(ctx: &Context) -> Self {
        let uniform_layout = pipelines::basic::uniform_layout(&ctx.device);
        let texture_layout = pipelines::basic::diffuse_layout(&ctx.device);
        let pipeline = pipelines::basic::mk_model_pipeline(
            &ctx.device,
            ctx.color_format(),
            &uniform_layout,
            &texture_layout,
        );

        let capacity = 16;
        let (uniform_buffer, uniform_bind_group) =
            Self::mk_uniform_buffer(&ctx.device, &uniform_layout, capacity);

        let white = GpuTexture::upload(&ctx.device, &ctx.queue, &Texture::white());
        let white_group = Self::mk_texture_group(&ctx.device, &texture_layout, &white);

        Self {
            pipeline,
            uniform_layout,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            texture_groups: HashMap::new(),
            white_group,
            capacity,
        }
    }

    fn mk_uniform_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        slots: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Part Uniform Buffer"),
            size: slots as u64 * UNIFORM_SLOT_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SLOT_SIZE),
                }),
            }],
            label: Some("part_uniform_bind_group"),
        });
        (buffer, bind_group)
    }

    fn mk_texture_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &GpuTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("part_texture_bind_group"),
        })
    }

    /// Grow the uniform buffer when a model needs more slots than the
    /// current allocation; the bind group is recreated alongside it.
    fn ensure_capacity(&mut self, device: &wgpu::Device, slots: usize) {
        if slots <= self.capacity {
            return;
        }
        let capacity = slots.next_power_of_two();
        let (buffer, bind_group) = Self::mk_uniform_buffer(device, &self.uniform_layout, capacity);
        self.uniform_buffer = buffer;
        self.uniform_bind_group = bind_group;
        self.capacity = capacity;
    }

    fn texture_group(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &Rc<Texture>,
    ) -> &wgpu::BindGroup {
        let key = Rc::as_ptr(texture) as usize;
        if !self.texture_groups.contains_key(&key) {
            let uploaded = GpuTexture::upload(device, queue, texture);
            let group = Self::mk_texture_group(device, &self.texture_layout, &uploaded);
            self.texture_groups.insert(key, (texture.clone(), group));
        }
        &self.texture_groups[&key].1
    }

    /// Draw one model instance into the context's offscreen target.
    ///
    /// Collects the instance's draw list, flushes one uniform slot per
    /// part, then replays the list in a single render pass. The pass
    /// clears color and depth, so one call renders one frame.
    pub fn render(
        &mut self,
        ctx: &Context,
        gpu_model: &GpuModel,
        instance: &ModelInstance,
        view: cgmath::Matrix4<f32>,
        projection: cgmath::Matrix4<f32>,
    ) -> anyhow::Result<()> {
        let mut list = DrawList::default();
        instance.draw(&mut list, view, projection);

        self.ensure_capacity(&ctx.device, list.calls.len());
        for (slot, call) in list.calls.iter().enumerate() {
            ctx.queue.write_buffer(
                &self.uniform_buffer,
                slot as u64 * UNIFORM_SLOT_SIZE,
                bytemuck::bytes_of(&call.uniforms),
            );
        }
        // Resolve texture groups before the pass borrows `self` immutably.
        for call in &list.calls {
            if let Some(texture) = &call.texture {
                self.texture_group(&ctx.device, &ctx.queue, texture);
            }
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Model Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Model Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: ctx.color_view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: ctx.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for (slot, call) in list.calls.iter().enumerate() {
                let part = gpu_model.part(call.mesh_index, call.part_index);
                if part.num_elements == 0 {
                    log::warn!("you attempted to render a mesh part with no indices");
                    continue;
                }
                let offset = (slot as u64 * UNIFORM_SLOT_SIZE) as u32;
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                let texture_group = match &call.texture {
                    Some(texture) => &self.texture_groups[&(Rc::as_ptr(texture) as usize)].1,
                    None => &self.white_group,
                };
                render_pass.set_bind_group(1, texture_group, &[]);
                render_pass.set_vertex_buffer(0, part.vertex_buffer.slice(..));
                render_pass.set_index_buffer(part.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..part.num_elements, 0, 0..1);
            }
        }
        ctx.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }
}
