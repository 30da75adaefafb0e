//! Model data: meshes, parts, bones and per-part material descriptors.
//!
//! A [`Model`] is the externally loaded, structurally immutable mesh asset.
//! It is shared between instances via `Rc<Model>`; only the effects hanging
//! off its parts carry interior mutability. Instances snapshot whatever
//! per-asset state they need at construction (bind-pose bone transforms,
//! bounding sphere, material descriptors).

use std::rc::Rc;

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::data_structures::{
    bounding::BoundingSphere,
    effect::{self, EffectRef},
    texture::Texture,
};

/// Types that can describe their GPU vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// The vertex layout shared by all model geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// A node in the asset's rest-pose skeleton.
///
/// `transform` is parent-relative; loaders emit bones in traversal order so
/// a bone's parent index always precedes it.
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: Matrix4<f32>,
}

impl Bone {
    /// The identity root every loader inserts at index 0.
    pub fn root() -> Self {
        Self {
            name: "root".to_string(),
            parent: None,
            transform: Matrix4::identity(),
        }
    }
}

/// A slice of a mesh bound to one effect.
pub struct MeshPart {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// The part's authored effect, as assigned by the loader.
    pub effect: EffectRef,
}

/// One mesh of the asset, attached to a bone.
pub struct Mesh {
    pub name: String,
    pub parent_bone: usize,
    pub parts: Vec<MeshPart>,
}

/// The immutable mesh asset: one or more meshes plus a bone hierarchy.
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub bones: Vec<Bone>,
}

impl Model {
    /// Wrap a single mesh with an identity root bone.
    pub fn from_meshes(meshes: Vec<Mesh>) -> Rc<Self> {
        Rc::new(Self {
            meshes,
            bones: vec![Bone::root()],
        })
    }

    pub fn part_count(&self) -> usize {
        self.meshes.iter().map(|m| m.parts.len()).sum()
    }

    /// Rest-pose absolute transforms, one per bone, in bone order.
    ///
    /// Relies on the loader invariant that parents precede children.
    pub fn absolute_bone_transforms(&self) -> Vec<Matrix4<f32>> {
        let mut absolutes: Vec<Matrix4<f32>> = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let absolute = match bone.parent {
                Some(parent) => absolutes[parent] * bone.transform,
                None => bone.transform,
            };
            absolutes.push(absolute);
        }
        absolutes
    }

    /// The local-space sphere containing all mesh geometry.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_points(
            self.meshes
                .iter()
                .flat_map(|mesh| mesh.parts.iter())
                .flat_map(|part| part.vertices.iter())
                .map(|v| &v.position),
        )
    }
}

/// Material descriptor extracted from a part's authored effect, plus the
/// single-slot effect cache used by set-then-restore workflows.
#[derive(Clone)]
pub struct MeshPartMaterial {
    pub diffuse_color: Vector3<f32>,
    pub texture: Option<Rc<Texture>>,
    pub specular_power: f32,
    pub cached_effect: Option<EffectRef>,
}

impl MeshPartMaterial {
    /// Derive a descriptor from an effect that exposes the basic
    /// diffuse/specular slots. Effects without both slots yield `None`.
    ///
    /// The texture is captured only when the effect has texturing enabled;
    /// the stock effect's white placeholder binding is not a material
    /// texture.
    pub fn from_effect(e: &EffectRef) -> Option<Self> {
        let e = e.borrow();
        let diffuse_color = e.vec3(effect::DIFFUSE_COLOR)?;
        let specular_power = e.float(effect::SPECULAR_POWER)?;
        let texture = if e.bool_(effect::TEXTURE_ENABLED).unwrap_or(false) {
            e.texture(effect::BASIC_TEXTURE)
        } else {
            None
        };
        Some(Self {
            diffuse_color,
            texture,
            specular_power,
            cached_effect: None,
        })
    }
}
