//! Effects: shader parameter sets with capability-queried uniform slots.
//!
//! An [`Effect`] is a named uniform map standing in for a shader program's
//! parameter block. Callers never assume a uniform exists; they probe with
//! [`Effect::try_set_uniform`], which silently ignores writes to undeclared
//! slots. This makes "does this material support X" an explicit contract
//! instead of a reflection lookup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use cgmath::{Matrix4, Vector3, Vector4};

use crate::data_structures::texture::Texture;

/// Uniform names exposed by the stock basic effect.
///
/// Loaders and [`crate::data_structures::instance::ModelInstance`] address
/// uniforms by these names; custom effects opt into individual slots by
/// declaring them under the same name.
pub const WORLD: &str = "World";
pub const VIEW: &str = "View";
pub const PROJECTION: &str = "Projection";
pub const DIFFUSE_COLOR: &str = "DiffuseColor";
pub const BASIC_TEXTURE: &str = "BasicTexture";
pub const TEXTURE_ENABLED: &str = "TextureEnabled";
pub const SPECULAR_POWER: &str = "SpecularPower";
pub const SPECULAR_ENABLED: &str = "SpecularEnabled";
pub const CAMERA_POSITION: &str = "CameraPosition";
pub const CLIP_PLANE: &str = "ClipPlane";
pub const CLIP_PLANE_ENABLED: &str = "ClipPlaneEnabled";

/// A value bound to a named uniform slot.
#[derive(Clone, Debug)]
pub enum UniformValue {
    Bool(bool),
    Float(f32),
    Vec3(Vector3<f32>),
    Vec4(Vector4<f32>),
    Matrix(Matrix4<f32>),
    Texture(Rc<Texture>),
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(v: Vector3<f32>) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vector4<f32>> for UniformValue {
    fn from(v: Vector4<f32>) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(v: Matrix4<f32>) -> Self {
        UniformValue::Matrix(v)
    }
}

impl From<Rc<Texture>> for UniformValue {
    fn from(v: Rc<Texture>) -> Self {
        UniformValue::Texture(v)
    }
}

/// Shared mutable handle to an effect.
///
/// Mesh parts hold their active effect through this handle. Cloning the
/// handle shares the underlying effect; [`clone_detached`] produces an
/// independent copy. All access is single-threaded (render-thread only).
pub type EffectRef = Rc<RefCell<Effect>>;

/// Wrap an effect into a shared handle.
pub fn share(effect: Effect) -> EffectRef {
    Rc::new(RefCell::new(effect))
}

/// Deep-copy an effect behind a fresh handle.
///
/// Texture uniforms keep pointing at the same texture data; everything else
/// is independent.
pub fn clone_detached(effect: &EffectRef) -> EffectRef {
    share(effect.borrow().clone())
}

/// A shader parameter set: a name plus declared uniform slots.
///
/// The declared slot set is fixed after construction; `try_set_uniform`
/// overwrites existing slots but never adds new ones.
#[derive(Clone, Debug)]
pub struct Effect {
    name: String,
    uniforms: HashMap<String, UniformValue>,
}

impl Effect {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uniforms: HashMap::new(),
        }
    }

    /// The stock effect with the full basic uniform set declared at
    /// neutral defaults: white diffuse, texturing off against a 1x1 white
    /// placeholder, specular on. The texture slot must be declared here so
    /// a replacement basic effect can receive a part's texture.
    pub fn basic() -> Self {
        use cgmath::SquareMatrix;
        Self::new("basic")
            .with_uniform(WORLD, Matrix4::identity())
            .with_uniform(VIEW, Matrix4::identity())
            .with_uniform(PROJECTION, Matrix4::identity())
            .with_uniform(DIFFUSE_COLOR, Vector3::new(1.0, 1.0, 1.0))
            .with_uniform(BASIC_TEXTURE, Rc::new(Texture::white()))
            .with_uniform(TEXTURE_ENABLED, false)
            .with_uniform(SPECULAR_POWER, 16.0)
            .with_uniform(SPECULAR_ENABLED, true)
            .with_uniform(CAMERA_POSITION, Vector3::new(0.0, 0.0, 0.0))
            .with_uniform(CLIP_PLANE, Vector4::new(0.0, 0.0, 0.0, 0.0))
            .with_uniform(CLIP_PLANE_ENABLED, false)
    }

    /// Declare a uniform slot with an initial value.
    pub fn with_uniform(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.uniforms.insert(name.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Write a declared uniform slot.
    ///
    /// Returns `false` without side effects when the slot was never
    /// declared on this effect.
    pub fn try_set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        match self.uniforms.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    pub fn bool_(&self, name: &str) -> Option<bool> {
        match self.uniforms.get(name) {
            Some(UniformValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<Vector3<f32>> {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec3(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn vec4(&self, name: &str) -> Option<Vector4<f32>> {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec4(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn matrix(&self, name: &str) -> Option<Matrix4<f32>> {
        match self.uniforms.get(name) {
            Some(UniformValue::Matrix(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<Rc<Texture>> {
        match self.uniforms.get(name) {
            Some(UniformValue::Texture(v)) => Some(v.clone()),
            _ => None,
        }
    }
}
