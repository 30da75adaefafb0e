//! Engine data structures: models, effects, textures, and instances.
//!
//! This module contains the core data types for renderable models:
//!
//! - `model` contains the mesh asset: meshes, parts, bones, material descriptors
//! - `effect` contains the uniform-map effect abstraction and shared handles
//! - `texture` contains CPU texture data and the GPU texture wrapper
//! - `bounding` contains bounding-sphere computation and transforms
//! - `instance` holds per-instance transform state and effect swapping

use std::rc::Rc;

use crate::data_structures::{instance::ModelInstance, model::Model};

pub mod bounding;
pub mod effect;
pub mod instance;
pub mod model;
pub mod texture;

/// Convenience factory wrapping a freshly loaded asset into an instance.
pub fn instantiate(model: Rc<Model>) -> ModelInstance {
    ModelInstance::new(model)
}
