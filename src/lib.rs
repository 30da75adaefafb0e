//! modelkit
//!
//! A renderable-model library: loaded model assets (meshes, bones,
//! materials) are shared immutably while lightweight instances carry the
//! mutable placement and effect state needed to draw them. Instances own
//! per-part effect bindings, so swapping shaders, caching and restoring
//! them, and feeding camera or clip-plane parameters never touches the
//! shared asset.
//!
//! High-level modules
//! - `context`: headless GPU context that owns device/queue and offscreen targets
//! - `data_structures`: model data, effects, instances, bounding volumes
//! - `pipelines`: render pipeline and bind group layout construction
//! - `resources`: helpers to load OBJ/glTF models and textures
//! - `render`: draw submission, batching and the WGPU backend
//!

pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod resources;
pub mod render;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
