//! Per-instance transform state and effect management for a model asset.
//!
//! A [`ModelInstance`] wraps a shared, immutable [`Model`] with everything
//! one placed copy of it needs: position/rotation/scale, a snapshot of the
//! asset's bind-pose bone transforms, a base bounding sphere, and per-part
//! active effects that can be swapped, cached and restored.

use std::rc::Rc;

use cgmath::{Matrix4, Rad, Vector3, Vector4};

use crate::{
    data_structures::{
        bounding::BoundingSphere,
        effect::{self, EffectRef},
        model::{MeshPartMaterial, Model},
    },
    render::DrawMesh,
};

/// Per-part render state owned by an instance: the active effect and the
/// material descriptor extracted from the part's authored effect.
pub struct MeshPartState {
    pub effect: EffectRef,
    pub material: Option<MeshPartMaterial>,
}

/// A renderable placement of a model asset.
///
/// Transform fields are public and mutated in place; the world matrix is
/// recomputed from them on every query, so changes are visible on the next
/// draw or bounds query without any invalidation step.
pub struct ModelInstance {
    pub position: Vector3<f32>,
    /// Per-frame rotation as yaw (Y), pitch (X), roll (Z) in radians.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    /// Rotation applied before scaling, for assets authored with an
    /// inconvenient rest orientation.
    pub base_rotation: Vector3<f32>,
    model: Rc<Model>,
    bone_transforms: Vec<Matrix4<f32>>,
    base_bounding_sphere: BoundingSphere,
    /// Per-mesh part state, parallel to `model.meshes`.
    parts: Vec<Vec<MeshPartState>>,
}

/// `Matrix4` from yaw/pitch/roll angles: roll, then pitch, then yaw.
fn yaw_pitch_roll(angles: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_angle_y(Rad(angles.y))
        * Matrix4::from_angle_x(Rad(angles.x))
        * Matrix4::from_angle_z(Rad(angles.z))
}

impl ModelInstance {
    /// Wrap a model asset.
    ///
    /// Snapshots the asset's absolute bone transforms and bounding sphere,
    /// and extracts a [`MeshPartMaterial`] for every part whose authored
    /// effect exposes the basic diffuse/specular slots. Parts with other
    /// effect types are left without a descriptor and do not participate
    /// in descriptor-driven operations.
    pub fn new(model: Rc<Model>) -> Self {
        let bone_transforms = model.absolute_bone_transforms();
        let base_bounding_sphere = model.bounding_sphere();

        let parts = model
            .meshes
            .iter()
            .map(|mesh| {
                mesh.parts
                    .iter()
                    .enumerate()
                    .map(|(i, part)| {
                        let material = MeshPartMaterial::from_effect(&part.effect);
                        if material.is_none() {
                            log::debug!(
                                "mesh {} part {} has no basic material slots, skipping descriptor",
                                mesh.name,
                                i
                            );
                        }
                        MeshPartState {
                            effect: part.effect.clone(),
                            material,
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            base_rotation: Vector3::new(0.0, 0.0, 0.0),
            model,
            bone_transforms,
            base_bounding_sphere,
            parts,
        }
    }

    pub fn model(&self) -> &Rc<Model> {
        &self.model
    }

    /// Bind-pose absolute bone transforms, snapshotted at construction.
    pub fn bone_transforms(&self) -> &[Matrix4<f32>] {
        &self.bone_transforms
    }

    /// The current world matrix, recomputed on every call.
    ///
    /// Composition order (innermost first): base rotation, scale, rotation,
    /// translation. Callers relying on a different order will get visibly
    /// wrong results.
    pub fn world(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * yaw_pitch_roll(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
            * yaw_pitch_roll(self.base_rotation)
    }

    /// The base bounding sphere carried into world space by the current
    /// transform.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.base_bounding_sphere.transform(&self.world())
    }

    fn for_each_effect(&self, mut action: impl FnMut(&mut effect::Effect)) {
        for mesh_parts in &self.parts {
            for state in mesh_parts {
                action(&mut *state.effect.borrow_mut());
            }
        }
    }

    /// Push the world-space camera position into every active effect that
    /// exposes a `CameraPosition` uniform. Never fails.
    pub fn update_camera_position(&self, camera_pos: Vector3<f32>) {
        self.for_each_effect(|e| {
            e.try_set_uniform(effect::CAMERA_POSITION, camera_pos);
        });
    }

    /// Enable or disable clip-plane testing on every active effect.
    ///
    /// Disabling only writes the enabled flag; previously set plane
    /// coefficients are left in place. Callers that toggle a fixed plane
    /// rely on this, so it is kept rather than fixed.
    pub fn update_clip_plane(&self, plane: Option<Vector4<f32>>) {
        self.for_each_effect(|e| {
            e.try_set_uniform(effect::CLIP_PLANE_ENABLED, plane.is_some());
            if let Some(p) = plane {
                e.try_set_uniform(effect::CLIP_PLANE, p);
            }
        });
    }

    /// Snapshot every part's currently active effect into its descriptor's
    /// cache slot.
    ///
    /// There is one slot per part, not a stack: a second `cache_effects`
    /// before a restore overwrites the first snapshot (last cache wins).
    /// Parts without a material descriptor are skipped.
    pub fn cache_effects(&mut self) -> &mut Self {
        for mesh_parts in &mut self.parts {
            for state in mesh_parts {
                if let Some(material) = &mut state.material {
                    material.cached_effect = Some(state.effect.clone());
                }
            }
        }
        self
    }

    /// Reinstate each part's cached effect as its active effect, where a
    /// snapshot exists. Together with [`cache_effects`](Self::cache_effects)
    /// this forms an at-most-one-level save/restore pair.
    pub fn restore_cached_effects(&mut self) -> &mut Self {
        for mesh_parts in &mut self.parts {
            for state in mesh_parts {
                if let Some(cached) = state
                    .material
                    .as_ref()
                    .and_then(|m| m.cached_effect.clone())
                {
                    state.effect = cached;
                }
            }
        }
        self
    }

    /// Replace every part's active effect with `new_effect`, re-applying
    /// the part's stored material on top.
    ///
    /// With `clone = true` each part gets an independent copy; with
    /// `clone = false` all parts share the handle, so the per-part material
    /// writes land on one effect and the last part wins. Share only when
    /// every part is meant to look identical.
    ///
    /// Each uniform write is conditional on the target effect declaring the
    /// slot; unsupported slots are silently skipped. A part whose material
    /// has no texture gets texturing explicitly disabled rather than
    /// inheriting whatever the incoming effect had bound, and texturing is
    /// only enabled when the texture itself could be bound.
    pub fn set_effect(
        &mut self,
        new_effect: &EffectRef,
        clone: bool,
        allow_specular: bool,
    ) -> &mut Self {
        for mesh_parts in &mut self.parts {
            for state in mesh_parts {
                let to = if clone {
                    effect::clone_detached(new_effect)
                } else {
                    new_effect.clone()
                };
                if let Some(material) = &state.material {
                    let mut e = to.borrow_mut();
                    match &material.texture {
                        Some(texture) => {
                            // Only claim texturing when the texture write
                            // landed; an effect without the texture slot
                            // must not render against the white fallback
                            // while reporting itself textured.
                            let bound = e.try_set_uniform(effect::BASIC_TEXTURE, texture.clone());
                            e.try_set_uniform(effect::TEXTURE_ENABLED, bound);
                        }
                        None => {
                            e.try_set_uniform(effect::TEXTURE_ENABLED, false);
                        }
                    }
                    e.try_set_uniform(effect::DIFFUSE_COLOR, material.diffuse_color);
                    e.try_set_uniform(effect::SPECULAR_POWER, material.specular_power);
                    e.try_set_uniform(effect::SPECULAR_ENABLED, allow_specular);
                }
                state.effect = to;
            }
        }
        self
    }

    /// Active effects and materials for one mesh, in part order.
    pub fn mesh_parts(&self, mesh_index: usize) -> &[MeshPartState] {
        &self.parts[mesh_index]
    }

    /// Submit the instance for drawing.
    ///
    /// Meshes are visited in the asset's declared order; each mesh's local
    /// world matrix chains its bone's bind-pose transform onto the instance
    /// transform. No sorting or culling happens here; what a draw call
    /// actually does is up to the renderer.
    pub fn draw<R: DrawMesh>(
        &self,
        renderer: &mut R,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
    ) {
        let base_world = self.world();
        for (i, mesh) in self.model.meshes.iter().enumerate() {
            let local_world = base_world * self.bone_transforms[mesh.parent_bone];
            for state in &self.parts[i] {
                let mut e = state.effect.borrow_mut();
                e.try_set_uniform(effect::WORLD, local_world);
                e.try_set_uniform(effect::VIEW, view);
                e.try_set_uniform(effect::PROJECTION, projection);
            }
            renderer.draw_mesh(i, mesh, &self.parts[i]);
        }
    }
}
