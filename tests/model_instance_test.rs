use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3, Vector4};
use modelkit::data_structures::{
    effect::{self, Effect, EffectRef},
    instance::{MeshPartState, ModelInstance},
    model::{Bone, Mesh, MeshPart, Model, ModelVertex},
    texture::Texture,
};
use modelkit::render::DrawMesh;

fn vertex(position: [f32; 3]) -> ModelVertex {
    ModelVertex {
        position,
        tex_coords: [0.0, 0.0],
        normal: [0.0, 1.0, 0.0],
    }
}

fn triangle_part(effect: EffectRef) -> MeshPart {
    MeshPart {
        vertices: vec![
            vertex([-1.0, -1.0, -1.0]),
            vertex([1.0, 1.0, 1.0]),
            vertex([1.0, -1.0, 0.0]),
        ],
        indices: vec![0, 1, 2],
        effect,
    }
}

fn single_mesh_model() -> (Rc<Model>, EffectRef) {
    let effect = effect::share(Effect::basic());
    let model = Model::from_meshes(vec![Mesh {
        name: "mesh".to_string(),
        parent_bone: 0,
        parts: vec![triangle_part(effect.clone())],
    }]);
    (model, effect)
}

fn two_mesh_model() -> (Rc<Model>, Vec<EffectRef>) {
    let effects = vec![
        effect::share(Effect::basic()),
        effect::share(Effect::basic()),
    ];
    let model = Model::from_meshes(vec![
        Mesh {
            name: "first".to_string(),
            parent_bone: 0,
            parts: vec![triangle_part(effects[0].clone())],
        },
        Mesh {
            name: "second".to_string(),
            parent_bone: 0,
            parts: vec![triangle_part(effects[1].clone())],
        },
    ]);
    (model, effects)
}

fn assert_vec3_eq(actual: Vector3<f32>, expected: Vector3<f32>) {
    assert!(
        (actual - expected).magnitude() < 1e-5,
        "expected {expected:?}, got {actual:?}"
    );
}

#[test]
fn should_snapshot_bones_and_parts_on_construction() {
    let (model, _) = two_mesh_model();
    let instance = ModelInstance::new(model.clone());

    assert_eq!(instance.bone_transforms().len(), model.bones.len());
    assert_eq!(model.part_count(), 2);
    assert_eq!(instance.mesh_parts(0).len(), 1);
    assert_eq!(instance.mesh_parts(1).len(), 1);
    assert_vec3_eq(instance.position, Vector3::new(0.0, 0.0, 0.0));
    assert_vec3_eq(instance.scale, Vector3::new(1.0, 1.0, 1.0));
}

#[test]
fn should_translate_world_by_position() {
    let (model, _) = single_mesh_model();
    let mut instance = ModelInstance::new(model);
    instance.position = Vector3::new(1.0, 2.0, 3.0);

    let transformed = instance.world() * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert_vec3_eq(transformed.truncate(), Vector3::new(1.0, 2.0, 3.0));
}

#[test]
fn should_apply_scale_after_base_rotation() {
    let (model, _) = single_mesh_model();
    let mut instance = ModelInstance::new(model);
    // Base rotation turns +X into +Y before the x-axis scale applies, so
    // the doubled axis never touches the rotated point.
    instance.base_rotation = Vector3::new(0.0, 0.0, FRAC_PI_2);
    instance.scale = Vector3::new(2.0, 1.0, 1.0);

    let transformed = instance.world() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_vec3_eq(transformed.truncate(), Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn should_apply_roll_before_pitch_before_yaw() {
    let (model, _) = single_mesh_model();
    let mut instance = ModelInstance::new(model);
    // Roll (Z) takes +X to +Y, then pitch (X) takes +Y to +Z.
    instance.rotation = Vector3::new(FRAC_PI_2, 0.0, FRAC_PI_2);

    let transformed = instance.world() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_vec3_eq(transformed.truncate(), Vector3::new(0.0, 0.0, 1.0));
}

#[test]
fn should_keep_base_bounding_sphere_under_identity() {
    let (model, _) = single_mesh_model();
    let instance = ModelInstance::new(model.clone());

    let base = model.bounding_sphere();
    let sphere = instance.bounding_sphere();
    assert_vec3_eq(sphere.center, base.center);
    assert!((sphere.radius - base.radius).abs() < 1e-5);
}

#[test]
fn should_scale_and_translate_bounding_sphere() {
    let (model, _) = single_mesh_model();
    let mut instance = ModelInstance::new(model.clone());
    instance.position = Vector3::new(10.0, 0.0, 0.0);
    instance.scale = Vector3::new(3.0, 1.0, 1.0);

    let base = model.bounding_sphere();
    let sphere = instance.bounding_sphere();
    // Radius grows by the largest axis scale factor.
    assert!((sphere.radius - base.radius * 3.0).abs() < 1e-4);
    let expected_center = Vector3::new(base.center.x * 3.0 + 10.0, base.center.y, base.center.z);
    assert_vec3_eq(sphere.center, expected_center);
}

struct RecordingRenderer {
    visits: Vec<(usize, String, Matrix4<f32>)>,
}

impl DrawMesh for RecordingRenderer {
    fn draw_mesh(&mut self, mesh_index: usize, mesh: &Mesh, parts: &[MeshPartState]) {
        let world = parts[0]
            .effect
            .borrow()
            .matrix(effect::WORLD)
            .expect("world uniform written before submission");
        self.visits.push((mesh_index, mesh.name.clone(), world));
    }
}

#[test]
fn should_visit_meshes_in_asset_order() {
    let meshes = ["first", "second", "third"]
        .iter()
        .map(|name| Mesh {
            name: name.to_string(),
            parent_bone: 0,
            parts: vec![triangle_part(effect::share(Effect::basic()))],
        })
        .collect();
    let instance = ModelInstance::new(Model::from_meshes(meshes));

    let mut renderer = RecordingRenderer { visits: Vec::new() };
    instance.draw(&mut renderer, Matrix4::identity(), Matrix4::identity());

    let names: Vec<_> = renderer
        .visits
        .iter()
        .map(|(i, name, _)| (*i, name.as_str()))
        .collect();
    assert_eq!(names, vec![(0, "first"), (1, "second"), (2, "third")]);
}

#[test]
fn should_chain_bone_transform_into_mesh_world() {
    let effect = effect::share(Effect::basic());
    let model = Rc::new(Model {
        meshes: vec![Mesh {
            name: "arm".to_string(),
            parent_bone: 2,
            parts: vec![triangle_part(effect)],
        }],
        bones: vec![
            Bone::root(),
            Bone {
                name: "shoulder".to_string(),
                parent: Some(0),
                transform: Matrix4::from_translation(Vector3::new(0.0, 1.0, 0.0)),
            },
            Bone {
                name: "elbow".to_string(),
                parent: Some(1),
                transform: Matrix4::from_translation(Vector3::new(0.0, 0.0, 2.0)),
            },
        ],
    });
    let mut instance = ModelInstance::new(model);
    instance.position = Vector3::new(5.0, 0.0, 0.0);

    let mut renderer = RecordingRenderer { visits: Vec::new() };
    instance.draw(&mut renderer, Matrix4::identity(), Matrix4::identity());

    let (_, _, world) = &renderer.visits[0];
    let origin = world * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert_vec3_eq(origin.truncate(), Vector3::new(5.0, 1.0, 2.0));
}

#[test]
fn should_write_view_and_projection_into_part_effects() {
    let (model, effects) = two_mesh_model();
    let instance = ModelInstance::new(model);

    let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, -10.0));
    let projection = Matrix4::from_scale(0.5);
    let mut renderer = RecordingRenderer { visits: Vec::new() };
    instance.draw(&mut renderer, view, projection);

    for e in &effects {
        let e = e.borrow();
        assert_eq!(e.matrix(effect::VIEW), Some(view));
        assert_eq!(e.matrix(effect::PROJECTION), Some(projection));
    }
}

#[test]
fn should_update_camera_position_on_all_effects() {
    let (model, effects) = two_mesh_model();
    let instance = ModelInstance::new(model);

    instance.update_camera_position(Vector3::new(4.0, 5.0, 6.0));
    for e in &effects {
        assert_eq!(
            e.borrow().vec3(effect::CAMERA_POSITION),
            Some(Vector3::new(4.0, 5.0, 6.0))
        );
    }
}

#[test]
fn should_toggle_clip_plane_but_keep_stale_coefficients() {
    let (model, effect_ref) = single_mesh_model();
    let instance = ModelInstance::new(model);

    let plane = Vector4::new(0.0, 1.0, 0.0, -2.0);
    instance.update_clip_plane(Some(plane));
    {
        let e = effect_ref.borrow();
        assert_eq!(e.bool_(effect::CLIP_PLANE_ENABLED), Some(true));
        assert_eq!(e.vec4(effect::CLIP_PLANE), Some(plane));
    }

    // Disabling leaves the previous coefficients in place.
    instance.update_clip_plane(None);
    {
        let e = effect_ref.borrow();
        assert_eq!(e.bool_(effect::CLIP_PLANE_ENABLED), Some(false));
        assert_eq!(e.vec4(effect::CLIP_PLANE), Some(plane));
    }
}

#[test]
fn should_restore_cached_effects_by_identity() {
    let (model, original) = single_mesh_model();
    let mut instance = ModelInstance::new(model);

    let replacement = effect::share(Effect::basic());
    instance
        .cache_effects()
        .set_effect(&replacement, true, true);
    assert!(!Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &original));

    instance.restore_cached_effects();
    assert!(Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &original));
}

#[test]
fn should_overwrite_cache_slot_on_second_cache() {
    let (model, _original) = single_mesh_model();
    let mut instance = ModelInstance::new(model);

    let second = effect::share(Effect::basic());
    let third = effect::share(Effect::basic());
    instance
        .cache_effects()
        .set_effect(&second, false, true)
        .cache_effects()
        .set_effect(&third, false, true)
        .restore_cached_effects();

    // One slot per part, so the later cache wins.
    assert!(Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &second));
}

#[test]
fn should_leave_active_effect_when_nothing_cached() {
    let (model, original) = single_mesh_model();
    let mut instance = ModelInstance::new(model);

    instance.restore_cached_effects();
    assert!(Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &original));
}

#[test]
fn should_clone_effect_per_part_when_requested() {
    let (model, _) = two_mesh_model();
    let mut instance = ModelInstance::new(model);

    let shared = effect::share(Effect::basic());
    instance.set_effect(&shared, true, true);

    let first = instance.mesh_parts(0)[0].effect.clone();
    let second = instance.mesh_parts(1)[0].effect.clone();
    assert!(!Rc::ptr_eq(&first, &shared));
    assert!(!Rc::ptr_eq(&first, &second));

    // Writes through one part's clone stay invisible to the other.
    first
        .borrow_mut()
        .try_set_uniform(effect::DIFFUSE_COLOR, Vector3::new(0.0, 0.0, 1.0));
    assert_eq!(
        second.borrow().vec3(effect::DIFFUSE_COLOR),
        Some(Vector3::new(1.0, 1.0, 1.0))
    );
}

#[test]
fn should_share_effect_handle_when_not_cloning() {
    let (model, _) = two_mesh_model();
    let mut instance = ModelInstance::new(model);

    let shared = effect::share(Effect::basic());
    instance.set_effect(&shared, false, true);

    assert!(Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &shared));
    assert!(Rc::ptr_eq(&instance.mesh_parts(1)[0].effect, &shared));
}

#[test]
fn should_apply_material_and_specular_policy_on_set_effect() {
    let effect = effect::share(
        Effect::basic()
            .with_uniform(effect::DIFFUSE_COLOR, Vector3::new(0.3, 0.6, 0.9))
            .with_uniform(effect::SPECULAR_POWER, 64.0),
    );
    let model = Model::from_meshes(vec![Mesh {
        name: "mesh".to_string(),
        parent_bone: 0,
        parts: vec![triangle_part(effect)],
    }]);
    let mut instance = ModelInstance::new(model);

    // The incoming effect arrives with texturing left on.
    let incoming = effect::share(Effect::basic());
    incoming
        .borrow_mut()
        .try_set_uniform(effect::TEXTURE_ENABLED, true);
    instance.set_effect(&incoming, true, false);

    let active = instance.mesh_parts(0)[0].effect.clone();
    let e = active.borrow();
    assert_eq!(e.vec3(effect::DIFFUSE_COLOR), Some(Vector3::new(0.3, 0.6, 0.9)));
    assert_eq!(e.float(effect::SPECULAR_POWER), Some(64.0));
    assert_eq!(e.bool_(effect::SPECULAR_ENABLED), Some(false));
    // Untextured material forces texturing off on the new effect.
    assert_eq!(e.bool_(effect::TEXTURE_ENABLED), Some(false));
}

#[test]
fn should_carry_texture_onto_replacement_effect() {
    let texture = Rc::new(Texture::white());
    let authored = effect::share(
        Effect::basic()
            .with_uniform(effect::BASIC_TEXTURE, texture.clone())
            .with_uniform(effect::TEXTURE_ENABLED, true),
    );
    let model = Model::from_meshes(vec![Mesh {
        name: "mesh".to_string(),
        parent_bone: 0,
        parts: vec![triangle_part(authored)],
    }]);
    let mut instance = ModelInstance::new(model);
    assert!(
        instance.mesh_parts(0)[0]
            .material
            .as_ref()
            .unwrap()
            .texture
            .is_some()
    );

    instance.set_effect(&effect::share(Effect::basic()), true, true);

    let active = instance.mesh_parts(0)[0].effect.clone();
    let e = active.borrow();
    assert_eq!(e.bool_(effect::TEXTURE_ENABLED), Some(true));
    let bound = e.texture(effect::BASIC_TEXTURE).unwrap();
    assert!(Rc::ptr_eq(&bound, &texture));
}

#[test]
fn should_not_claim_texturing_when_texture_slot_is_missing() {
    let texture = Rc::new(Texture::white());
    let authored = effect::share(
        Effect::basic()
            .with_uniform(effect::BASIC_TEXTURE, texture)
            .with_uniform(effect::TEXTURE_ENABLED, true),
    );
    let model = Model::from_meshes(vec![Mesh {
        name: "mesh".to_string(),
        parent_bone: 0,
        parts: vec![triangle_part(authored)],
    }]);
    let mut instance = ModelInstance::new(model);

    // The replacement has a texturing flag but nowhere to bind the texture.
    let replacement = effect::share(
        Effect::new("flags_only")
            .with_uniform(effect::DIFFUSE_COLOR, Vector3::new(1.0, 1.0, 1.0))
            .with_uniform(effect::TEXTURE_ENABLED, true),
    );
    instance.set_effect(&replacement, true, true);

    let active = instance.mesh_parts(0)[0].effect.clone();
    assert_eq!(active.borrow().bool_(effect::TEXTURE_ENABLED), Some(false));
}

#[test]
fn should_skip_unsupported_slots_on_set_effect() {
    let (model, _) = single_mesh_model();
    let mut instance = ModelInstance::new(model);

    // A minimal effect declaring only a world matrix.
    let minimal = effect::share(Effect::new("depth_only").with_uniform(
        effect::WORLD,
        Matrix4::identity(),
    ));
    instance.set_effect(&minimal, true, true);

    let active = instance.mesh_parts(0)[0].effect.clone();
    let e = active.borrow();
    assert!(!e.has_uniform(effect::DIFFUSE_COLOR));
    assert!(!e.has_uniform(effect::SPECULAR_ENABLED));
    assert!(e.has_uniform(effect::WORLD));
}

#[test]
fn should_handle_parts_without_material_descriptor() {
    // An authored effect without the basic slots yields no descriptor.
    let bare = effect::share(Effect::new("custom"));
    let model = Model::from_meshes(vec![Mesh {
        name: "mesh".to_string(),
        parent_bone: 0,
        parts: vec![triangle_part(bare.clone())],
    }]);
    let mut instance = ModelInstance::new(model);
    assert!(instance.mesh_parts(0)[0].material.is_none());

    // Caching skips the part; the swap itself still happens.
    let replacement = effect::share(Effect::basic());
    instance
        .cache_effects()
        .set_effect(&replacement, false, true);
    assert!(Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &replacement));

    instance.restore_cached_effects();
    assert!(Rc::ptr_eq(&instance.mesh_parts(0)[0].effect, &replacement));
}
