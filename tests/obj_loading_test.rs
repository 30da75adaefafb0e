use cgmath::{InnerSpace, Vector3};
use modelkit::data_structures::{effect, instance::ModelInstance};
use modelkit::resources::load_model_obj;

#[test]
fn should_load_cube_obj_with_material_effect() {
    let model = futures::executor::block_on(load_model_obj("cube.obj")).unwrap();

    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.bones.len(), 1);
    let mesh = &model.meshes[0];
    assert_eq!(mesh.parent_bone, 0);
    assert_eq!(mesh.parts.len(), 1);

    let part = &mesh.parts[0];
    // 6 faces, 4 unique position/uv/normal combinations each.
    assert_eq!(part.vertices.len(), 24);
    assert_eq!(part.indices.len(), 36);

    let e = part.effect.borrow();
    assert_eq!(
        e.vec3(effect::DIFFUSE_COLOR),
        Some(Vector3::new(0.8, 0.2, 0.2))
    );
    assert_eq!(e.float(effect::SPECULAR_POWER), Some(32.0));
    // The material references no texture map, so texturing stays off and
    // only the stock white placeholder is bound.
    assert_eq!(e.bool_(effect::TEXTURE_ENABLED), Some(false));
    assert_eq!(
        e.texture(effect::BASIC_TEXTURE).map(|t| t.name.clone()),
        Some("white".to_string())
    );
}

#[test]
fn should_compute_cube_bounding_sphere() {
    let model = futures::executor::block_on(load_model_obj("cube.obj")).unwrap();

    let sphere = model.bounding_sphere();
    assert!(sphere.center.magnitude() < 1e-5);
    // Unit cube of side 2: corners sit sqrt(3) from the center.
    assert!((sphere.radius - 3.0f32.sqrt()).abs() < 1e-4);
}

#[test]
fn should_instantiate_loaded_model() {
    let model = futures::executor::block_on(load_model_obj("cube.obj")).unwrap();
    let instance = ModelInstance::new(model.clone());

    assert_eq!(instance.bone_transforms().len(), 1);
    // The cube's authored effect exposes the basic slots, so the part
    // carries a material descriptor.
    assert!(instance.mesh_parts(0)[0].material.is_some());
}
