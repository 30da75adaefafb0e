use cgmath::{InnerSpace, Vector3, Vector4};
use modelkit::data_structures::{effect, instance::ModelInstance};
use modelkit::resources::load_model_gltf;

#[test]
fn should_build_bone_hierarchy_from_gltf_nodes() {
    let model = futures::executor::block_on(load_model_gltf("triangle.gltf")).unwrap();

    // Identity root plus one bone per scene node, parents first.
    assert_eq!(model.bones.len(), 3);
    assert_eq!(model.bones[0].parent, None);
    assert_eq!(model.bones[1].parent, Some(0));
    assert_eq!(model.bones[1].name, "pivot");
    assert_eq!(model.bones[2].parent, Some(1));
    assert_eq!(model.bones[2].name, "tri");

    assert_eq!(model.meshes.len(), 1);
    let mesh = &model.meshes[0];
    assert_eq!(mesh.name, "triangle");
    // The mesh hangs off the node that carries it, not the root.
    assert_eq!(mesh.parent_bone, 2);
    assert_eq!(mesh.parts.len(), 1);
    assert_eq!(mesh.parts[0].vertices.len(), 3);
    assert_eq!(mesh.parts[0].indices, vec![0, 1, 2]);
}

#[test]
fn should_map_pbr_base_color_onto_basic_effect() {
    let model = futures::executor::block_on(load_model_gltf("triangle.gltf")).unwrap();

    let e = model.meshes[0].parts[0].effect.borrow();
    let diffuse = e.vec3(effect::DIFFUSE_COLOR).unwrap();
    assert!((diffuse - Vector3::new(0.1, 0.4, 0.9)).magnitude() < 1e-6);
    // The material binds no base color texture.
    assert_eq!(e.bool_(effect::TEXTURE_ENABLED), Some(false));
}

#[test]
fn should_chain_node_translation_into_mesh_world() {
    let model = futures::executor::block_on(load_model_gltf("triangle.gltf")).unwrap();
    let instance = ModelInstance::new(model);

    // pivot carries the only non-identity local transform in the chain.
    let world = instance.bone_transforms()[2];
    let origin = world * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin.truncate() - Vector3::new(0.0, 2.0, 0.0)).magnitude() < 1e-6);
}
