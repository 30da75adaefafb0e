use std::{
    convert::identity,
    io::{BufReader, Cursor},
    rc::Rc,
};

use cgmath::{Matrix4, Vector3};

use crate::{
    data_structures::{
        effect::{self, Effect, EffectRef},
        model::{Bone, Mesh, MeshPart, Model, ModelVertex},
        texture::Texture,
    },
    resources::texture::{load_binary, load_obj_effects, load_texture},
};

/**
 * This module contains all logic for loading mesh/material/texture data from
 * external files into `Model` assets.
 */
pub mod mesh;
pub mod texture;

/// Load an OBJ file (plus MTL libraries) into a model asset.
///
/// OBJ carries no skeleton, so every mesh is bound to a single identity
/// root bone. Each tobj model becomes one mesh with one part, carrying a
/// basic effect built from its material.
pub async fn load_model_obj(file_name: &str) -> anyhow::Result<Rc<Model>> {
    let (effects, models) = load_obj_effects(file_name).await?;
    let geometry = mesh::assemble_obj_parts(&models);

    let meshes = geometry
        .into_iter()
        .zip(models.iter())
        .map(|(geo, m)| {
            let effect = geo
                .material
                .and_then(|id| effects.get(id))
                .cloned()
                .unwrap_or_else(|| effect::share(Effect::basic()));
            Mesh {
                name: if m.name.is_empty() {
                    file_name.to_string()
                } else {
                    m.name.clone()
                },
                parent_bone: 0,
                parts: vec![MeshPart {
                    vertices: geo.vertices,
                    indices: geo.indices,
                    effect,
                }],
            }
        })
        .collect();

    Ok(Model::from_meshes(meshes))
}

/// Load a glTF file into a model asset.
///
/// Every scene node becomes a bone carrying the node's decomposed TRS as
/// its parent-relative transform; nodes with meshes contribute one mesh per
/// node, bound to that bone. PBR base color and base color texture map onto
/// the basic effect's diffuse/texture slots.
pub async fn load_model_gltf(file_name: &str) -> anyhow::Result<Rc<Model>> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf_cursor = Cursor::new(gltf_bytes);
    let gltf_reader = BufReader::new(gltf_cursor);
    let gltf = gltf::Gltf::from_reader(gltf_reader)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.into());
                };
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri).await?;
                buffer_data.push(bin);
            }
        }
    }

    // Load materials into basic effects
    let mut effects = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let mut e = Effect::basic();
        let base = pbr.base_color_factor();
        e.try_set_uniform(effect::DIFFUSE_COLOR, Vector3::new(base[0], base[1], base[2]));
        if let Some(tex) = pbr.base_color_texture() {
            let diffuse_texture = match tex.texture().source().source() {
                gltf::image::Source::View { view, mime_type } => Texture::from_bytes(
                    &buffer_data[view.buffer().index()],
                    file_name,
                    mime_type.split('/').last(),
                )?,
                gltf::image::Source::Uri { uri, mime_type } => {
                    load_texture(
                        uri,
                        mime_type.map(|mt| mt.split('/').last().map_or("jpg", identity)),
                    )
                    .await?
                }
            };
            e = e.with_uniform(effect::BASIC_TEXTURE, Rc::new(diffuse_texture));
            e.try_set_uniform(effect::TEXTURE_ENABLED, true);
        }
        effects.push(effect::share(e));
    }

    let mut bones = vec![Bone::root()];
    let mut meshes = Vec::new();
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            visit_node(node, 0, &mut bones, &mut meshes, &buffer_data, &effects);
        }
    }

    Ok(Rc::new(Model { meshes, bones }))
}

fn visit_node(
    node: gltf::scene::Node,
    parent: usize,
    bones: &mut Vec<Bone>,
    meshes: &mut Vec<Mesh>,
    buffer_data: &Vec<Vec<u8>>,
    effects: &Vec<EffectRef>,
) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let rotation: cgmath::Quaternion<f32> = rotation.into();
    let local = Matrix4::from_translation(translation.into())
        * Matrix4::from(rotation)
        * Matrix4::from_nonuniform_scale(scale[0], scale[1], scale[2]);

    let bone_index = bones.len();
    bones.push(Bone {
        name: node.name().unwrap_or("node").to_string(),
        parent: Some(parent),
        transform: local,
    });

    if let Some(mesh) = node.mesh() {
        let mut parts = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffer_data[buffer.index()]));

            let mut vertices = Vec::new();
            if let Some(vertex_attribute) = reader.read_positions() {
                vertex_attribute.for_each(|position| {
                    vertices.push(ModelVertex {
                        position,
                        tex_coords: Default::default(),
                        normal: Default::default(),
                    })
                });
            }
            if let Some(normal_attribute) = reader.read_normals() {
                let mut normal_index = 0;
                normal_attribute.for_each(|normal| {
                    vertices[normal_index].normal = normal;
                    normal_index += 1;
                });
            }
            if let Some(tex_coord_attribute) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                let mut tex_coord_index = 0;
                tex_coord_attribute.for_each(|tex_coord| {
                    vertices[tex_coord_index].tex_coords = tex_coord;
                    tex_coord_index += 1;
                });
            }

            let mut indices = Vec::new();
            if let Some(indices_raw) = reader.read_indices() {
                indices.append(&mut indices_raw.into_u32().collect::<Vec<u32>>());
            }

            let effect = primitive
                .material()
                .index()
                .and_then(|i| effects.get(i))
                .cloned()
                .unwrap_or_else(|| effect::share(Effect::basic()));

            parts.push(MeshPart {
                vertices,
                indices,
                effect,
            });
        }
        meshes.push(Mesh {
            name: mesh.name().unwrap_or("unknown_mesh").to_string(),
            parent_bone: bone_index,
            parts,
        });
    }

    for child in node.children() {
        visit_node(child, bone_index, bones, meshes, buffer_data, effects);
    }
}
