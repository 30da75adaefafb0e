use crate::data_structures::model;

/// Geometry for one loaded mesh part before an effect is attached:
/// vertices, indices and the source material index (if any).
pub struct PartGeometry {
    pub vertices: Vec<model::ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

/// Assemble vertex/index data from tobj models.
///
/// tobj hands back flat position/texcoord/normal arrays with a single
/// shared index stream (we load with `single_index`), so each vertex is
/// re-assembled by position index. Missing texcoords and normals default
/// to zero; texture V is flipped into the texture coordinate convention
/// the shaders expect.
pub fn assemble_obj_parts(models: &Vec<tobj::Model>) -> Vec<PartGeometry> {
    models
        .into_iter()
        .map(|m| {
            let vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| model::ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                })
                .collect::<Vec<_>>();

            PartGeometry {
                vertices,
                indices: m.mesh.indices.clone(),
                material: m.mesh.material_id,
            }
        })
        .collect::<Vec<_>>()
}
