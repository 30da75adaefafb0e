use std::io::{BufReader, Cursor};
use std::rc::Rc;

use crate::data_structures::{
    effect::{self, Effect, EffectRef},
    texture::Texture,
};

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    // TODO: pass env for absolute path from lib caller
    let path = std::path::Path::new("./").join("assets").join(file_name);
    let txt = std::fs::read_to_string(path)?;
    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    // TODO: pass env for absolute path from lib caller
    let path = std::path::Path::new("./").join("assets").join(file_name);
    let data = std::fs::read(path)?;
    Ok(data)
}

pub async fn load_texture(file_name: &str, format: Option<&str>) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(&data, file_name, format)
}

/// Parse an OBJ file plus its MTL libraries and build one basic effect per
/// material, with diffuse color, specular exponent and (when referenced and
/// loadable) the diffuse texture filled in.
pub async fn load_obj_effects(
    file_name: &str,
) -> anyhow::Result<(Vec<EffectRef>, Vec<tobj::Model>)> {
    let obj_text: String = load_string(file_name).await?;
    let obj_cursor = Cursor::new(obj_text);
    let mut obj_reader = BufReader::new(obj_cursor);

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| async move {
            let mat_text = load_string(&p)
                .await
                .expect(format!("Material library not found for {p}.").as_str());
            tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text)))
        },
    )
    .await?;

    let mut effects = Vec::new();
    for m in obj_materials? {
        let mut e = Effect::basic();
        if let Some(diffuse) = m.diffuse {
            e.try_set_uniform(effect::DIFFUSE_COLOR, cgmath::Vector3::from(diffuse));
        }
        if let Some(shininess) = m.shininess {
            e.try_set_uniform(effect::SPECULAR_POWER, shininess);
        }
        match &m.diffuse_texture {
            Some(m_diffuse_texture) => {
                let diffuse_texture = load_texture(&m_diffuse_texture, None).await?;
                e = e.with_uniform(effect::BASIC_TEXTURE, Rc::new(diffuse_texture));
                e.try_set_uniform(effect::TEXTURE_ENABLED, true);
            }
            None => {
                log::warn!("material {} in {file_name} references no texture", m.name);
            }
        }
        effects.push(effect::share(e));
    }
    Ok((effects, models))
}
