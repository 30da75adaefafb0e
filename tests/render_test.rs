//! GPU smoke test: draws the cube asset into the offscreen target and
//! inspects the readback image. Needs a working adapter, so it only runs
//! with `--features integration-tests`.

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_cube_over_clear_colour() {
    use cgmath::{Deg, Matrix4, Point3, Vector3, perspective};
    use modelkit::context::Context;
    use modelkit::data_structures::instance::ModelInstance;
    use modelkit::render::{GpuModel, ModelRenderer};
    use modelkit::resources::load_model_obj;
    use wgpu::Color;

    let mut ctx = Context::new_blocking(64, 64).unwrap();
    ctx.clear_colour = Color::WHITE;

    let model = futures::executor::block_on(load_model_obj("cube.obj")).unwrap();
    let gpu_model = GpuModel::new(&ctx.device, &model);
    let instance = ModelInstance::new(model);

    let eye = Point3::new(3.0, 3.0, 5.0);
    instance.update_camera_position(Vector3::new(eye.x, eye.y, eye.z));
    let view = Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());
    let projection = perspective(Deg(45.0), 1.0, 0.1, 100.0);

    let mut renderer = ModelRenderer::new(&ctx);
    renderer
        .render(&ctx, &gpu_model, &instance, view, projection)
        .unwrap();

    let image = ctx.read_to_image().unwrap();
    assert_eq!(image.dimensions(), (64, 64));

    let white = image::Rgba([255, 255, 255, 255]);
    // The cube covers the center of the frame but not the corners.
    assert_eq!(*image.get_pixel(0, 0), white);
    let center = image.get_pixel(32, 32);
    assert_ne!(*center, white);
    // The cube material is red-dominant.
    assert!(center[0] > center[2]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_retain_textures_bound_during_render() {
    use std::rc::Rc;

    use cgmath::{Deg, Matrix4, Point3, Vector3, perspective};
    use modelkit::context::Context;
    use modelkit::data_structures::{
        effect::{self, Effect},
        instance::ModelInstance,
        model::{Mesh, MeshPart, Model, ModelVertex},
        texture::Texture,
    };
    use modelkit::render::{GpuModel, ModelRenderer};

    let ctx = Context::new_blocking(16, 16).unwrap();

    let texture = Rc::new(Texture::white());
    let textured = effect::share(
        Effect::basic()
            .with_uniform(effect::BASIC_TEXTURE, texture.clone())
            .with_uniform(effect::TEXTURE_ENABLED, true),
    );
    let model = Model::from_meshes(vec![Mesh {
        name: "quad".to_string(),
        parent_bone: 0,
        parts: vec![MeshPart {
            vertices: vec![
                ModelVertex {
                    position: [-1.0, -1.0, 0.0],
                    tex_coords: [0.0, 1.0],
                    normal: [0.0, 0.0, 1.0],
                },
                ModelVertex {
                    position: [1.0, -1.0, 0.0],
                    tex_coords: [1.0, 1.0],
                    normal: [0.0, 0.0, 1.0],
                },
                ModelVertex {
                    position: [0.0, 1.0, 0.0],
                    tex_coords: [0.5, 0.0],
                    normal: [0.0, 0.0, 1.0],
                },
            ],
            indices: vec![0, 1, 2],
            effect: textured,
        }],
    }]);
    let gpu_model = GpuModel::new(&ctx.device, &model);
    let instance = ModelInstance::new(model);

    let view = Matrix4::look_at_rh(
        Point3::new(0.0, 0.0, 3.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::unit_y(),
    );
    let projection = perspective(Deg(45.0), 1.0, 0.1, 100.0);

    let mut renderer = ModelRenderer::new(&ctx);
    let before = Rc::strong_count(&texture);
    renderer
        .render(&ctx, &gpu_model, &instance, view, projection)
        .unwrap();
    // The bind group cache keeps the texture alive, so a dropped texture's
    // address can never alias a cached group.
    assert!(Rc::strong_count(&texture) > before);

    renderer
        .render(&ctx, &gpu_model, &instance, view, projection)
        .unwrap();
}
