//! End-to-end software rendering tests
//!
//! Covers:
//! - The textured-quad smoke test: center coverage, corner texels, depth
//! - Frustum culling feeding render statistics
//! - Transparent models blending over opaque ones without writing depth
//! - Fog compositing
//! - Baked lighting and shadeless materials
//! - Skinned vertices following their joints

use std::sync::Arc;

use glam::{Quat, Vec3};
use kiln::math::Color;
use kiln::render::Renderer;
use kiln::resources::material::Transparency;
use kiln::resources::primitives;
use kiln::resources::{Image, Mesh};
use kiln::scene::{Camera, Light, Model, Node, NodeKind, Scene, Skin};

fn color_approx(a: Color, b: Color, tolerance: f32) -> bool {
    (a.r - b.r).abs() < tolerance
        && (a.g - b.g).abs() < tolerance
        && (a.b - b.b).abs() < tolerance
}

/// Red/green/blue/white 2×2 texture: red top-left, green top-right,
/// blue bottom-left, white bottom-right.
fn four_texel_texture() -> Arc<Image> {
    Arc::new(Image::from_pixels(
        2,
        2,
        vec![
            Color::rgb(1.0, 0.0, 0.0),
            Color::rgb(0.0, 1.0, 0.0),
            Color::rgb(0.0, 0.0, 1.0),
            Color::WHITE,
        ],
    ))
}

/// A 64×64 camera five units up the Z axis, looking at the origin.
fn scene_with_camera() -> (Scene, kiln::NodeHandle) {
    let mut scene = Scene::new("test");
    scene.world.lighting = false;
    let camera = scene.add_node(Node::new(
        "camera",
        NodeKind::Camera(Box::new(Camera::new(64, 64))),
    ));
    scene.set_local_position(camera, Vec3::new(0.0, 0.0, 5.0));
    (scene, camera)
}

fn add_quad(scene: &mut Scene, name: &str, mut configure: impl FnMut(&mut Mesh)) -> kiln::NodeHandle {
    let mut mesh = primitives::quad(2.0, 2.0);
    configure(&mut mesh);
    scene.add_node(Node::new(
        name,
        NodeKind::Model(Box::new(Model::new(Arc::new(mesh)))),
    ))
}

#[test]
fn textured_quad_smoke_test() {
    let (mut scene, camera) = scene_with_camera();
    let texture = four_texel_texture();
    add_quad(&mut scene, "quad", |mesh| {
        mesh.parts[0].material.texture = Some(texture.clone());
    });

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);

    let node = scene.get(camera).unwrap();
    let cam = node.camera().unwrap();
    let color = cam.color_texture();

    // Center pixel is covered.
    let center = color.pixel(32, 32);
    assert!(center != Color::TRANSPARENT && center != Color::BLACK);

    // The quad spans roughly pixels 21..43; sample inside each quadrant.
    assert!(color_approx(color.pixel(24, 24), Color::rgb(1.0, 0.0, 0.0), 0.05));
    assert!(color_approx(color.pixel(40, 24), Color::rgb(0.0, 1.0, 0.0), 0.05));
    assert!(color_approx(color.pixel(24, 40), Color::rgb(0.0, 0.0, 1.0), 0.05));
    assert!(color_approx(color.pixel(40, 40), Color::WHITE, 0.05));

    // Depth at the center equals the camera distance within one percent.
    let depth = cam.depth_texture().pixel(32, 32).r;
    assert!((depth - 5.0).abs() < 0.05);

    // Background pixels stay at the clear color and far depth.
    assert_eq!(color.pixel(2, 2), scene.world.clear_color);
    assert!((cam.depth_texture().pixel(2, 2).r - cam.far()).abs() < 1e-3);

    assert_eq!(cam.stats.models_rendered, 1);
    assert_eq!(cam.stats.triangles_rendered, 2);
}

#[test]
fn out_of_frustum_models_are_culled() {
    let (mut scene, camera) = scene_with_camera();
    let quad = add_quad(&mut scene, "quad", |_| {});
    scene.set_local_position(quad, Vec3::new(0.0, 0.0, 50.0));

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);

    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert_eq!(cam.stats.models_rendered, 0);
    assert_eq!(cam.stats.models_culled, 1);
    assert_eq!(cam.color_texture().pixel(32, 32), scene.world.clear_color);
}

#[test]
fn invisible_subtrees_do_not_render() {
    let (mut scene, camera) = scene_with_camera();
    let quad = add_quad(&mut scene, "quad", |_| {});
    scene.get_mut(quad).unwrap().visible = false;

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert_eq!(cam.stats.models_rendered, 0);
    assert_eq!(cam.stats.models_culled, 0);
}

#[test]
fn backfaces_are_culled_by_winding() {
    let (mut scene, camera) = scene_with_camera();
    let quad = add_quad(&mut scene, "quad", |_| {});
    // Turn the quad away from the camera.
    scene.set_local_rotation(quad, Quat::from_rotation_y(std::f32::consts::PI));

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert_eq!(cam.stats.triangles_rendered, 0);
    assert_eq!(cam.stats.triangles_skipped, 2);
}

#[test]
fn transparent_models_blend_without_writing_depth() {
    let (mut scene, camera) = scene_with_camera();
    // Opaque white quad at the origin.
    add_quad(&mut scene, "back", |mesh| {
        mesh.parts[0].material.color = Color::WHITE;
    });
    // Half-transparent black quad one unit closer.
    let front = add_quad(&mut scene, "front", |mesh| {
        mesh.parts[0].material.color = Color::new(0.0, 0.0, 0.0, 0.5);
        mesh.parts[0].material.transparency = Transparency::Transparent;
    });
    scene.set_local_position(front, Vec3::new(0.0, 0.0, 1.0));

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);

    let cam = scene.get(camera).unwrap().camera().unwrap();
    let center = cam.color_texture().pixel(32, 32);
    // White showing through at half strength.
    assert!(color_approx(center, Color::rgb(0.5, 0.5, 0.5), 0.05));
    // Depth still belongs to the opaque quad five units away.
    assert!((cam.depth_texture().pixel(32, 32).r - 5.0).abs() < 0.05);
}

#[test]
fn fog_overwrites_distant_pixels() {
    let (mut scene, camera) = scene_with_camera();
    add_quad(&mut scene, "quad", |_| {});
    scene.world.fog_mode = kiln::resources::FogMode::Overwrite;
    scene.world.fog_color = Color::rgb(1.0, 0.0, 0.0);
    scene.world.set_fog_range(0.0, 0.01);

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);

    let cam = scene.get(camera).unwrap().camera().unwrap();
    // The quad sits past the fog band's far edge, so it is fully fogged.
    assert!(color_approx(cam.color_texture().pixel(32, 32), Color::rgb(1.0, 0.0, 0.0), 0.01));
}

#[test]
fn shadeless_material_ignores_lights() {
    let (mut scene, camera) = scene_with_camera();
    scene.world.lighting = true;
    add_quad(&mut scene, "quad", |mesh| {
        mesh.parts[0].material.shadeless = true;
    });
    // No lights in the scene at all: a lit material would render black.
    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert!(color_approx(cam.color_texture().pixel(32, 32), Color::WHITE, 0.01));
}

#[test]
fn directional_light_shades_facing_surfaces() {
    let (mut scene, camera) = scene_with_camera();
    scene.world.lighting = true;
    add_quad(&mut scene, "quad", |_| {});

    // Light pointing straight at the quad (along -Z).
    let light = scene.add_node(Node::new(
        "sun",
        NodeKind::Light(Light::new_directional(Color::WHITE, 1.0)),
    ));
    scene.set_local_position(light, Vec3::new(0.0, 0.0, 5.0));

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert!(color_approx(cam.color_texture().pixel(32, 32), Color::WHITE, 0.05));
    assert_eq!(cam.stats.lights_active, 1);
}

#[test]
fn baked_lighting_feeds_a_color_channel() {
    let mut scene = Scene::new("test");
    scene.world.lighting = true;
    let plane = scene.add_node(Node::new(
        "floor",
        NodeKind::Model(Box::new(Model::new(Arc::new(primitives::plane(4.0, 4.0))))),
    ));
    // Sun shining straight down.
    let sun = scene.add_node(Node::new(
        "sun",
        NodeKind::Light(Light::new_directional(Color::WHITE, 1.0)),
    ));
    scene.set_local_rotation(sun, Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));

    let channel = kiln::bake_lighting(&mut scene, plane, 0).unwrap();
    let model = scene.get(plane).unwrap().model().unwrap();
    for color in &model.mesh.vertices.colors[channel] {
        assert!(color.r > 0.9, "baked value should be near full: {color:?}");
    }
}

#[test]
fn skinned_vertices_follow_their_joint() {
    let (mut scene, camera) = scene_with_camera();

    // A quad fully weighted to a single joint.
    let mut mesh = primitives::quad(2.0, 2.0);
    let count = mesh.vertex_count();
    mesh.vertices.joints = vec![[0, 0, 0, 0]; count];
    mesh.vertices.weights = vec![[1.0, 0.0, 0.0, 0.0]; count];
    let mesh = Arc::new(mesh);

    let joint = scene.add_node(Node::empty("joint"));
    let mut model = Model::new(mesh);
    model.skin = Some(Skin {
        root: Some(joint),
        joints: vec![joint],
        inverse_binds: vec![glam::Mat4::IDENTITY],
    });
    let skinned = scene.add_node(Node::new("skinned", NodeKind::Model(Box::new(model))));

    // Move the joint far outside the view; the mesh must follow it even
    // though the model node itself stays at the origin.
    scene.set_local_position(joint, Vec3::new(100.0, 0.0, 0.0));
    let _ = skinned;

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert_eq!(cam.color_texture().pixel(32, 32), scene.world.clear_color);

    // Bring the joint back: the quad reappears at the center.
    scene.set_local_position(joint, Vec3::ZERO);
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert!(cam.color_texture().pixel(32, 32) != scene.world.clear_color);
}

#[test]
fn vertex_snapping_still_covers_the_center() {
    let (mut scene, camera) = scene_with_camera();
    add_quad(&mut scene, "quad", |_| {});
    scene
        .get_mut(camera)
        .unwrap()
        .camera_mut()
        .unwrap()
        .vertex_snap = Some(8.0);

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert!(cam.color_texture().pixel(32, 32) != Color::TRANSPARENT);
    assert_eq!(cam.stats.triangles_rendered, 2);
}

#[test]
fn dynamic_batch_members_render_with_owner_material() {
    let (mut scene, camera) = scene_with_camera();
    let owner = add_quad(&mut scene, "owner", |mesh| {
        mesh.parts[0].material.color = Color::rgb(1.0, 0.0, 0.0);
    });
    // The member's own material is green, but it renders red via the
    // owner's part material.
    let member = add_quad(&mut scene, "member", |mesh| {
        mesh.parts[0].material.color = Color::rgb(0.0, 1.0, 0.0);
    });
    // Park the owner's own geometry toward the screen edge (still inside
    // the frustum, since culling the owner would cull the whole batch) so
    // only the member covers the center.
    scene.set_local_position(owner, Vec3::new(2.5, 0.0, 0.0));
    scene.dynamic_batch_add(owner, 0, &[member]).unwrap();

    let mut renderer = Renderer::new();
    renderer.render(&mut scene, camera);
    let cam = scene.get(camera).unwrap().camera().unwrap();
    assert!(color_approx(cam.color_texture().pixel(32, 32), Color::rgb(1.0, 0.0, 0.0), 0.05));
}
