//! Transform and hierarchy tests
//!
//! Covers:
//! - World-matrix cache and dirty flags
//! - Parenting and unparenting preserving world pose
//! - TRS decomposition round trips
//! - World-space setters back-computing locals
//! - Transform-update hooks firing exactly once per recomputation

use std::f32::consts::FRAC_PI_2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use kiln::scene::{Node, NodeKind, Scene};

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn mat4_approx(a: Mat4, b: Mat4) -> bool {
    (0..4).all(|c| {
        let (ca, cb) = (a.col(c), b.col(c));
        (0..4).all(|r| (ca[r] - cb[r]).abs() < EPSILON)
    })
}

#[test]
fn world_matrix_clears_dirty_and_is_stable() {
    let mut scene = Scene::new("test");
    let node = scene.add_node(Node::empty("n"));
    scene.set_local_position(node, Vec3::new(1.0, 2.0, 3.0));

    assert!(scene.get(node).unwrap().transform.is_dirty());
    let first = scene.world_matrix(node);
    assert!(!scene.get(node).unwrap().transform.is_dirty());

    let second = scene.world_matrix(node);
    assert_eq!(first, second);
}

#[test]
fn world_matrix_composes_through_ancestors() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    let child = scene.insert_child(parent, Node::empty("child"));

    scene.set_local_position(parent, Vec3::new(1.0, 0.0, 0.0));
    scene.set_local_position(child, Vec3::new(0.0, 1.0, 0.0));

    assert!(vec3_approx(
        scene.world_position(child),
        Vec3::new(1.0, 1.0, 0.0)
    ));

    // Rotating the parent swings the child around it.
    scene.set_local_rotation(parent, Quat::from_rotation_z(FRAC_PI_2));
    assert!(vec3_approx(
        scene.world_position(child),
        Vec3::new(0.0, 0.0, 0.0)
    ));
}

#[test]
fn mutating_parent_dirties_descendants() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    let child = scene.insert_child(parent, Node::empty("child"));

    scene.world_matrix(child);
    assert!(!scene.get(child).unwrap().transform.is_dirty());

    scene.set_local_position(parent, Vec3::new(5.0, 0.0, 0.0));
    assert!(scene.get(child).unwrap().transform.is_dirty());
    assert!(vec3_approx(
        scene.world_position(child),
        Vec3::new(5.0, 0.0, 0.0)
    ));
}

#[test]
fn parenting_preserves_world_pose() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    scene.set_local_position(parent, Vec3::new(10.0, 0.0, 0.0));
    scene.set_local_rotation(parent, Quat::from_rotation_y(FRAC_PI_2));

    let child = scene.add_node(Node::empty("child"));
    let before = scene.world_matrix(child);

    scene.add_child(parent, child);
    let after = scene.world_matrix(child);

    assert!(mat4_approx(before, after));
    assert!(vec3_approx(scene.world_position(child), Vec3::ZERO));
    assert_eq!(scene.get(child).unwrap().parent(), Some(parent));
}

#[test]
fn unparenting_preserves_world_pose() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    scene.set_local_position(parent, Vec3::new(3.0, 4.0, 5.0));
    scene.set_local_rotation(parent, Quat::from_rotation_x(0.6));

    let child = scene.insert_child(parent, Node::empty("child"));
    scene.set_local_position(child, Vec3::new(1.0, 0.0, 0.0));

    let before = scene.world_matrix(child);
    scene.unparent(child);
    let after = scene.world_matrix(child);

    assert!(mat4_approx(before, after));
    assert!(scene.get(child).unwrap().parent().is_none());
    assert!(scene.roots().contains(&child));
}

#[test]
fn child_is_in_exactly_one_parent_list() {
    let mut scene = Scene::new("test");
    let a = scene.add_node(Node::empty("a"));
    let b = scene.add_node(Node::empty("b"));
    let child = scene.add_node(Node::empty("child"));

    scene.add_child(a, child);
    assert!(scene.get(a).unwrap().children().contains(&child));
    assert!(!scene.roots().contains(&child));

    scene.add_child(b, child);
    assert!(!scene.get(a).unwrap().children().contains(&child));
    assert!(scene.get(b).unwrap().children().contains(&child));
}

#[test]
fn reparenting_under_descendant_is_rejected() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    let child = scene.insert_child(parent, Node::empty("child"));

    scene.add_child(child, parent);
    assert!(scene.get(parent).unwrap().parent().is_none());
    assert_eq!(scene.get(child).unwrap().parent(), Some(parent));
}

#[test]
fn decomposition_round_trip() {
    let translation = Vec3::new(1.5, -2.0, 7.25);
    let rotation = Quat::from_euler(glam::EulerRot::XYZ, 0.4, 1.1, -0.3);
    let scale = Vec3::new(2.0, 0.5, 3.0);
    let m = Mat4::from_scale_rotation_translation(scale, rotation, translation);

    let (t, r, s) = kiln::math::decompose(m);
    let recomposed = Mat4::from_scale_rotation_translation(s, r, t);
    assert!(mat4_approx(m, recomposed));
    assert!(vec3_approx(t, translation));
    assert!(vec3_approx(s, scale));
}

#[test]
fn set_world_position_under_rotated_parent() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    scene.set_local_position(parent, Vec3::new(10.0, 0.0, 0.0));
    scene.set_local_rotation(parent, Quat::from_rotation_y(FRAC_PI_2));

    let child = scene.insert_child(parent, Node::empty("child"));
    scene.set_world_position(child, Vec3::new(4.0, 2.0, 0.0));

    assert!(vec3_approx(
        scene.world_position(child),
        Vec3::new(4.0, 2.0, 0.0)
    ));
}

#[test]
fn set_world_rotation_and_scale_round_trip() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    scene.set_local_rotation(parent, Quat::from_rotation_y(0.8));
    scene.set_local_scale(parent, Vec3::splat(2.0));

    let child = scene.insert_child(parent, Node::empty("child"));
    let target = Quat::from_rotation_z(0.5);
    scene.set_world_rotation(child, target);
    let got = scene.world_rotation(child);
    assert!(got.dot(target).abs() > 1.0 - EPSILON);

    scene.set_world_scale(child, Vec3::splat(3.0));
    assert!(vec3_approx(scene.world_scale(child), Vec3::splat(3.0)));
}

#[test]
fn look_at_faces_target() {
    let mut scene = Scene::new("test");
    let node = scene.add_node(Node::empty("n"));
    scene.set_local_position(node, Vec3::new(2.0, 0.0, 0.0));
    scene.look_at(node, Vec3::new(2.0, 0.0, -8.0), Vec3::Y);

    let forward = scene.world_rotation(node) * Vec3::NEG_Z;
    assert!(vec3_approx(forward, Vec3::NEG_Z));
}

#[test]
fn nan_rotation_is_clamped_to_identity() {
    let mut scene = Scene::new("test");
    let node = scene.add_node(Node::empty("n"));
    scene.set_local_rotation(node, Quat::from_xyzw(f32::NAN, 0.0, 0.0, 0.0));
    assert_eq!(scene.get(node).unwrap().transform.rotation(), Quat::IDENTITY);
}

#[test]
fn transform_update_hook_fires_once_per_recompute() {
    let mut scene = Scene::new("test");
    let node = scene.add_node(Node::empty("n"));
    let count = Arc::new(AtomicUsize::new(0));
    let hook_count = count.clone();
    scene.get_mut(node).unwrap().hooks.on_transform_update =
        Some(Arc::new(move |_node: &mut Node| {
            hook_count.fetch_add(1, Ordering::SeqCst);
        }));

    scene.world_matrix(node);
    scene.world_matrix(node);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    scene.set_local_position(node, Vec3::X);
    scene.world_matrix(node);
    scene.world_matrix(node);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn flush_transforms_cleans_every_node() {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("root"));
    let mid = scene.insert_child(root, Node::empty("mid"));
    let leaf = scene.insert_child(mid, Node::empty("leaf"));
    scene.set_local_position(root, Vec3::new(1.0, 1.0, 1.0));

    scene.flush_transforms();
    for handle in [root, mid, leaf] {
        assert!(!scene.get(handle).unwrap().transform.is_dirty());
    }
}

#[test]
fn kind_payload_survives_reparent() {
    let mut scene = Scene::new("test");
    let parent = scene.add_node(Node::empty("parent"));
    let light = scene.add_node(Node::new(
        "sun",
        NodeKind::Light(kiln::scene::Light::new_directional(
            kiln::math::Color::WHITE,
            1.0,
        )),
    ));
    scene.add_child(parent, light);
    assert!(scene.get(light).unwrap().light().is_some());
}
