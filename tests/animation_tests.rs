//! Animation player tests
//!
//! Covers:
//! - Keyframe sampling through the player (clamping, interpolation)
//! - Quaternion rotation tracks
//! - Finish modes: loop wrap, ping-pong reflection, stop-and-clamp
//! - Marker crossing and the before/after queries
//! - Crossfade blending between animations
//! - Missing channel targets binding to the root
//! - Determinism across identical runs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::{Quat, Vec3};
use kiln::animation::{Animation, AnimationPlayer, AnimationTrack, FinishMode, Interpolation};
use kiln::scene::{Node, Scene};

const EPSILON: f32 = 1e-4;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

/// One channel, animating `node_name` from the origin to (10, 0, 0) over a
/// second.
fn slide_animation(node_name: &str) -> Arc<Animation> {
    let mut animation = Animation::new("slide");
    animation.channel(node_name).position = Some(AnimationTrack::from_keyframes(
        [(0.0, Vec3::ZERO), (1.0, Vec3::new(10.0, 0.0, 0.0))],
        Interpolation::Linear,
    ));
    animation.recalculate_length();
    Arc::new(animation)
}

fn rig(node_name: &str) -> (Scene, kiln::NodeHandle, kiln::NodeHandle) {
    let mut scene = Scene::new("test");
    let root = scene.add_node(Node::empty("armature"));
    let target = scene.insert_child(root, Node::empty(node_name));
    (scene, root, target)
}

#[test]
fn linear_position_track_samples_through_player() {
    let (mut scene, root, target) = rig("slider");
    let mut player = AnimationPlayer::new(root);
    player.play(&slide_animation("slider"));

    player.update(&mut scene, 0.5);
    assert!(vec3_approx(
        scene.world_position(target),
        Vec3::new(5.0, 0.0, 0.0)
    ));
}

#[test]
fn sampling_clamps_outside_key_range() {
    let track = AnimationTrack::from_keyframes(
        [(0.0, Vec3::ZERO), (1.0, Vec3::new(10.0, 0.0, 0.0))],
        Interpolation::Linear,
    );
    assert_eq!(track.sample(-1.0), Some(Vec3::ZERO));
    assert_eq!(track.sample(2.0), Some(Vec3::new(10.0, 0.0, 0.0)));
    assert_eq!(track.sample(0.5), Some(Vec3::new(5.0, 0.0, 0.0)));
}

#[test]
fn rotation_track_slerps_halfway() {
    let (mut scene, root, target) = rig("spinner");
    let mut animation = Animation::new("spin");
    animation.channel("spinner").rotation = Some(AnimationTrack::from_keyframes(
        [
            (0.0, Quat::IDENTITY),
            (1.0, Quat::from_rotation_y(std::f32::consts::PI)),
        ],
        Interpolation::Linear,
    ));
    animation.recalculate_length();

    let mut player = AnimationPlayer::new(root);
    player.play(&Arc::new(animation));
    player.update(&mut scene, 0.5);

    let rotated = scene.world_rotation(target) * Vec3::Z;
    assert!((rotated - Vec3::X).length() < 1e-3);
}

#[test]
fn stop_mode_clamps_and_finishes() {
    let (mut scene, root, _target) = rig("slider");
    let mut player = AnimationPlayer::new(root);
    player.finish_mode = FinishMode::Stop;

    let finishes = Arc::new(AtomicUsize::new(0));
    let captured = finishes.clone();
    player.on_finish = Some(Arc::new(move || {
        captured.fetch_add(1, Ordering::SeqCst);
    }));

    player.play(&slide_animation("slider"));
    player.update(&mut scene, 1.5);

    assert!((player.playhead - 1.0).abs() < EPSILON);
    assert!(!player.playing);
    assert!(player.finished());
    assert_eq!(finishes.load(Ordering::SeqCst), 1);

    // A finished player stays put.
    player.update(&mut scene, 1.0);
    assert_eq!(finishes.load(Ordering::SeqCst), 1);
}

#[test]
fn loop_mode_wraps_playhead() {
    let (mut scene, root, target) = rig("slider");
    let mut player = AnimationPlayer::new(root);
    player.finish_mode = FinishMode::Loop;
    player.play(&slide_animation("slider"));

    player.update(&mut scene, 0.6);
    player.update(&mut scene, 0.6);
    assert!((player.playhead - 0.2).abs() < EPSILON);
    assert!(player.playing);
    assert!(vec3_approx(
        scene.world_position(target),
        Vec3::new(2.0, 0.0, 0.0)
    ));
}

#[test]
fn ping_pong_reflects_and_reverses() {
    let (mut scene, root, _target) = rig("slider");
    let mut player = AnimationPlayer::new(root);
    player.finish_mode = FinishMode::PingPong;
    player.play(&slide_animation("slider"));

    player.update(&mut scene, 0.7);
    assert!((player.playhead - 0.7).abs() < EPSILON);
    assert!(player.play_speed > 0.0);

    // Passing the end reflects the overshoot and reverses direction.
    player.update(&mut scene, 0.7);
    assert!((player.playhead - 0.6).abs() < EPSILON);
    assert!(player.play_speed < 0.0);

    // Passing the start reflects again and fires the finish callback.
    let finishes = Arc::new(AtomicUsize::new(0));
    let captured = finishes.clone();
    player.on_finish = Some(Arc::new(move || {
        captured.fetch_add(1, Ordering::SeqCst);
    }));
    player.update(&mut scene, 0.7);
    assert!((player.playhead - 0.1).abs() < EPSILON);
    assert!(player.play_speed > 0.0);
    assert_eq!(finishes.load(Ordering::SeqCst), 1);
}

#[test]
fn markers_report_crossing_and_ordering() {
    let (mut scene, root, _target) = rig("slider");
    let mut animation = Animation::new("slide");
    animation.channel("slider").position = Some(AnimationTrack::from_keyframes(
        [(0.0, Vec3::ZERO), (1.0, Vec3::X)],
        Interpolation::Linear,
    ));
    animation.add_marker(0.5, "footstep");
    animation.recalculate_length();
    let animation = Arc::new(animation);

    let marker_hits = Arc::new(AtomicUsize::new(0));
    let captured = marker_hits.clone();

    let mut player = AnimationPlayer::new(root);
    player.on_marker = Some(Arc::new(move |marker| {
        assert_eq!(marker.name, "footstep");
        captured.fetch_add(1, Ordering::SeqCst);
    }));
    player.play(&animation);

    player.update(&mut scene, 0.3);
    assert!(!player.touched_marker("footstep"));
    assert!(player.before_marker("footstep"));

    player.update(&mut scene, 0.3);
    assert!(player.touched_marker("footstep"));
    assert!(player.after_marker("footstep"));
    assert_eq!(marker_hits.load(Ordering::SeqCst), 1);

    // The touched list only reflects the last update.
    player.update(&mut scene, 0.1);
    assert!(!player.touched_marker("footstep"));
}

#[test]
fn blending_crossfades_between_animations() {
    let (mut scene, root, target) = rig("slider");

    let mut still = Animation::new("still");
    still.channel("slider").position = Some(AnimationTrack::from_keyframes(
        [(0.0, Vec3::ZERO), (1.0, Vec3::ZERO)],
        Interpolation::Linear,
    ));
    still.recalculate_length();
    let still = Arc::new(still);

    let mut shifted = Animation::new("shifted");
    shifted.channel("slider").position = Some(AnimationTrack::from_keyframes(
        [(0.0, Vec3::new(10.0, 0.0, 0.0)), (1.0, Vec3::new(10.0, 0.0, 0.0))],
        Interpolation::Linear,
    ));
    shifted.recalculate_length();
    let shifted = Arc::new(shifted);

    let mut player = AnimationPlayer::new(root);
    player.set_blend_time(1.0);
    player.play(&still);
    player.update(&mut scene, 0.1);
    assert!(vec3_approx(scene.world_position(target), Vec3::ZERO));

    player.play(&shifted);
    player.update(&mut scene, 0.5);
    let blended = scene.world_position(target);
    assert!(blended.x > 1.0 && blended.x < 9.0);

    // Past the blend window the new animation fully owns the node.
    player.update(&mut scene, 1.0);
    assert!(vec3_approx(
        scene.world_position(target),
        Vec3::new(10.0, 0.0, 0.0)
    ));
}

#[test]
fn missing_channel_target_binds_to_root() {
    let (mut scene, root, _target) = rig("slider");
    let mut player = AnimationPlayer::new(root);
    player.play(&slide_animation("no_such_node"));
    player.update(&mut scene, 0.5);

    // The root receives the channel's values instead.
    assert!(vec3_approx(
        scene.world_position(root),
        Vec3::new(5.0, 0.0, 0.0)
    ));
}

#[test]
fn same_animation_replay_does_not_restart() {
    let (mut scene, root, _target) = rig("slider");
    let animation = slide_animation("slider");
    let mut player = AnimationPlayer::new(root);
    player.play(&animation);
    player.update(&mut scene, 0.4);

    player.play(&animation);
    assert!((player.playhead - 0.4).abs() < EPSILON);
}

#[test]
fn updates_are_deterministic() {
    let run = || {
        let (mut scene, root, target) = rig("slider");
        let mut player = AnimationPlayer::new(root);
        player.finish_mode = FinishMode::PingPong;
        player.play(&slide_animation("slider"));
        for _ in 0..37 {
            player.update(&mut scene, 0.173);
        }
        scene.world_position(target)
    };
    // Bit-identical across runs for a fixed dt sequence.
    assert_eq!(run(), run());
}
