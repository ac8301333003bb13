use std::fmt;
use std::sync::Arc;

use glam::{Quat, Vec3};
use log::warn;
use rustc_hash::FxHashMap;

use crate::animation::clip::{Animation, Marker};
use crate::animation::tracks::Interpolate;
use crate::scene::{NodeHandle, Scene};

/// What happens when the playhead passes the end of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinishMode {
    /// Wrap around and keep playing.
    #[default]
    Loop,
    /// Reflect the playhead and reverse direction each pass.
    PingPong,
    /// Clamp at the end and stop.
    Stop,
}

/// Sampled channel values for one node.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationValues {
    pub position: Option<Vec3>,
    pub scale: Option<Vec3>,
    pub rotation: Option<Quat>,
}

impl AnimationValues {
    fn blend(previous: &AnimationValues, current: &AnimationValues, u: f32) -> AnimationValues {
        fn mix<T: Interpolate>(prev: Option<T>, current: Option<T>, u: f32) -> Option<T> {
            match (prev, current) {
                (Some(a), Some(b)) => Some(T::interpolate(a, b, u)),
                (_, current) => current,
            }
        }
        AnimationValues {
            position: mix(previous.position, current.position, u),
            scale: mix(previous.scale, current.scale, u),
            rotation: mix(previous.rotation, current.rotation, u),
        }
    }
}

pub type FinishCallback = Arc<dyn Fn() + Send + Sync>;
pub type MarkerCallback = Arc<dyn Fn(&Marker) + Send + Sync>;

/// Plays an [`Animation`] onto a node subtree.
///
/// Channels bind to nodes under the player's root by name; the binding is
/// cached and rebuilt when a different animation is played. A channel
/// naming a node absent from the subtree logs a warning and binds to the
/// root instead.
///
/// Updates are driven purely by the `dt` passed in, so a fixed `dt`
/// sequence yields bit-identical results.
pub struct AnimationPlayer {
    root: NodeHandle,
    animation: Option<Arc<Animation>>,

    pub playhead: f32,
    pub play_speed: f32,
    pub playing: bool,
    pub finish_mode: FinishMode,

    blend_time: f32,
    blend_elapsed: f32,
    blending: bool,

    bindings: FxHashMap<String, NodeHandle>,
    /// Values written on the most recent update, kept as the blend source
    /// when a new animation starts.
    last_values: FxHashMap<NodeHandle, AnimationValues>,
    blend_source: FxHashMap<NodeHandle, AnimationValues>,

    touched_markers: Vec<Marker>,
    finished: bool,

    pub on_finish: Option<FinishCallback>,
    pub on_marker: Option<MarkerCallback>,
}

impl AnimationPlayer {
    #[must_use]
    pub fn new(root: NodeHandle) -> Self {
        Self {
            root,
            animation: None,
            playhead: 0.0,
            play_speed: 1.0,
            playing: false,
            finish_mode: FinishMode::default(),
            blend_time: 0.0,
            blend_elapsed: 0.0,
            blending: false,
            bindings: FxHashMap::default(),
            last_values: FxHashMap::default(),
            blend_source: FxHashMap::default(),
            touched_markers: Vec::new(),
            finished: false,
            on_finish: None,
            on_marker: None,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[must_use]
    pub fn animation(&self) -> Option<&Arc<Animation>> {
        self.animation.as_ref()
    }

    /// Crossfade duration applied when switching animations.
    pub fn set_blend_time(&mut self, seconds: f32) {
        self.blend_time = seconds.max(0.0);
    }

    /// Starts playing `animation` from the beginning.
    ///
    /// Playing the animation that is already bound does nothing. With a
    /// nonzero blend time, the values written by the previous animation
    /// become the crossfade source.
    pub fn play(&mut self, animation: &Arc<Animation>) {
        if let Some(current) = &self.animation {
            if Arc::ptr_eq(current, animation) {
                self.playing = true;
                return;
            }
        }
        if self.blend_time > 0.0 && !self.last_values.is_empty() {
            self.blend_source = self.last_values.clone();
            self.blend_elapsed = 0.0;
            self.blending = true;
        } else {
            self.blending = false;
        }
        self.animation = Some(animation.clone());
        self.bindings.clear();
        self.playhead = 0.0;
        self.playing = true;
        self.finished = false;
        self.touched_markers.clear();
    }

    /// True once a `Stop`-mode animation has reached its end.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Whether the named marker was crossed during the last update.
    #[must_use]
    pub fn touched_marker(&self, name: &str) -> bool {
        self.touched_markers.iter().any(|m| m.name == name)
    }

    /// Whether the playhead is before the named marker.
    #[must_use]
    pub fn before_marker(&self, name: &str) -> bool {
        self.marker_time(name)
            .is_some_and(|time| self.playhead < time)
    }

    /// Whether the playhead is past the named marker.
    #[must_use]
    pub fn after_marker(&self, name: &str) -> bool {
        self.marker_time(name)
            .is_some_and(|time| self.playhead > time)
    }

    fn marker_time(&self, name: &str) -> Option<f32> {
        self.animation
            .as_ref()?
            .markers
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.time)
    }

    /// Advances the playhead and writes sampled (and blended) values to
    /// the bound nodes.
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        self.touched_markers.clear();
        if !self.playing {
            return;
        }
        let Some(animation) = self.animation.clone() else {
            return;
        };
        let length = animation.length.max(0.0);

        let previous_playhead = self.playhead;
        self.playhead += dt * self.play_speed;

        self.ensure_bindings(scene, &animation);
        self.collect_markers(&animation, previous_playhead, self.playhead);

        // End-of-animation handling.
        if length > 0.0 {
            match self.finish_mode {
                FinishMode::Loop => {
                    if self.playhead >= length {
                        self.playhead %= length;
                        self.fire_finish();
                    } else if self.playhead < 0.0 {
                        self.playhead = length + (self.playhead % length);
                        self.fire_finish();
                    }
                }
                FinishMode::PingPong => {
                    if self.playhead > length {
                        self.playhead = length - (self.playhead - length);
                        self.play_speed = -self.play_speed;
                    } else if self.playhead < 0.0 {
                        self.playhead = -self.playhead;
                        self.play_speed = -self.play_speed;
                        self.fire_finish();
                    }
                }
                FinishMode::Stop => {
                    if self.playhead >= length {
                        self.playhead = length;
                        self.playing = false;
                        self.finished = true;
                        self.fire_finish();
                    } else if self.playhead < 0.0 {
                        self.playhead = 0.0;
                        self.playing = false;
                        self.finished = true;
                        self.fire_finish();
                    }
                }
            }
        }

        // Sample every channel at the settled playhead.
        let mut sampled: Vec<(NodeHandle, AnimationValues)> = Vec::new();
        for (name, channel) in &animation.channels {
            let Some(&target) = self.bindings.get(name) else {
                continue;
            };
            let values = AnimationValues {
                position: channel.position.as_ref().and_then(|t| t.sample(self.playhead)),
                scale: channel.scale.as_ref().and_then(|t| t.sample(self.playhead)),
                rotation: channel.rotation.as_ref().and_then(|t| t.sample(self.playhead)),
            };
            sampled.push((target, values));
        }

        // Crossfade from the previous animation's values.
        let blend_u = if self.blending && self.blend_time > 0.0 {
            self.blend_elapsed += dt;
            let u = (self.blend_elapsed / self.blend_time).clamp(0.0, 1.0);
            if u >= 1.0 {
                self.blending = false;
            }
            Some(u)
        } else {
            None
        };

        self.last_values.clear();
        for (target, mut values) in sampled {
            if let Some(u) = blend_u {
                if let Some(previous) = self.blend_source.get(&target) {
                    values = AnimationValues::blend(previous, &values, u);
                }
            }
            if let Some(position) = values.position {
                scene.set_local_position(target, position);
            }
            if let Some(scale) = values.scale {
                scene.set_local_scale(target, scale);
            }
            if let Some(rotation) = values.rotation {
                scene.set_local_rotation(target, rotation);
            }
            self.last_values.insert(target, values);
        }
    }

    /// Resolves channel names to nodes under the root, caching the result.
    /// Missing names warn and bind to the root.
    fn ensure_bindings(&mut self, scene: &Scene, animation: &Animation) {
        if self.bindings.len() == animation.channels.len() {
            return;
        }
        self.bindings.clear();
        for name in animation.channels.keys() {
            let target = if scene.get(self.root).is_some_and(|n| n.name == *name) {
                self.root
            } else if let Some(found) = scene.search(self.root).by_name(name).first() {
                found
            } else {
                warn!(
                    "animation '{}' channel targets missing node '{}'; binding to root",
                    animation.name, name
                );
                self.root
            };
            self.bindings.insert(name.clone(), target);
        }
    }

    /// Records markers whose time lies inside the advanced interval and
    /// fires the marker callback for each.
    fn collect_markers(&mut self, animation: &Animation, from: f32, to: f32) {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        for marker in &animation.markers {
            if marker.time > lo && marker.time <= hi {
                self.touched_markers.push(marker.clone());
                if let Some(cb) = &self.on_marker {
                    cb(marker);
                }
            }
        }
    }

    fn fire_finish(&self) {
        if let Some(cb) = &self.on_finish {
            cb();
        }
    }
}

impl fmt::Debug for AnimationPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationPlayer")
            .field("animation", &self.animation.as_ref().map(|a| a.name.clone()))
            .field("playhead", &self.playhead)
            .field("play_speed", &self.play_speed)
            .field("playing", &self.playing)
            .field("finish_mode", &self.finish_mode)
            .field("blending", &self.blending)
            .finish_non_exhaustive()
    }
}
