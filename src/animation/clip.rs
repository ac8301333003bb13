use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::animation::tracks::AnimationTrack;

/// A named point in time inside an animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub time: f32,
    pub name: String,
}

/// Up to three tracks animating one node.
#[derive(Debug, Clone, Default)]
pub struct AnimationChannel {
    pub position: Option<AnimationTrack<Vec3>>,
    pub scale: Option<AnimationTrack<Vec3>>,
    pub rotation: Option<AnimationTrack<Quat>>,
}

impl AnimationChannel {
    /// Longest track length in the channel.
    #[must_use]
    pub fn length(&self) -> f32 {
        let mut length: f32 = 0.0;
        if let Some(t) = &self.position {
            length = length.max(t.length());
        }
        if let Some(t) = &self.scale {
            length = length.max(t.length());
        }
        if let Some(t) = &self.rotation {
            length = length.max(t.length());
        }
        length
    }
}

/// A named animation: channels keyed by target node name, plus markers.
#[derive(Debug, Clone)]
pub struct Animation {
    pub name: String,
    pub(crate) id: u32,
    /// Length in seconds. Updated by [`recalculate_length`]
    /// (Animation::recalculate_length) or set explicitly for animations
    /// that hold past their last keyframe.
    pub length: f32,
    /// Markers sorted by time.
    pub markers: Vec<Marker>,
    pub channels: FxHashMap<String, AnimationChannel>,
}

impl Animation {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: 0,
            length: 0.0,
            markers: Vec::new(),
            channels: FxHashMap::default(),
        }
    }

    /// Library-stable id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Adds (or fetches) the channel animating the named node.
    pub fn channel(&mut self, node_name: impl Into<String>) -> &mut AnimationChannel {
        self.channels.entry(node_name.into()).or_default()
    }

    pub fn add_marker(&mut self, time: f32, name: impl Into<String>) {
        let marker = Marker {
            time,
            name: name.into(),
        };
        let at = self.markers.partition_point(|m| m.time <= marker.time);
        self.markers.insert(at, marker);
    }

    /// Recomputes `length` as the longest channel length.
    pub fn recalculate_length(&mut self) {
        self.length = self
            .channels
            .values()
            .map(AnimationChannel::length)
            .fold(0.0, f32::max);
    }
}
