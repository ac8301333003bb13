//! Keyframed skeletal and node animation.
//!
//! An [`Animation`] holds per-node channels of position/scale/rotation
//! tracks plus named time markers. An [`AnimationPlayer`] binds an
//! animation to a node subtree by name, advances a playhead, blends
//! between animations, and writes sampled values back through the scene's
//! transform setters. Skinning reads the node transforms the player wrote;
//! the player never touches vertex data.

pub mod clip;
pub mod player;
pub mod tracks;

pub use clip::{Animation, AnimationChannel, Marker};
pub use player::{AnimationPlayer, AnimationValues, FinishMode};
pub use tracks::{AnimationTrack, Interpolate, Interpolation, Keyframe};
