//! kiln: a retro-styled software 3D renderer and scene-graph engine.
//!
//! The engine turns a hierarchical scene of models, lights, cameras and
//! bounding volumes into a rasterized color image plus a depth image, on
//! the CPU, with the affine texturing and per-vertex lighting of
//! fifth-generation consoles. Alongside rendering it provides the spatial
//! queries games need: pairwise bounding-volume collision with MTVs and a
//! uniform-grid broadphase for triangle meshes, plus keyframed skeletal
//! animation with blending.
//!
//! ```ignore
//! use kiln::prelude::*;
//!
//! let mut scene = Scene::new("main");
//! let mesh = std::sync::Arc::new(kiln::resources::primitives::cube(1.0, 1.0, 1.0));
//! let model = scene.add_node(Node::new("cube", NodeKind::Model(Box::new(Model::new(mesh)))));
//! let camera = scene.add_node(Node::new("camera", NodeKind::Camera(Box::new(Camera::new(320, 180)))));
//! scene.set_local_position(camera, glam::Vec3::new(0.0, 0.0, 5.0));
//!
//! let mut renderer = Renderer::new();
//! renderer.render(&mut scene, camera);
//! let _pixels = scene.get(camera).unwrap().camera().unwrap().color_texture();
//! let _ = model;
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod assets;
pub mod collision;
pub mod errors;
pub mod math;
pub mod render;
pub mod resources;
pub mod scene;

pub use animation::{Animation, AnimationPlayer, AnimationTrack, FinishMode, Interpolation};
pub use collision::{Bounding, BoundingShape, Collision, CollisionTestSettings, Intersection};
pub use errors::{KilnError, Result};
pub use math::{Color, Dimensions};
pub use render::{bake_lighting, Renderer};
pub use resources::{Image, Library, Material, Mesh, World};
pub use scene::{Camera, Light, Model, Node, NodeHandle, NodeKind, Scene};

/// The common imports for building and rendering scenes.
pub mod prelude {
    pub use crate::animation::{Animation, AnimationPlayer, FinishMode};
    pub use crate::collision::{Bounding, Collision};
    pub use crate::errors::Result;
    pub use crate::math::{Color, Dimensions};
    pub use crate::render::Renderer;
    pub use crate::resources::{Image, Library, Material, Mesh, World};
    pub use crate::scene::{Camera, Light, Model, Node, NodeHandle, NodeKind, Scene};
}
