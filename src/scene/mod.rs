//! Scene Graph System
//!
//! A hierarchical scene graph for organizing 3D objects, cameras, lights and
//! bounding volumes. Nodes live in a [`slotmap`] arena owned by the
//! [`Scene`]; parents hold their children by handle and upward links are
//! plain (non-owning) handles, so ownership is exclusive and generation
//! tracking makes stale handles safe.
//!
//! # Transforms
//!
//! Every node carries a [`Transform`]: local position/rotation/scale plus a
//! cached world matrix and a dirty flag. Mutation marks the node's subtree
//! dirty eagerly; world matrices are recomputed lazily on read (see
//! [`Scene::world_matrix`]), firing each node's `on_transform_update` hook
//! exactly once per recomputation.
//!
//! # Node kinds
//!
//! Polymorphism is a tagged sum ([`NodeKind`]): empty nodes, models,
//! cameras, lights, bounding volumes, paths, grids and sectors. Kind data
//! travels with the node through cloning and reparenting.

pub mod camera;
pub mod grid;
pub mod light;
pub mod model;
pub mod node;
pub mod path;
pub mod properties;
pub mod search;
pub mod sector;
pub mod transform;

#[allow(clippy::module_inception)]
mod scene;

pub use camera::{Camera, Frustum, RenderStats};
pub use grid::{Grid, GridPoint};
pub use light::{Light, LightGroup, LightKind};
pub use model::{Model, Skin};
pub use node::{Node, NodeCallback, NodeHooks, NodeKind};
pub use path::Path;
pub use properties::{Properties, Property};
pub use scene::Scene;
pub use search::TreeSearch;
pub use sector::{Sector, SectorDetection};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    /// Strongly-typed handle for scene nodes.
    ///
    /// A `SlotMap` key: generation-tracked for safe reuse, 8 bytes, `Copy`.
    pub struct NodeHandle;
}
