use std::fmt;
use std::sync::Arc;

use crate::collision::Bounding;
use crate::scene::camera::Camera;
use crate::scene::grid::{Grid, GridPoint};
use crate::scene::light::Light;
use crate::scene::model::Model;
use crate::scene::path::Path;
use crate::scene::properties::Properties;
use crate::scene::sector::Sector;
use crate::scene::transform::Transform;
use crate::scene::NodeHandle;

/// Callback invoked with the node it was registered on.
pub type NodeCallback = Arc<dyn Fn(&mut Node) + Send + Sync>;

/// Per-node hook slots.
///
/// `on_transform_update` fires exactly once per world-matrix recomputation.
/// `on_clone` fires on each node of a cloned subtree after every
/// parent/child edge has been rewired; `on_reparent` fires after a node
/// changes parent. Bulk cloning suppresses hook invocation until the clone
/// completes.
#[derive(Clone, Default)]
pub struct NodeHooks {
    pub on_clone: Option<NodeCallback>,
    pub on_reparent: Option<NodeCallback>,
    pub on_transform_update: Option<NodeCallback>,
}

impl fmt::Debug for NodeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHooks")
            .field("on_clone", &self.on_clone.is_some())
            .field("on_reparent", &self.on_reparent.is_some())
            .field("on_transform_update", &self.on_transform_update.is_some())
            .finish()
    }
}

/// The polymorphic payload of a node.
///
/// Light variants share one wrapper with a kind enum, as do bounding
/// volumes; every other kind is its own variant. `Empty` is a plain
/// transform-only node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Empty,
    Model(Box<Model>),
    Camera(Box<Camera>),
    Light(Light),
    Bounding(Bounding),
    Path(Path),
    GridPoint(GridPoint),
    Grid(Grid),
    Sector(Sector),
}

impl NodeKind {
    /// Stable name of the variant, usable as a search key.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Empty => "node",
            NodeKind::Model(_) => "model",
            NodeKind::Camera(_) => "camera",
            NodeKind::Light(_) => "light",
            NodeKind::Bounding(_) => "bounding",
            NodeKind::Path(_) => "path",
            NodeKind::GridPoint(_) => "grid_point",
            NodeKind::Grid(_) => "grid",
            NodeKind::Sector(_) => "sector",
        }
    }
}

/// A scene node: hierarchy links, transform, identity and payload.
///
/// Nodes are created with [`Node::new`] and inserted through
/// [`Scene::add_node`](crate::scene::Scene::add_node), which assigns the
/// scene-unique id. Hierarchy edges are maintained by `Scene` methods so a
/// node is always in exactly one parent's child list, or is a scene root.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) id: u32,

    pub name: String,
    pub transform: Transform,
    /// Affects rendering of this node and its subtree, but not collision.
    pub visible: bool,
    pub properties: Properties,
    pub hooks: NodeHooks,
    pub kind: NodeKind,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            id: 0,
            name: name.into(),
            transform: Transform::new(),
            visible: true,
            properties: Properties::new(),
            hooks: NodeHooks::default(),
            kind,
        }
    }

    /// Transform-only node.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Empty)
    }

    /// Scene-unique stable id, assigned on insertion.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        match &self.kind {
            NodeKind::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut Model> {
        match &mut self.kind {
            NodeKind::Model(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn bounding(&self) -> Option<&Bounding> {
        match &self.kind {
            NodeKind::Bounding(b) => Some(b),
            _ => None,
        }
    }

    pub fn bounding_mut(&mut self) -> Option<&mut Bounding> {
        match &mut self.kind {
            NodeKind::Bounding(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn grid_point(&self) -> Option<&GridPoint> {
        match &self.kind {
            NodeKind::GridPoint(g) => Some(g),
            _ => None,
        }
    }

    pub fn grid_point_mut(&mut self) -> Option<&mut GridPoint> {
        match &mut self.kind {
            NodeKind::GridPoint(g) => Some(g),
            _ => None,
        }
    }

    #[must_use]
    pub fn sector(&self) -> Option<&Sector> {
        match &self.kind {
            NodeKind::Sector(s) => Some(s),
            _ => None,
        }
    }

    pub fn sector_mut(&mut self) -> Option<&mut Sector> {
        match &mut self.kind {
            NodeKind::Sector(s) => Some(s),
            _ => None,
        }
    }
}
