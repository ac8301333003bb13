use crate::scene::node::Node;
use crate::scene::{NodeHandle, Scene};

type NodeFilter<'a> = Box<dyn Fn(&Node) -> bool + 'a>;

/// A lazy depth-first iterator over a node's descendants.
///
/// Filters are chainable and applied lazily as the iterator advances;
/// they select which nodes are *yielded*, not which subtrees are visited.
/// The search root itself is not yielded.
///
/// ```ignore
/// let enemies: Vec<_> = scene
///     .search(root)
///     .by_prefix("enemy")
///     .by_property("hp")
///     .collect();
/// ```
pub struct TreeSearch<'a> {
    scene: &'a Scene,
    stack: Vec<NodeHandle>,
    filters: Vec<NodeFilter<'a>>,
}

impl<'a> TreeSearch<'a> {
    pub(crate) fn new(scene: &'a Scene, root: NodeHandle) -> Self {
        let stack = scene
            .get(root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        Self {
            scene,
            stack,
            filters: Vec::new(),
        }
    }

    /// Adds an arbitrary predicate filter.
    #[must_use]
    pub fn filter(mut self, f: impl Fn(&Node) -> bool + 'a) -> Self {
        self.filters.push(Box::new(f));
        self
    }

    /// Keeps nodes whose name matches exactly.
    #[must_use]
    pub fn by_name(self, name: &'a str) -> Self {
        self.filter(move |n| n.name == name)
    }

    /// Keeps nodes whose name starts with `prefix`.
    #[must_use]
    pub fn by_prefix(self, prefix: &'a str) -> Self {
        self.filter(move |n| n.name.starts_with(prefix))
    }

    /// Keeps nodes that have the named property.
    #[must_use]
    pub fn by_property(self, key: &'a str) -> Self {
        self.filter(move |n| n.properties.has(key))
    }

    /// Keeps nodes of the named kind (see
    /// [`NodeKind::kind_name`](crate::scene::NodeKind::kind_name)).
    #[must_use]
    pub fn by_kind(self, kind_name: &'static str) -> Self {
        self.filter(move |n| n.kind.kind_name() == kind_name)
    }

    /// Keeps model nodes.
    #[must_use]
    pub fn models(self) -> Self {
        self.by_kind("model")
    }

    /// Keeps light nodes.
    #[must_use]
    pub fn lights(self) -> Self {
        self.by_kind("light")
    }

    /// Keeps bounding-volume nodes.
    #[must_use]
    pub fn bounding_objects(self) -> Self {
        self.by_kind("bounding")
    }

    /// First matching descendant, if any.
    #[must_use]
    pub fn first(mut self) -> Option<NodeHandle> {
        self.next()
    }
}

impl Iterator for TreeSearch<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        while let Some(handle) = self.stack.pop() {
            let Some(node) = self.scene.get(handle) else {
                continue;
            };
            self.stack.extend(node.children.iter().rev().copied());
            if self.filters.iter().all(|f| f(node)) {
                return Some(handle);
            }
        }
        None
    }
}

impl Scene {
    /// Starts a lazy search over the descendants of `root`.
    #[must_use]
    pub fn search(&self, root: NodeHandle) -> TreeSearch<'_> {
        TreeSearch::new(self, root)
    }
}
