use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::math::safe_inverse;
use crate::resources::world::World;
use crate::scene::camera::Camera;
use crate::scene::node::{Node, NodeKind};
use crate::scene::NodeHandle;

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// The scene graph: an arena of nodes plus the world environment record.
///
/// Nodes are owned by the arena; hierarchy edges are handles. Every node is
/// in exactly one parent's child list or in the scene's root list. All
/// transform reads and hierarchy mutations go through `Scene` methods so
/// dirty flags and edge symmetry stay consistent.
pub struct Scene {
    pub name: String,
    pub(crate) id: u32,

    pub(crate) nodes: SlotMap<NodeHandle, Node>,
    pub(crate) roots: Vec<NodeHandle>,

    /// Environment settings: clear color, fog, ambient light.
    pub world: World,

    next_node_id: u32,
}

impl Scene {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            world: World::default(),
            next_node_id: 1,
        }
    }

    /// Stable id assigned by the library or importer.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    fn alloc_node_id(&mut self) -> u32 {
        let id = self.next_node_id;
        self.next_node_id += 1;
        id
    }

    // ========================================================================
    // Node management
    // ========================================================================

    /// Inserts a node as a scene root, assigning its scene-unique id.
    pub fn add_node(&mut self, mut node: Node) -> NodeHandle {
        node.id = self.alloc_node_id();
        node.parent = None;
        let handle = self.nodes.insert(node);
        self.roots.push(handle);
        handle
    }

    /// Inserts a node directly under `parent`, keeping the node's local
    /// transform as authored (unlike [`add_child`](Self::add_child), which
    /// preserves world pose of an existing node).
    pub fn insert_child(&mut self, parent: NodeHandle, mut node: Node) -> NodeHandle {
        node.id = self.alloc_node_id();
        node.parent = Some(parent);
        let handle = self.nodes.insert(node);
        if self.nodes.contains_key(parent) {
            self.nodes[parent].children.push(handle);
        } else {
            self.nodes[handle].parent = None;
            self.roots.push(handle);
        }
        handle
    }

    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Iterates over every node in the scene, in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    /// Root node handles, in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Finds a node by its scene-unique id.
    #[must_use]
    pub fn node_by_id(&self, id: u32) -> Option<NodeHandle> {
        self.nodes.iter().find(|(_, n)| n.id == id).map(|(h, _)| h)
    }

    /// Removes a node and its entire subtree from the scene.
    pub fn remove(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }
        self.detach(handle);
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.remove(h) {
                stack.extend(node.children);
            }
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Reparents `child` under `parent`, preserving the child's world pose.
    ///
    /// The child is detached from its current parent (or the root list)
    /// first; its local transform is recomputed through the new parent's
    /// inverse world matrix so its world transform does not change. Fires
    /// the child's `on_reparent` hook.
    pub fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        if parent == child
            || !self.nodes.contains_key(parent)
            || !self.nodes.contains_key(child)
            || self.is_ancestor(child, parent)
        {
            return;
        }
        let child_world = self.world_matrix(child);
        self.detach(child);

        let parent_world = self.world_matrix(parent);
        let local = safe_inverse(parent_world) * child_world;

        let node = &mut self.nodes[child];
        node.transform.set_from_matrix(local);
        node.parent = Some(parent);
        self.nodes[parent].children.push(child);

        self.mark_subtree_dirty(child);
        self.fire_reparent(child);
    }

    /// Reparents several children in order. See [`add_child`](Self::add_child).
    pub fn add_children(&mut self, parent: NodeHandle, children: &[NodeHandle]) {
        for &child in children {
            self.add_child(parent, child);
        }
    }

    /// Detaches `child` from its parent and makes it a scene root,
    /// preserving its world pose. Fires `on_reparent`.
    pub fn unparent(&mut self, child: NodeHandle) {
        if !self.nodes.contains_key(child) {
            return;
        }
        if self.nodes[child].parent.is_none() {
            return;
        }
        let world = self.world_matrix(child);
        self.detach(child);
        let node = &mut self.nodes[child];
        node.transform.set_from_matrix(world);
        self.roots.push(child);
        self.mark_subtree_dirty(child);
        self.fire_reparent(child);
    }

    /// True when `ancestor` appears on `node`'s parent chain.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.nodes.get(h).and_then(|n| n.parent);
        }
        false
    }

    /// Removes `handle` from its parent's child list or the root list,
    /// leaving it unowned. Callers reattach it immediately.
    fn detach(&mut self, handle: NodeHandle) {
        let parent = self.nodes[handle].parent.take();
        if let Some(p) = parent {
            if let Some(parent_node) = self.nodes.get_mut(p) {
                parent_node.children.retain(|&c| c != handle);
            }
        } else {
            self.roots.retain(|&r| r != handle);
        }
    }

    fn fire_reparent(&mut self, handle: NodeHandle) {
        let hook = self.nodes[handle].hooks.on_reparent.clone();
        if let Some(cb) = hook {
            cb(&mut self.nodes[handle]);
        }
    }

    // ========================================================================
    // Transforms
    // ========================================================================

    /// The node's world matrix, recomputed lazily.
    ///
    /// When the cached matrix is stale the local `T * R * S` composition is
    /// multiplied by the parent's world matrix (recursing up the chain),
    /// the dirty flag is cleared and the node's `on_transform_update` hook
    /// fires exactly once. Returns identity for a dead handle.
    pub fn world_matrix(&mut self, handle: NodeHandle) -> Mat4 {
        let Some(node) = self.nodes.get(handle) else {
            return Mat4::IDENTITY;
        };
        if !node.transform.dirty {
            return node.transform.world_matrix;
        }
        let parent = node.parent;
        let parent_world = match parent {
            Some(p) => self.world_matrix(p),
            None => Mat4::IDENTITY,
        };
        let node = &mut self.nodes[handle];
        let world = parent_world * node.transform.local_matrix();
        node.transform.world_matrix = world;
        node.transform.dirty = false;
        let hook = node.hooks.on_transform_update.clone();
        if let Some(cb) = hook {
            cb(&mut self.nodes[handle]);
        }
        world
    }

    /// Decomposed world-space position.
    pub fn world_position(&mut self, handle: NodeHandle) -> Vec3 {
        self.world_matrix(handle).w_axis.truncate()
    }

    /// Decomposed world-space rotation. Incorrect under negative scale.
    pub fn world_rotation(&mut self, handle: NodeHandle) -> Quat {
        let (_, rotation, _) = crate::math::decompose(self.world_matrix(handle));
        rotation
    }

    /// Decomposed world-space (non-negative) scale.
    pub fn world_scale(&mut self, handle: NodeHandle) -> Vec3 {
        let (_, _, scale) = crate::math::decompose(self.world_matrix(handle));
        scale
    }

    pub fn set_local_position(&mut self, handle: NodeHandle, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.position = position;
            self.mark_subtree_dirty(handle);
        }
    }

    pub fn set_local_rotation(&mut self, handle: NodeHandle, rotation: Quat) {
        if let Some(node) = self.nodes.get_mut(handle) {
            // NaN or zero-length rotations are clamped to identity rather
            // than poisoning the transform chain.
            let rotation = if rotation.is_finite() && rotation.length_squared() > f32::EPSILON {
                rotation.normalize()
            } else {
                Quat::IDENTITY
            };
            node.transform.rotation = rotation;
            self.mark_subtree_dirty(handle);
        }
    }

    pub fn set_local_scale(&mut self, handle: NodeHandle, scale: Vec3) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.scale = scale;
            self.mark_subtree_dirty(handle);
        }
    }

    /// Sets the world-space position by back-computing the equivalent local
    /// position through the parent's inverse world matrix.
    pub fn set_world_position(&mut self, handle: NodeHandle, position: Vec3) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let local = match node.parent {
            Some(p) => safe_inverse(self.world_matrix(p)).transform_point3(position),
            None => position,
        };
        self.set_local_position(handle, local);
    }

    /// Sets the world-space rotation by removing the parent's world
    /// rotation.
    pub fn set_world_rotation(&mut self, handle: NodeHandle, rotation: Quat) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let local = match node.parent {
            Some(p) => self.world_rotation(p).inverse() * rotation,
            None => rotation,
        };
        self.set_local_rotation(handle, local);
    }

    /// Sets the world-space scale by dividing out the parent's world scale.
    pub fn set_world_scale(&mut self, handle: NodeHandle, scale: Vec3) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let local = match node.parent {
            Some(p) => {
                let parent_scale = self.world_scale(p).max(Vec3::splat(f32::EPSILON));
                scale / parent_scale
            }
            None => scale,
        };
        self.set_local_scale(handle, local);
    }

    /// Orients the node so its local -Z points at a world-space target.
    pub fn look_at(&mut self, handle: NodeHandle, target: Vec3, up: Vec3) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let local_target = match node.parent {
            Some(p) => safe_inverse(self.world_matrix(p)).transform_point3(target),
            None => target,
        };
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.look_at(local_target, up);
            self.mark_subtree_dirty(handle);
        }
    }

    /// Marks the node and all descendants as needing world-matrix
    /// recomputation.
    ///
    /// A node already marked dirty implies its whole subtree is, so the
    /// walk prunes there.
    pub fn mark_subtree_dirty(&mut self, handle: NodeHandle) {
        let mut stack = vec![handle];
        let mut first = true;
        while let Some(h) = stack.pop() {
            let Some(node) = self.nodes.get_mut(h) else {
                continue;
            };
            if node.transform.dirty && !first {
                continue;
            }
            node.transform.dirty = true;
            first = false;
            stack.extend(node.children.iter().copied());
        }
    }

    /// Recomputes every stale world matrix in the scene.
    pub fn flush_transforms(&mut self) {
        let handles: Vec<NodeHandle> = self.nodes.keys().collect();
        for h in handles {
            self.world_matrix(h);
        }
    }

    // ========================================================================
    // Cloning
    // ========================================================================

    /// Deep-clones a subtree, reassigning node ids.
    ///
    /// The clone is attached next to the source (same parent, or the root
    /// list). Handle references inside node payloads (skin joints, light
    /// groups, grid connections, sector neighbors) are remapped to their
    /// cloned counterparts when the referenced node is inside the cloned
    /// subtree. Meshes marked `unique` are deep-copied; shared meshes stay
    /// shared by reference.
    ///
    /// No hooks run while edges are being rewired; `on_clone` fires on each
    /// cloned node in a post-pass once the subtree is complete.
    pub fn clone_subtree(&mut self, source: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(source)?;

        // Collect the subtree in traversal order.
        let mut order = Vec::new();
        let mut stack = vec![source];
        while let Some(h) = stack.pop() {
            order.push(h);
            stack.extend(self.nodes[h].children.iter().copied());
        }

        // Pass 1: insert raw clones.
        let mut map: FxHashMap<NodeHandle, NodeHandle> = FxHashMap::default();
        for &old in &order {
            let mut node = self.nodes[old].clone();
            node.id = self.alloc_node_id();
            let new = self.nodes.insert(node);
            map.insert(old, new);
        }

        // Pass 2: rewire edges and remap payload handles.
        for &old in &order {
            let new = map[&old];
            let children: Vec<NodeHandle> =
                self.nodes[old].children.iter().map(|c| map[c]).collect();
            let parent = if old == source {
                self.nodes[old].parent
            } else {
                self.nodes[old].parent.map(|p| map[&p])
            };
            let node = &mut self.nodes[new];
            node.children = children;
            node.parent = parent;
            remap_payload(&mut node.kind, &map);
        }

        let new_root = map[&source];
        match self.nodes[new_root].parent {
            Some(p) => self.nodes[p].children.push(new_root),
            None => self.roots.push(new_root),
        }
        self.mark_subtree_dirty(new_root);

        // Post-pass: edges are complete, run the clone hooks.
        for &old in &order {
            let new = map[&old];
            let hook = self.nodes[new].hooks.on_clone.clone();
            if let Some(cb) = hook {
                cb(&mut self.nodes[new]);
            }
        }

        Some(new_root)
    }

    // ========================================================================
    // Renderer support
    // ========================================================================

    /// Temporarily takes the camera payload out of a node so the renderer
    /// can write to its back buffers while traversing the scene.
    pub(crate) fn take_camera(&mut self, handle: NodeHandle) -> Option<Box<Camera>> {
        let node = self.nodes.get_mut(handle)?;
        match std::mem::replace(&mut node.kind, NodeKind::Empty) {
            NodeKind::Camera(camera) => Some(camera),
            other => {
                node.kind = other;
                None
            }
        }
    }

    pub(crate) fn restore_camera(&mut self, handle: NodeHandle, camera: Box<Camera>) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.kind = NodeKind::Camera(camera);
        }
    }
}

/// Remaps handle references held inside a cloned node's payload. Handles
/// pointing outside the cloned subtree are preserved; dynamic batch links
/// are dropped (batches are per-instance state).
fn remap_payload(kind: &mut NodeKind, map: &FxHashMap<NodeHandle, NodeHandle>) {
    let remap = |h: NodeHandle| map.get(&h).copied().unwrap_or(h);
    match kind {
        NodeKind::Model(model) => {
            if model.mesh.unique {
                model.mesh = Arc::new((*model.mesh).clone());
            }
            if let Some(skin) = &mut model.skin {
                skin.root = skin.root.map(remap);
                for joint in &mut skin.joints {
                    *joint = remap(*joint);
                }
            }
            if let Some(group) = &mut model.light_group {
                for light in &mut group.lights {
                    *light = remap(*light);
                }
            }
            model.batch_members.clear();
            model.batch_owner = None;
        }
        NodeKind::GridPoint(point) => {
            for connection in &mut point.connections {
                *connection = remap(*connection);
            }
        }
        NodeKind::Sector(sector) => {
            for neighbor in &mut sector.neighbors {
                *neighbor = remap(*neighbor);
            }
        }
        _ => {}
    }
}
