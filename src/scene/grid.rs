use glam::Vec3;

use crate::scene::{NodeHandle, NodeKind, Scene};

/// A navigation waypoint inside a [`Grid`].
///
/// Connections are symmetric and maintained through
/// [`Scene::grid_connect`] / [`Scene::grid_disconnect`].
#[derive(Debug, Clone, Default)]
pub struct GridPoint {
    pub connections: Vec<NodeHandle>,
}

/// A container node whose [`GridPoint`] descendants form a navigation
/// graph.
#[derive(Debug, Clone, Default)]
pub struct Grid {}

impl Scene {
    /// Connects two grid points symmetrically. No-op unless both handles
    /// are grid points.
    pub fn grid_connect(&mut self, a: NodeHandle, b: NodeHandle) {
        if a == b {
            return;
        }
        let both = self.get(a).is_some_and(|n| n.grid_point().is_some())
            && self.get(b).is_some_and(|n| n.grid_point().is_some());
        if !both {
            return;
        }
        if let Some(point) = self.get_mut(a).and_then(|n| n.grid_point_mut()) {
            if !point.connections.contains(&b) {
                point.connections.push(b);
            }
        }
        if let Some(point) = self.get_mut(b).and_then(|n| n.grid_point_mut()) {
            if !point.connections.contains(&a) {
                point.connections.push(a);
            }
        }
    }

    /// Removes the symmetric connection between two grid points.
    pub fn grid_disconnect(&mut self, a: NodeHandle, b: NodeHandle) {
        if let Some(point) = self.get_mut(a).and_then(|n| n.grid_point_mut()) {
            point.connections.retain(|&c| c != b);
        }
        if let Some(point) = self.get_mut(b).and_then(|n| n.grid_point_mut()) {
            point.connections.retain(|&c| c != a);
        }
    }

    /// Grid point descendants of `grid`, in traversal order.
    #[must_use]
    pub fn grid_points(&self, grid: NodeHandle) -> Vec<NodeHandle> {
        self.search(grid)
            .filter(|n| matches!(n.kind, NodeKind::GridPoint(_)))
            .collect()
    }

    /// The grid point nearest to a world-space position.
    pub fn nearest_grid_point(&mut self, grid: NodeHandle, position: Vec3) -> Option<NodeHandle> {
        let points = self.grid_points(grid);
        points
            .into_iter()
            .map(|p| (p, self.world_position(p).distance_squared(position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }

    /// Shortest path between two grid points over their connections,
    /// weighted by world-space distance. Returns the point sequence
    /// including both endpoints, or `None` when unreachable.
    pub fn grid_path(&mut self, from: NodeHandle, to: NodeHandle) -> Option<Vec<NodeHandle>> {
        use rustc_hash::FxHashMap;

        if self.get(from)?.grid_point().is_none() || self.get(to)?.grid_point().is_none() {
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }

        // Dijkstra over the connection graph; graphs are small enough that
        // a linear frontier scan beats a binary heap here.
        let mut dist: FxHashMap<NodeHandle, f32> = FxHashMap::default();
        let mut prev: FxHashMap<NodeHandle, NodeHandle> = FxHashMap::default();
        let mut frontier: Vec<NodeHandle> = vec![from];
        dist.insert(from, 0.0);

        while !frontier.is_empty() {
            let (idx, &current) = frontier
                .iter()
                .enumerate()
                .min_by(|a, b| dist[a.1].total_cmp(&dist[b.1]))?;
            frontier.swap_remove(idx);
            if current == to {
                break;
            }
            let current_dist = dist[&current];
            let current_pos = self.world_position(current);
            let connections = self
                .get(current)
                .and_then(|n| n.grid_point())
                .map(|p| p.connections.clone())
                .unwrap_or_default();
            for next in connections {
                if self.get(next).is_none() {
                    continue;
                }
                let step = current_pos.distance(self.world_position(next));
                let candidate = current_dist + step;
                if dist.get(&next).is_none_or(|&d| candidate < d) {
                    dist.insert(next, candidate);
                    prev.insert(next, current);
                    if !frontier.contains(&next) {
                        frontier.push(next);
                    }
                }
            }
        }

        if !prev.contains_key(&to) {
            return None;
        }
        let mut path = vec![to];
        let mut current = to;
        while let Some(&p) = prev.get(&current) {
            path.push(p);
            current = p;
        }
        path.reverse();
        Some(path)
    }
}
