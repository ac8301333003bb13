use glam::Vec3;

use crate::scene::{NodeHandle, Scene};

/// A waypoint chain.
///
/// The path's child nodes, in child order, are its waypoints; the `Path`
/// payload only records whether the chain loops back to the start.
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub closed: bool,
}

impl Path {
    #[must_use]
    pub fn new(closed: bool) -> Self {
        Self { closed }
    }
}

impl Scene {
    /// World-space waypoints of a path node, in child order. A closed path
    /// repeats its first point at the end.
    pub fn path_points(&mut self, path: NodeHandle) -> Vec<Vec3> {
        let Some(node) = self.get(path) else {
            return Vec::new();
        };
        let closed = match node.kind {
            crate::scene::NodeKind::Path(ref p) => p.closed,
            _ => return Vec::new(),
        };
        let children: Vec<NodeHandle> = node.children.clone();
        let mut points: Vec<Vec3> = children
            .into_iter()
            .map(|c| self.world_position(c))
            .collect();
        if closed && points.len() > 1 {
            points.push(points[0]);
        }
        points
    }

    /// Total world-space length of a path node.
    pub fn path_length(&mut self, path: NodeHandle) -> f32 {
        let points = self.path_points(path);
        points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Position along a path at `percentage` in `[0, 1]` of its length.
    ///
    /// Returns `None` for paths with fewer than two waypoints.
    pub fn path_position_at(&mut self, path: NodeHandle, percentage: f32) -> Option<Vec3> {
        let points = self.path_points(path);
        if points.len() < 2 {
            return points.first().copied();
        }
        let total: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
        if total <= 0.0 {
            return Some(points[0]);
        }
        let mut remaining = percentage.clamp(0.0, 1.0) * total;
        for w in points.windows(2) {
            let seg = w[0].distance(w[1]);
            if remaining <= seg {
                let t = if seg > 0.0 { remaining / seg } else { 0.0 };
                return Some(w[0].lerp(w[1], t));
            }
            remaining -= seg;
        }
        points.last().copied()
    }
}
