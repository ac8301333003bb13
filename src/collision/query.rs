//! Scene-level collision queries.

use glam::Vec3;
use smallvec::SmallVec;

use crate::collision::{intersect, resolve_shape, Collision};
use crate::scene::{Node, NodeHandle, NodeKind, Scene};

/// Settings for a [`Scene::collision_test`] sweep.
///
/// `test_against` lists the tree roots whose bounding-volume descendants
/// are candidates; the optional `filter` drops candidates before any
/// shape math runs.
#[derive(Default)]
pub struct CollisionTestSettings<'a> {
    pub test_against: &'a [NodeHandle],
    #[allow(clippy::type_complexity)]
    pub filter: Option<Box<dyn Fn(&Node) -> bool + 'a>>,
}

impl<'a> CollisionTestSettings<'a> {
    #[must_use]
    pub fn new(test_against: &'a [NodeHandle]) -> Self {
        Self {
            test_against,
            filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Fn(&Node) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl Scene {
    /// Whether two bounding nodes intersect.
    pub fn colliding(&mut self, a: NodeHandle, b: NodeHandle) -> bool {
        self.collision(a, b).is_some()
    }

    /// Full contact information for `a` against `b`, or `None` when the
    /// volumes are separate (or either handle is not a bounding node).
    ///
    /// The returned MTVs move `a` out of `b`; swapping the arguments
    /// inverts MTVs and normals.
    pub fn collision(&mut self, a: NodeHandle, b: NodeHandle) -> Option<Collision> {
        if a == b {
            return None;
        }
        let shape_a = resolve_shape(self, a)?;
        let shape_b = resolve_shape(self, b)?;
        let intersections = intersect::intersect(&shape_a, &shape_b)?;
        Some(Collision {
            object: b,
            intersections,
        })
    }

    /// Closest point on (or inside) a bounding node's volume to a
    /// world-space point.
    pub fn closest_point(&mut self, object: NodeHandle, point: Vec3) -> Option<Vec3> {
        let shape = resolve_shape(self, object)?;
        Some(intersect::closest_point(&shape, point))
    }

    /// Whether a world-space point lies inside a bounding node's volume.
    pub fn point_inside(&mut self, object: NodeHandle, point: Vec3) -> bool {
        resolve_shape(self, object)
            .is_some_and(|shape| intersect::point_inside(&shape, point))
    }

    /// Tests `object` against every bounding-volume descendant of the
    /// settings' trees, returning all collisions ordered nearest-first
    /// (by distance between volume centers).
    pub fn collision_test(
        &mut self,
        object: NodeHandle,
        settings: &CollisionTestSettings<'_>,
    ) -> Vec<Collision> {
        let mut results = Vec::new();
        self.collision_test_each(object, settings, |collision| {
            results.push(collision.clone());
            true
        });

        let Some(shape) = resolve_shape(self, object) else {
            return results;
        };
        let center = shape.center();
        let mut keyed: Vec<(f32, Collision)> = results
            .into_iter()
            .map(|c| {
                let other_center = resolve_shape(self, c.object)
                    .map_or(center, |s| s.center());
                (center.distance_squared(other_center), c)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, c)| c).collect()
    }

    /// The nearest collision from [`collision_test`](Self::collision_test),
    /// if any.
    pub fn collision_test_first(
        &mut self,
        object: NodeHandle,
        settings: &CollisionTestSettings<'_>,
    ) -> Option<Collision> {
        self.collision_test(object, settings).into_iter().next()
    }

    /// Streams collisions to `callback` in traversal order until it
    /// returns false.
    pub fn collision_test_each(
        &mut self,
        object: NodeHandle,
        settings: &CollisionTestSettings<'_>,
        mut callback: impl FnMut(&Collision) -> bool,
    ) {
        let Some(shape) = resolve_shape(self, object) else {
            return;
        };

        // Collect candidates first so shape resolution (which refreshes
        // transform caches) does not fight the traversal borrow.
        let mut candidates: SmallVec<[NodeHandle; 16]> = SmallVec::new();
        for &root in settings.test_against {
            let mut stack = vec![root];
            while let Some(handle) = stack.pop() {
                let Some(node) = self.get(handle) else {
                    continue;
                };
                stack.extend(node.children.iter().copied());
                if handle == object {
                    continue;
                }
                if !matches!(node.kind, NodeKind::Bounding(_)) {
                    continue;
                }
                if let Some(filter) = &settings.filter {
                    if !filter(node) {
                        continue;
                    }
                }
                candidates.push(handle);
            }
        }

        for candidate in candidates {
            let Some(other) = resolve_shape(self, candidate) else {
                continue;
            };
            if let Some(intersections) = intersect::intersect(&shape, &other) {
                let collision = Collision {
                    object: candidate,
                    intersections,
                };
                if !callback(&collision) {
                    return;
                }
            }
        }
    }
}
