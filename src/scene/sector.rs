use glam::Vec3;

use crate::math::Dimensions;
use crate::scene::{NodeHandle, NodeKind, Scene};

/// How sector neighbors are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorDetection {
    /// Sectors are neighbors when their world AABBs overlap.
    #[default]
    Overlap,
    /// Sectors are neighbors when they share at least one vertex position.
    SharedVertices,
}

/// A world-space region used to partition levels for culling.
///
/// The local `dimensions` box is carried into world space by the node's
/// transform. `vertices` (local space) feed shared-vertex neighbor
/// detection; when empty, the box corners are used.
#[derive(Debug, Clone)]
pub struct Sector {
    pub dimensions: Dimensions,
    pub vertices: Vec<Vec3>,
    pub(crate) neighbors: Vec<NodeHandle>,
}

impl Sector {
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            vertices: Vec::new(),
            neighbors: Vec::new(),
        }
    }

    /// Neighbors discovered by the last
    /// [`Scene::update_sector_neighbors`] pass.
    #[must_use]
    pub fn neighbors(&self) -> &[NodeHandle] {
        &self.neighbors
    }

    fn detection_vertices(&self) -> Vec<Vec3> {
        if !self.vertices.is_empty() {
            return self.vertices.clone();
        }
        let d = self.dimensions;
        (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { d.min.x } else { d.max.x },
                    if i & 2 == 0 { d.min.y } else { d.max.y },
                    if i & 4 == 0 { d.min.z } else { d.max.z },
                )
            })
            .collect()
    }
}

const SHARED_VERTEX_EPSILON: f32 = 1e-4;

impl Scene {
    /// All sector nodes in the scene.
    #[must_use]
    pub fn sectors(&self) -> Vec<NodeHandle> {
        self.nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Sector(_)))
            .map(|(h, _)| h)
            .collect()
    }

    /// World-space bounds of a sector node.
    pub fn sector_bounds(&mut self, sector: NodeHandle) -> Option<Dimensions> {
        let dims = self.get(sector)?.sector()?.dimensions;
        let world = self.world_matrix(sector);
        Some(dims.transformed(world))
    }

    /// Recomputes every sector's neighbor list with the given detection
    /// mode.
    pub fn update_sector_neighbors(&mut self, detection: SectorDetection) {
        let sectors = self.sectors();

        let mut bounds = Vec::with_capacity(sectors.len());
        let mut vertices = Vec::with_capacity(sectors.len());
        for &h in &sectors {
            let world = self.world_matrix(h);
            let sector = self
                .get(h)
                .and_then(crate::scene::Node::sector)
                .expect("sector handle collected above");
            bounds.push(sector.dimensions.transformed(world));
            let verts: Vec<Vec3> = sector
                .detection_vertices()
                .into_iter()
                .map(|v| world.transform_point3(v))
                .collect();
            vertices.push(verts);
        }

        for (i, &h) in sectors.iter().enumerate() {
            let mut neighbors = Vec::new();
            for (j, &other) in sectors.iter().enumerate() {
                if i == j {
                    continue;
                }
                let adjacent = match detection {
                    SectorDetection::Overlap => bounds[i].overlaps(&bounds[j]),
                    SectorDetection::SharedVertices => vertices[i].iter().any(|a| {
                        vertices[j]
                            .iter()
                            .any(|b| a.distance_squared(*b) < SHARED_VERTEX_EPSILON)
                    }),
                };
                if adjacent {
                    neighbors.push(other);
                }
            }
            if let Some(sector) = self.get_mut(h).and_then(crate::scene::Node::sector_mut) {
                sector.neighbors = neighbors;
            }
        }
    }

    /// The sector whose world bounds contain `position`, if any.
    pub fn sector_containing(&mut self, position: Vec3) -> Option<NodeHandle> {
        let sectors = self.sectors();
        sectors.into_iter().find(|&h| {
            self.sector_bounds(h)
                .is_some_and(|b| b.contains_point(position))
        })
    }

    /// Sector handles reachable from `start` within `depth` neighbor hops,
    /// including `start` itself.
    #[must_use]
    pub fn sector_neighborhood(&self, start: NodeHandle, depth: usize) -> Vec<NodeHandle> {
        let mut reached = vec![start];
        let mut frontier = vec![start];
        for _ in 0..depth {
            let mut next = Vec::new();
            for &h in &frontier {
                let Some(sector) = self.get(h).and_then(crate::scene::Node::sector) else {
                    continue;
                };
                for &n in &sector.neighbors {
                    if !reached.contains(&n) {
                        reached.push(n);
                        next.push(n);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        reached
    }
}
