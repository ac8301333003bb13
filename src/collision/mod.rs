//! Bounding volumes and collision detection.
//!
//! Bounding volumes are scene nodes ([`NodeKind::Bounding`]); queries read
//! the same world-transform cache as rendering. The pairwise operation
//! matrix is symmetric: every shape pair is implemented, with swapped pairs
//! returning inverted MTVs and normals.
//!
//! [`NodeKind::Bounding`]: crate::scene::NodeKind::Bounding

pub mod broadphase;
pub mod intersect;
pub mod query;
pub mod shapes;

pub use query::CollisionTestSettings;

use std::sync::Arc;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::math::{safe_inverse, Dimensions};
use crate::resources::mesh::Mesh;
use crate::scene::{NodeHandle, Scene};

/// One contact between two bounding volumes.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    /// World-space contact point.
    pub point: Vec3,
    /// Minimum translation vector: applied to the calling volume's
    /// position, it separates the volumes.
    pub mtv: Vec3,
    /// Unit contact normal, pointing toward the calling volume.
    pub normal: Vec3,
}

/// The result of a successful collision query.
#[derive(Debug, Clone)]
pub struct Collision {
    /// The struck bounding node.
    pub object: NodeHandle,
    /// Contacts ordered deepest-first.
    pub intersections: SmallVec<[Intersection; 4]>,
}

impl Collision {
    /// Average of the contact MTVs.
    #[must_use]
    pub fn average_mtv(&self) -> Vec3 {
        if self.intersections.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = self.intersections.iter().map(|i| i.mtv).sum();
        sum / self.intersections.len() as f32
    }

    /// Average of the contact normals, normalized.
    #[must_use]
    pub fn average_normal(&self) -> Vec3 {
        let sum: Vec3 = self.intersections.iter().map(|i| i.normal).sum();
        sum.normalize_or_zero()
    }

    /// The deepest contact's MTV.
    #[must_use]
    pub fn mtv(&self) -> Vec3 {
        self.intersections
            .first()
            .map_or(Vec3::ZERO, |i| i.mtv)
    }
}

/// Shape payload of a bounding node, in local space.
#[derive(Debug, Clone)]
pub enum BoundingShape {
    /// Box of the given full extents centered on the node. Node rotation is
    /// honored by enclosing the rotated box in a world-aligned one.
    Aabb { size: Vec3 },
    Sphere { radius: f32 },
    /// Capsule along the node's local +Y axis; `height` is tip to tip.
    Capsule { radius: f32, height: f32 },
    /// Triangle mesh with optional broadphase grid (see
    /// [`Mesh::build_broadphase`]).
    Triangles { mesh: Arc<Mesh> },
}

/// A bounding-volume component carried by a scene node.
#[derive(Debug, Clone)]
pub struct Bounding {
    pub shape: BoundingShape,
}

impl Bounding {
    #[must_use]
    pub fn aabb(width: f32, height: f32, depth: f32) -> Self {
        Self {
            shape: BoundingShape::Aabb {
                size: Vec3::new(width.abs(), height.abs(), depth.abs()),
            },
        }
    }

    #[must_use]
    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: BoundingShape::Sphere {
                radius: radius.abs(),
            },
        }
    }

    #[must_use]
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            shape: BoundingShape::Capsule {
                radius: radius.abs(),
                height: height.abs().max(radius.abs() * 2.0),
            },
        }
    }

    #[must_use]
    pub fn triangles(mesh: Arc<Mesh>) -> Self {
        Self {
            shape: BoundingShape::Triangles { mesh },
        }
    }
}

/// A bounding shape resolved into world space, ready for pairwise tests.
#[derive(Debug, Clone)]
pub(crate) enum WorldShape {
    Aabb(Dimensions),
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Capsule {
        a: Vec3,
        b: Vec3,
        radius: f32,
    },
    Triangles {
        mesh: Arc<Mesh>,
        world: Mat4,
        inverse: Mat4,
        bounds: Dimensions,
    },
}

impl WorldShape {
    /// World-space center used for distance ordering and capsule
    /// reduction.
    pub(crate) fn center(&self) -> Vec3 {
        match self {
            WorldShape::Aabb(d) => d.center(),
            WorldShape::Sphere { center, .. } => *center,
            WorldShape::Capsule { a, b, .. } => (*a + *b) * 0.5,
            WorldShape::Triangles { bounds, .. } => bounds.center(),
        }
    }
}

/// Resolves a bounding node's shape into world space through its cached
/// world transform. Returns `None` for dead handles and non-bounding nodes.
pub(crate) fn resolve_shape(scene: &mut Scene, handle: NodeHandle) -> Option<WorldShape> {
    let shape = scene.get(handle)?.bounding()?.shape.clone();
    let world = scene.world_matrix(handle);
    let (_, _, scale) = crate::math::decompose(world);
    let max_scale = scale.x.max(scale.y).max(scale.z);

    Some(match shape {
        BoundingShape::Aabb { size } => {
            let local = Dimensions::from_center_size(Vec3::ZERO, size);
            WorldShape::Aabb(local.transformed(world))
        }
        BoundingShape::Sphere { radius } => WorldShape::Sphere {
            center: world.w_axis.truncate(),
            radius: radius * max_scale,
        },
        BoundingShape::Capsule { radius, height } => {
            let half = (height * 0.5 - radius).max(0.0);
            WorldShape::Capsule {
                a: world.transform_point3(Vec3::new(0.0, half, 0.0)),
                b: world.transform_point3(Vec3::new(0.0, -half, 0.0)),
                radius: radius * max_scale,
            }
        }
        BoundingShape::Triangles { mesh } => {
            let bounds = mesh.dimensions.transformed(world);
            WorldShape::Triangles {
                inverse: safe_inverse(world),
                world,
                mesh,
                bounds,
            }
        }
    })
}
