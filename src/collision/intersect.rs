//! Pairwise shape intersection tests.
//!
//! Every function computes contacts for shape `a` as the caller: the MTV
//! moves `a` out of `b`, and the normal points toward `a`. The symmetric
//! dispatch in [`intersect`] swaps arguments and inverts MTV and normal
//! where needed. Capsules reduce to an internal sphere placed at the
//! segment point closest to the other shape.

use glam::{Mat4, Vec3};
use smallvec::{smallvec, SmallVec};

use crate::collision::shapes::{
    closest_point_on_segment, closest_point_on_triangle, closest_points_on_segments,
    project_aabb_radius, project_triangle,
};
use crate::collision::{Intersection, WorldShape};
use crate::math::Dimensions;
use crate::resources::mesh::Mesh;

pub(crate) type Contacts = SmallVec<[Intersection; 4]>;

const EPSILON: f32 = 1e-6;

/// Tests `a` against `b`, returning contacts ordered deepest-first.
pub(crate) fn intersect(a: &WorldShape, b: &WorldShape) -> Option<Contacts> {
    use WorldShape::{Aabb, Capsule, Sphere, Triangles};
    match (a, b) {
        (Aabb(da), Aabb(db)) => aabb_aabb(*da, *db).map(single),
        (Sphere { center, radius }, Sphere { center: cb, radius: rb }) => {
            sphere_sphere(*center, *radius, *cb, *rb).map(single)
        }
        (Sphere { center, radius }, Aabb(db)) => sphere_aabb(*center, *radius, *db).map(single),
        (Aabb(da), Sphere { center, radius }) => {
            sphere_aabb(*center, *radius, *da).map(single).map(invert)
        }
        (Sphere { center, radius }, Triangles { mesh, world, inverse, .. }) => {
            sphere_triangles(*center, *radius, mesh, *world, *inverse)
        }
        (Triangles { mesh, world, inverse, .. }, Sphere { center, radius }) => {
            sphere_triangles(*center, *radius, mesh, *world, *inverse).map(invert)
        }
        (Aabb(da), Triangles { mesh, world, inverse, .. }) => {
            aabb_triangles(*da, mesh, *world, *inverse)
        }
        (Triangles { mesh, world, inverse, .. }, Aabb(db)) => {
            aabb_triangles(*db, mesh, *world, *inverse).map(invert)
        }
        (Capsule { a: ca, b: cb, radius }, other) => {
            let anchor = capsule_anchor(*ca, *cb, other);
            let sphere = Sphere {
                center: closest_point_on_segment(anchor, *ca, *cb),
                radius: *radius,
            };
            intersect(&sphere, other)
        }
        (other, Capsule { a: ca, b: cb, radius }) => {
            let anchor = capsule_anchor(*ca, *cb, other);
            let sphere = Sphere {
                center: closest_point_on_segment(anchor, *ca, *cb),
                radius: *radius,
            };
            intersect(other, &sphere)
        }
        (Triangles { .. }, Triangles { .. }) => triangles_triangles(a, b),
    }
}

fn single(i: Intersection) -> Contacts {
    smallvec![i]
}

fn invert(mut contacts: Contacts) -> Contacts {
    for c in &mut contacts {
        c.mtv = -c.mtv;
        c.normal = -c.normal;
    }
    contacts
}

/// Reference point used to place a capsule's internal test sphere.
fn capsule_anchor(a: Vec3, b: Vec3, other: &WorldShape) -> Vec3 {
    match other {
        WorldShape::Sphere { center, .. } => *center,
        WorldShape::Aabb(d) => {
            // One fixed-point refinement of segment-vs-box closest points.
            let s = closest_point_on_segment(d.center(), a, b);
            d.closest_point(s)
        }
        WorldShape::Capsule { a: oa, b: ob, .. } => {
            let (_, on_other) = closest_points_on_segments(a, b, *oa, *ob);
            on_other
        }
        WorldShape::Triangles { bounds, .. } => {
            let s = closest_point_on_segment(bounds.center(), a, b);
            bounds.closest_point(s)
        }
    }
}

/// Penetration of interval `[a_min, a_max]` into `[b_min, b_max]`.
///
/// Returns the smallest displacement of A along the axis that separates
/// the intervals, signed (+1 pushes A positive). Touching intervals do
/// not count as penetrating.
fn axis_penetration(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> Option<(f32, f32)> {
    let push_pos = b_max - a_min;
    let push_neg = a_max - b_min;
    if push_pos <= 0.0 || push_neg <= 0.0 {
        return None;
    }
    if push_pos < push_neg {
        Some((push_pos, 1.0))
    } else {
        Some((push_neg, -1.0))
    }
}

/// Axis-overlap test; the axis of smallest penetration becomes the MTV.
fn aabb_aabb(a: Dimensions, b: Dimensions) -> Option<Intersection> {
    let x = axis_penetration(a.min.x, a.max.x, b.min.x, b.max.x)?;
    let y = axis_penetration(a.min.y, a.max.y, b.min.y, b.max.y)?;
    let z = axis_penetration(a.min.z, a.max.z, b.min.z, b.max.z)?;

    let (axis, (depth, sign)) = if x.0 <= y.0 && x.0 <= z.0 {
        (Vec3::X, x)
    } else if y.0 <= z.0 {
        (Vec3::Y, y)
    } else {
        (Vec3::Z, z)
    };

    // Contact point: center of the overlap region.
    let overlap_box = Dimensions {
        min: a.min.max(b.min),
        max: a.max.min(b.max),
    };
    Some(Intersection {
        point: overlap_box.center(),
        mtv: axis * depth * sign,
        normal: axis * sign,
    })
}

fn sphere_sphere(ca: Vec3, ra: f32, cb: Vec3, rb: f32) -> Option<Intersection> {
    let delta = ca - cb;
    let dist = delta.length();
    let depth = ra + rb - dist;
    if depth <= 0.0 {
        return None;
    }
    let normal = if dist > EPSILON { delta / dist } else { Vec3::X };
    Some(Intersection {
        point: ca - normal * (ra - depth * 0.5),
        mtv: normal * depth,
        normal,
    })
}

/// Sphere as caller against a world-aligned box.
fn sphere_aabb(center: Vec3, radius: f32, b: Dimensions) -> Option<Intersection> {
    let nearest = b.closest_point(center);
    let delta = center - nearest;
    let dist = delta.length();
    if dist >= radius {
        return None;
    }

    if dist > EPSILON {
        let normal = delta / dist;
        return Some(Intersection {
            point: nearest,
            mtv: normal * (radius - dist),
            normal,
        });
    }

    // Center inside the box: push out through the nearest face.
    let to_max = b.max - center;
    let to_min = center - b.min;
    let candidates = [
        (Vec3::X, to_max.x),
        (Vec3::NEG_X, to_min.x),
        (Vec3::Y, to_max.y),
        (Vec3::NEG_Y, to_min.y),
        (Vec3::Z, to_max.z),
        (Vec3::NEG_Z, to_min.z),
    ];
    let (axis, face_dist) = candidates
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .expect("six candidates");
    Some(Intersection {
        point: center + axis * face_dist,
        mtv: axis * (face_dist + radius),
        normal: axis,
    })
}

/// Sphere as caller against a triangle mesh.
///
/// The sphere is transformed into mesh-local space (uniform scale assumed),
/// candidate triangles come from the mesh broadphase, and every penetrating
/// triangle contributes a contact; the deepest comes first.
fn sphere_triangles(
    center: Vec3,
    radius: f32,
    mesh: &Mesh,
    world: Mat4,
    inverse: Mat4,
) -> Option<Contacts> {
    let local_center = inverse.transform_point3(center);
    let (_, _, scale) = crate::math::decompose(world);
    let max_scale = scale.x.max(scale.y).max(scale.z).max(EPSILON);
    let local_radius = radius / max_scale;

    let query = Dimensions::from_center_size(local_center, Vec3::splat(local_radius * 2.0));
    let mut contacts = Contacts::new();
    for_candidates(mesh, query, |tri_index| {
        let tri = &mesh.triangles[tri_index];
        let a = mesh.vertices.positions[tri.indices[0] as usize];
        let b = mesh.vertices.positions[tri.indices[1] as usize];
        let c = mesh.vertices.positions[tri.indices[2] as usize];
        let closest = closest_point_on_triangle(local_center, a, b, c);
        let delta = local_center - closest;
        let dist = delta.length();
        let depth = local_radius - dist;
        if depth <= 0.0 {
            return;
        }
        let local_normal = if dist > EPSILON {
            delta / dist
        } else {
            tri.normal
        };
        let world_normal = world.transform_vector3(local_normal).normalize_or_zero();
        contacts.push(Intersection {
            point: world.transform_point3(closest),
            mtv: world_normal * depth * max_scale,
            normal: world_normal,
        });
    });

    finish_contacts(contacts)
}

/// World-aligned box as caller against a triangle mesh: 13-axis SAT per
/// candidate triangle (3 box face normals, 9 edge cross products, 1
/// triangle normal), run in world space.
fn aabb_triangles(
    box_world: Dimensions,
    mesh: &Mesh,
    world: Mat4,
    inverse: Mat4,
) -> Option<Contacts> {
    let box_center = box_world.center();
    let half = box_world.size() * 0.5;
    let query = box_world.transformed(inverse);

    let mut contacts = Contacts::new();
    for_candidates(mesh, query, |tri_index| {
        let tri = &mesh.triangles[tri_index];
        let verts = [
            world.transform_point3(mesh.vertices.positions[tri.indices[0] as usize]),
            world.transform_point3(mesh.vertices.positions[tri.indices[1] as usize]),
            world.transform_point3(mesh.vertices.positions[tri.indices[2] as usize]),
        ];
        let edges = [
            verts[1] - verts[0],
            verts[2] - verts[1],
            verts[0] - verts[2],
        ];
        let tri_normal = edges[0].cross(verts[2] - verts[0]);

        let mut axes: SmallVec<[Vec3; 13]> = smallvec![Vec3::X, Vec3::Y, Vec3::Z];
        if tri_normal.length_squared() > EPSILON {
            axes.push(tri_normal.normalize());
        }
        for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for edge in edges {
                let cross = box_axis.cross(edge);
                if cross.length_squared() > EPSILON {
                    axes.push(cross.normalize());
                }
            }
        }

        let mut min_depth = f32::MAX;
        let mut min_axis = Vec3::X;
        for axis in axes {
            let r = project_aabb_radius(axis, half);
            let (t_min, t_max) = project_triangle(axis, box_center, &verts);
            let Some((depth, sign)) = axis_penetration(-r, r, t_min, t_max) else {
                return; // Separating axis found.
            };
            if depth < min_depth {
                min_depth = depth;
                min_axis = axis * sign;
            }
        }

        contacts.push(Intersection {
            point: closest_point_on_triangle(box_center, verts[0], verts[1], verts[2]),
            mtv: min_axis * min_depth,
            normal: min_axis,
        });
    });

    finish_contacts(contacts)
}

/// Triangle mesh against triangle mesh: SAT over both face normals and the
/// nine edge cross products for every candidate triangle pair.
fn triangles_triangles(a: &WorldShape, b: &WorldShape) -> Option<Contacts> {
    let (WorldShape::Triangles { mesh: mesh_a, world: world_a, .. },
         WorldShape::Triangles { mesh: mesh_b, world: world_b, inverse: inv_b, .. }) = (a, b)
    else {
        return None;
    };

    let mut contacts = Contacts::new();
    for tri_a in &mesh_a.triangles {
        let va = [
            world_a.transform_point3(mesh_a.vertices.positions[tri_a.indices[0] as usize]),
            world_a.transform_point3(mesh_a.vertices.positions[tri_a.indices[1] as usize]),
            world_a.transform_point3(mesh_a.vertices.positions[tri_a.indices[2] as usize]),
        ];

        let mut tri_bounds = Dimensions::empty();
        for v in &va {
            tri_bounds.expand_to(inv_b.transform_point3(*v));
        }

        for_candidates(mesh_b, tri_bounds, |tri_index| {
            let tri_b = &mesh_b.triangles[tri_index];
            let vb = [
                world_b.transform_point3(mesh_b.vertices.positions[tri_b.indices[0] as usize]),
                world_b.transform_point3(mesh_b.vertices.positions[tri_b.indices[1] as usize]),
                world_b.transform_point3(mesh_b.vertices.positions[tri_b.indices[2] as usize]),
            ];
            if let Some(contact) = triangle_pair_sat(&va, &vb) {
                contacts.push(contact);
            }
        });
    }

    finish_contacts(contacts)
}

/// SAT between two world-space triangles. The MTV moves the first triangle
/// out of the second.
fn triangle_pair_sat(va: &[Vec3; 3], vb: &[Vec3; 3]) -> Option<Intersection> {
    let edges_a = [va[1] - va[0], va[2] - va[1], va[0] - va[2]];
    let edges_b = [vb[1] - vb[0], vb[2] - vb[1], vb[0] - vb[2]];

    let mut axes: SmallVec<[Vec3; 11]> = SmallVec::new();
    let na = edges_a[0].cross(va[2] - va[0]);
    if na.length_squared() > EPSILON {
        axes.push(na.normalize());
    }
    let nb = edges_b[0].cross(vb[2] - vb[0]);
    if nb.length_squared() > EPSILON {
        axes.push(nb.normalize());
    }
    for ea in edges_a {
        for eb in edges_b {
            let cross = ea.cross(eb);
            if cross.length_squared() > EPSILON {
                axes.push(cross.normalize());
            }
        }
    }
    if axes.is_empty() {
        return None;
    }

    let origin = (va[0] + va[1] + va[2]) / 3.0;
    let mut min_depth = f32::MAX;
    let mut min_axis = Vec3::X;
    for axis in axes {
        let (a_min, a_max) = project_triangle(axis, origin, va);
        let (b_min, b_max) = project_triangle(axis, origin, vb);
        let (depth, sign) = axis_penetration(a_min, a_max, b_min, b_max)?;
        if depth < min_depth {
            min_depth = depth;
            min_axis = axis * sign;
        }
    }

    let centroid_b = (vb[0] + vb[1] + vb[2]) / 3.0;
    Some(Intersection {
        point: (origin + centroid_b) * 0.5,
        mtv: min_axis * min_depth,
        normal: min_axis,
    })
}

/// Runs `f` for each broadphase candidate, or for every triangle when the
/// mesh has no grid.
fn for_candidates(mesh: &Mesh, query: Dimensions, mut f: impl FnMut(usize)) {
    if let Some(bp) = mesh.broadphase() {
        let mut candidates = Vec::new();
        bp.candidates(query, &mut candidates);
        for i in candidates {
            f(i as usize);
        }
    } else {
        for i in 0..mesh.triangles.len() {
            f(i);
        }
    }
}

fn finish_contacts(mut contacts: Contacts) -> Option<Contacts> {
    if contacts.is_empty() {
        return None;
    }
    contacts.sort_by(|a, b| b.mtv.length_squared().total_cmp(&a.mtv.length_squared()));
    Some(contacts)
}

// ============================================================================
// Point queries
// ============================================================================

/// Closest point on (or inside) a shape to `p`.
pub(crate) fn closest_point(shape: &WorldShape, p: Vec3) -> Vec3 {
    match shape {
        WorldShape::Aabb(d) => d.closest_point(p),
        WorldShape::Sphere { center, radius } => {
            let delta = p - *center;
            let dist = delta.length();
            if dist <= *radius {
                p
            } else {
                *center + delta / dist * *radius
            }
        }
        WorldShape::Capsule { a, b, radius } => {
            let on_segment = closest_point_on_segment(p, *a, *b);
            let delta = p - on_segment;
            let dist = delta.length();
            if dist <= *radius {
                p
            } else {
                on_segment + delta / dist * *radius
            }
        }
        WorldShape::Triangles {
            mesh,
            world,
            inverse,
            ..
        } => {
            let local = inverse.transform_point3(p);
            let query = Dimensions::from_center_size(
                local,
                Vec3::splat(mesh.dimensions.max_span() * 0.25 + EPSILON),
            );
            let mut best = None;
            let mut best_dist = f32::MAX;
            {
                let mut consider = |tri_index: usize| {
                    let tri = &mesh.triangles[tri_index];
                    let a = mesh.vertices.positions[tri.indices[0] as usize];
                    let b = mesh.vertices.positions[tri.indices[1] as usize];
                    let c = mesh.vertices.positions[tri.indices[2] as usize];
                    let cp = closest_point_on_triangle(local, a, b, c);
                    let d = cp.distance_squared(local);
                    if d < best_dist {
                        best_dist = d;
                        best = Some(cp);
                    }
                };
                for_candidates(mesh, query, &mut consider);
            }
            if best.is_none() {
                // Query box missed every cell; widen to the whole mesh.
                let mut consider = |tri_index: usize| {
                    let tri = &mesh.triangles[tri_index];
                    let a = mesh.vertices.positions[tri.indices[0] as usize];
                    let b = mesh.vertices.positions[tri.indices[1] as usize];
                    let c = mesh.vertices.positions[tri.indices[2] as usize];
                    let cp = closest_point_on_triangle(local, a, b, c);
                    let d = cp.distance_squared(local);
                    if d < best_dist {
                        best_dist = d;
                        best = Some(cp);
                    }
                };
                for i in 0..mesh.triangles.len() {
                    consider(i);
                }
            }
            best.map_or(p, |cp| world.transform_point3(cp))
        }
    }
}

/// Whether `p` lies inside the shape. Triangle meshes use their world
/// bounds.
pub(crate) fn point_inside(shape: &WorldShape, p: Vec3) -> bool {
    match shape {
        WorldShape::Aabb(d) => d.contains_point(p),
        WorldShape::Sphere { center, radius } => p.distance_squared(*center) <= radius * radius,
        WorldShape::Capsule { a, b, radius } => {
            closest_point_on_segment(p, *a, *b).distance_squared(p) <= radius * radius
        }
        WorldShape::Triangles { bounds, .. } => bounds.contains_point(p),
    }
}
