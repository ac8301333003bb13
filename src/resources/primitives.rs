//! Procedural primitive meshes: cube, plane, UV sphere and cylinder.
//!
//! Each constructor builds a single-part mesh with positions, normals and
//! UVs, ready for a [`Model`](crate::scene::Model) or a triangle-mesh
//! bounding volume.

use glam::{Vec2, Vec3};

use crate::resources::material::Material;
use crate::resources::mesh::Mesh;

/// An axis-aligned cube of the given full extents, centered on the origin.
/// 24 vertices (four per face) so face normals stay hard.
#[must_use]
pub fn cube(width: f32, height: f32, depth: f32) -> Mesh {
    let w = width / 2.0;
    let h = height / 2.0;
    let d = depth / 2.0;

    // Four vertices per face: front, back, top, bottom, right, left.
    let positions = [
        [-w, -h, d],
        [w, -h, d],
        [w, h, d],
        [-w, h, d],
        [-w, -h, -d],
        [-w, h, -d],
        [w, h, -d],
        [w, -h, -d],
        [-w, h, -d],
        [-w, h, d],
        [w, h, d],
        [w, h, -d],
        [-w, -h, -d],
        [w, -h, -d],
        [w, -h, d],
        [-w, -h, d],
        [w, -h, -d],
        [w, h, -d],
        [w, h, d],
        [w, -h, d],
        [-w, -h, -d],
        [-w, -h, d],
        [-w, h, d],
        [-w, h, -d],
    ];
    let face_normals = [
        Vec3::Z,
        Vec3::NEG_Z,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::X,
        Vec3::NEG_X,
    ];

    let positions: Vec<Vec3> = positions.iter().map(|p| Vec3::from_array(*p)).collect();
    let normals: Vec<Vec3> = face_normals
        .iter()
        .flat_map(|&n| std::iter::repeat_n(n, 4))
        .collect();
    let uvs: Vec<Vec2> = (0..6)
        .flat_map(|_| {
            [
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 0.0),
            ]
        })
        .collect();

    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let mut mesh = Mesh::new("cube");
    mesh.add_vertices(&positions, Some(&normals), Some(&uvs));
    mesh.add_part(Material::default(), &indices);
    mesh
}

/// A flat quad in the XZ plane facing +Y, centered on the origin.
#[must_use]
pub fn plane(width: f32, depth: f32) -> Mesh {
    let w = width / 2.0;
    let d = depth / 2.0;
    let positions = [
        Vec3::new(-w, 0.0, -d),
        Vec3::new(-w, 0.0, d),
        Vec3::new(w, 0.0, d),
        Vec3::new(w, 0.0, -d),
    ];
    let normals = [Vec3::Y; 4];
    let uvs = [
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
    ];
    let mut mesh = Mesh::new("plane");
    mesh.add_vertices(&positions, Some(&normals), Some(&uvs));
    mesh.add_part(Material::default(), &[0, 1, 2, 0, 2, 3]);
    mesh
}

/// A vertical quad in the XY plane facing +Z, centered on the origin.
/// The usual geometry for billboards and text.
#[must_use]
pub fn quad(width: f32, height: f32) -> Mesh {
    let w = width / 2.0;
    let h = height / 2.0;
    let positions = [
        Vec3::new(-w, -h, 0.0),
        Vec3::new(w, -h, 0.0),
        Vec3::new(w, h, 0.0),
        Vec3::new(-w, h, 0.0),
    ];
    let normals = [Vec3::Z; 4];
    let uvs = [
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 0.0),
    ];
    let mut mesh = Mesh::new("quad");
    mesh.add_vertices(&positions, Some(&normals), Some(&uvs));
    mesh.add_part(Material::default(), &[0, 1, 2, 0, 2, 3]);
    mesh
}

/// A UV sphere with the given radius; `segments` around the equator and
/// `rings` from pole to pole (both clamped to sane minimums).
#[must_use]
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Mesh {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;
            let dir = Vec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            );
            positions.push(dir * radius);
            normals.push(dir);
            uvs.push(Vec2::new(u, v));
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }

    let mut mesh = Mesh::new("sphere");
    mesh.add_vertices(&positions, Some(&normals), Some(&uvs));
    mesh.add_part(Material::default(), &indices);
    mesh
}

/// An open-ended vertical cylinder centered on the origin.
#[must_use]
pub fn cylinder(radius: f32, height: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let half = height / 2.0;

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();

    for segment in 0..=segments {
        let u = segment as f32 / segments as f32;
        let theta = u * std::f32::consts::TAU;
        let dir = Vec3::new(theta.cos(), 0.0, theta.sin());
        for (y, v) in [(half, 0.0), (-half, 1.0)] {
            positions.push(dir * radius + Vec3::Y * y);
            normals.push(dir);
            uvs.push(Vec2::new(u, v));
        }
    }

    let mut indices = Vec::new();
    for segment in 0..segments {
        let a = segment * 2;
        indices.extend_from_slice(&[a, a + 2, a + 1, a + 1, a + 2, a + 3]);
    }

    let mut mesh = Mesh::new("cylinder");
    mesh.add_vertices(&positions, Some(&normals), Some(&uvs));
    mesh.add_part(Material::default(), &indices);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_twelve_triangles() {
        let mesh = cube(1.0, 1.0, 1.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.parts.len(), 1);
        let size = mesh.dimensions.size();
        assert!((size.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_normals_are_unit_radial() {
        let mesh = uv_sphere(2.0, 8, 4);
        for (p, n) in mesh
            .vertices
            .positions
            .iter()
            .zip(&mesh.vertices.normals)
        {
            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!((*p - *n * 2.0).length() < 1e-4);
        }
    }
}
