use glam::Vec3;

use crate::collision::shapes::closest_point_on_triangle;
use crate::math::Dimensions;
use crate::resources::mesh::Mesh;

/// Uniform-grid broadphase over a triangle mesh, in mesh-local space.
///
/// The mesh bounds are split into `cells_per_axis`³ cells; each cell
/// precomputes the triangles whose closest point to the cell center lies
/// inside the cell expanded by a margin. Queries union the triangle sets of
/// every cell the query bounds overlap. One cell or fewer degenerates to
/// "all triangles".
///
/// State is read-only after construction; rebuild with
/// [`Mesh::build_broadphase`] after editing geometry.
#[derive(Debug, Clone)]
pub struct Broadphase {
    bounds: Dimensions,
    cells_per_axis: usize,
    cell_size: Vec3,
    cells: Vec<Vec<u32>>,
    triangle_count: usize,
}

impl Broadphase {
    #[must_use]
    pub fn new(mesh: &Mesh, cells_per_axis: usize) -> Self {
        let bounds = mesh.dimensions;
        let n = cells_per_axis.max(1);
        let cell_size = bounds.size() / n as f32;

        let mut cells = vec![Vec::new(); n * n * n];
        if n > 1 {
            // A cell owns the triangles whose closest point to its center
            // falls inside the cell grown by half a cell on each side.
            let margin = cell_size * 0.5;
            for (ti, tri) in mesh.triangles.iter().enumerate() {
                let a = mesh.vertices.positions[tri.indices[0] as usize];
                let b = mesh.vertices.positions[tri.indices[1] as usize];
                let c = mesh.vertices.positions[tri.indices[2] as usize];
                for (ci, cell) in cells.iter_mut().enumerate() {
                    let center = Self::cell_center(bounds, cell_size, n, ci);
                    let cell_bounds = Dimensions {
                        min: center - cell_size * 0.5 - margin,
                        max: center + cell_size * 0.5 + margin,
                    };
                    let closest = closest_point_on_triangle(center, a, b, c);
                    if cell_bounds.contains_point(closest) {
                        cell.push(ti as u32);
                    }
                }
            }
        }

        Self {
            bounds,
            cells_per_axis: n,
            cell_size,
            cells,
            triangle_count: mesh.triangles.len(),
        }
    }

    fn cell_center(bounds: Dimensions, cell_size: Vec3, n: usize, index: usize) -> Vec3 {
        let x = index % n;
        let y = (index / n) % n;
        let z = index / (n * n);
        bounds.min
            + Vec3::new(
                (x as f32 + 0.5) * cell_size.x,
                (y as f32 + 0.5) * cell_size.y,
                (z as f32 + 0.5) * cell_size.z,
            )
    }

    #[must_use]
    pub fn cells_per_axis(&self) -> usize {
        self.cells_per_axis
    }

    /// Collects candidate triangle indices for a mesh-local query box into
    /// `out`, sorted and deduplicated.
    pub fn candidates(&self, query: Dimensions, out: &mut Vec<u32>) {
        out.clear();
        if self.cells_per_axis <= 1 {
            out.extend(0..self.triangle_count as u32);
            return;
        }

        let n = self.cells_per_axis;
        let to_cell = |v: f32, min: f32, size: f32| -> usize {
            if size <= 0.0 {
                return 0;
            }
            (((v - min) / size).floor() as isize).clamp(0, n as isize - 1) as usize
        };
        let lo = [
            to_cell(query.min.x, self.bounds.min.x, self.cell_size.x),
            to_cell(query.min.y, self.bounds.min.y, self.cell_size.y),
            to_cell(query.min.z, self.bounds.min.z, self.cell_size.z),
        ];
        let hi = [
            to_cell(query.max.x, self.bounds.min.x, self.cell_size.x),
            to_cell(query.max.y, self.bounds.min.y, self.cell_size.y),
            to_cell(query.max.z, self.bounds.min.z, self.cell_size.z),
        ];

        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    let index = z * n * n + y * n + x;
                    out.extend_from_slice(&self.cells[index]);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::primitives;

    #[test]
    fn single_cell_grid_returns_all_triangles() {
        let mut mesh = primitives::cube(2.0, 2.0, 2.0);
        mesh.build_broadphase(1);
        let bp = mesh.broadphase().unwrap();
        let mut out = Vec::new();
        bp.candidates(
            Dimensions::from_center_size(Vec3::splat(100.0), Vec3::ONE),
            &mut out,
        );
        assert_eq!(out.len(), mesh.triangle_count());
    }

    #[test]
    fn grid_query_narrows_candidates() {
        let mut mesh = primitives::uv_sphere(2.0, 16, 8);
        mesh.build_broadphase(4);
        let bp = mesh.broadphase().unwrap();

        let mut near_surface = Vec::new();
        bp.candidates(
            Dimensions::from_center_size(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(0.5)),
            &mut near_surface,
        );
        assert!(!near_surface.is_empty());
        assert!(near_surface.len() < mesh.triangle_count());
    }

    #[test]
    fn grid_cells_cover_every_triangle() {
        let mut mesh = primitives::cube(2.0, 2.0, 2.0);
        mesh.build_broadphase(3);
        let bp = mesh.broadphase().unwrap();
        let mut out = Vec::new();
        bp.candidates(mesh.dimensions, &mut out);
        assert_eq!(out.len(), mesh.triangle_count());
    }
}
