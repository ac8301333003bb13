use bitflags::bitflags;
use glam::{Vec2, Vec3};

use crate::collision::broadphase::Broadphase;
use crate::math::{Color, Dimensions};
use crate::resources::material::Material;

/// Maximum bone influences per vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Maximum vertex color channels per mesh.
pub const MAX_COLOR_CHANNELS: usize = 4;

bitflags! {
    /// Which vertex attributes a mesh carries.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct VertexAttributes: u32 {
        const POSITIONS = 1 << 0;
        const NORMALS   = 1 << 1;
        const UVS       = 1 << 2;
        const COLORS    = 1 << 3;
        const JOINTS    = 1 << 4;
        const WEIGHTS   = 1 << 5;
    }
}

/// Per-vertex attribute buffers.
///
/// All populated buffers have the same length as `positions`; `normals`
/// and `uvs` are zero-filled when absent from the source data so the
/// renderer can index unconditionally.
#[derive(Debug, Clone, Default)]
pub struct VertexData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    /// Up to [`MAX_COLOR_CHANNELS`] channels, each one color per vertex.
    pub colors: Vec<Vec<Color>>,
    pub joints: Vec<[u16; MAX_BONE_INFLUENCES]>,
    pub weights: Vec<[f32; MAX_BONE_INFLUENCES]>,
}

impl VertexData {
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn has_skin_data(&self) -> bool {
        self.joints.len() == self.positions.len() && self.weights.len() == self.positions.len()
    }
}

/// A precomputed triangle record.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// Indices into the mesh vertex buffers.
    pub indices: [u32; 3],
    /// Face normal in mesh-local space.
    pub normal: Vec3,
    /// Centroid in mesh-local space.
    pub center: Vec3,
    /// Longest edge length; used as a broadphase margin.
    pub max_span: f32,
    /// Index of the owning mesh part.
    pub part: usize,
}

/// A contiguous triangle range sharing one material.
#[derive(Debug, Clone)]
pub struct MeshPart {
    /// First triangle index, inclusive.
    pub triangle_start: usize,
    /// One past the last triangle index.
    pub triangle_end: usize,
    pub material: Material,
}

impl MeshPart {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangle_end - self.triangle_start
    }
}

/// Geometry shared by models and triangle-mesh bounding volumes.
///
/// Triangles are grouped into parts by material; [`Dimensions`] caches the
/// local-space bounds. Scratch state used during rendering lives in the
/// renderer, not here, so shared meshes stay immutable per frame.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub(crate) id: u32,
    pub vertices: VertexData,
    pub triangles: Vec<Triangle>,
    pub parts: Vec<MeshPart>,
    pub dimensions: Dimensions,
    pub(crate) broadphase: Option<Broadphase>,
    /// Cloning a model whose mesh is `unique` deep-copies the mesh instead
    /// of sharing it.
    pub unique: bool,
    pub attributes: VertexAttributes,
}

impl Mesh {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: 0,
            vertices: VertexData::default(),
            triangles: Vec::new(),
            parts: Vec::new(),
            dimensions: Dimensions::default(),
            broadphase: None,
            unique: false,
            attributes: VertexAttributes::default(),
        }
    }

    /// Library-stable id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Appends vertices, zero-filling normals/uvs when not supplied, and
    /// returns the index of the first new vertex.
    pub fn add_vertices(
        &mut self,
        positions: &[Vec3],
        normals: Option<&[Vec3]>,
        uvs: Option<&[Vec2]>,
    ) -> u32 {
        let base = self.vertices.positions.len() as u32;
        self.vertices.positions.extend_from_slice(positions);
        self.attributes |= VertexAttributes::POSITIONS;
        match normals {
            Some(n) => {
                debug_assert_eq!(n.len(), positions.len());
                self.vertices.normals.extend_from_slice(n);
                self.attributes |= VertexAttributes::NORMALS;
            }
            None => self
                .vertices
                .normals
                .extend(std::iter::repeat_n(Vec3::ZERO, positions.len())),
        }
        match uvs {
            Some(u) => {
                debug_assert_eq!(u.len(), positions.len());
                self.vertices.uvs.extend_from_slice(u);
                self.attributes |= VertexAttributes::UVS;
            }
            None => self
                .vertices
                .uvs
                .extend(std::iter::repeat_n(Vec2::ZERO, positions.len())),
        }
        base
    }

    /// Appends a mesh part from an index triple list, precomputing each
    /// triangle's face normal, centroid and longest edge. Returns the part
    /// index.
    pub fn add_part(&mut self, material: Material, indices: &[u32]) -> usize {
        let part_index = self.parts.len();
        let triangle_start = self.triangles.len();
        for tri in indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0], tri[1], tri[2]];
            let a = self.vertices.positions[i0 as usize];
            let b = self.vertices.positions[i1 as usize];
            let c = self.vertices.positions[i2 as usize];
            let normal = (b - a).cross(c - a).normalize_or_zero();
            let center = (a + b + c) / 3.0;
            let max_span = (b - a)
                .length()
                .max((c - b).length())
                .max((a - c).length());
            self.triangles.push(Triangle {
                indices: [i0, i1, i2],
                normal,
                center,
                max_span,
                part: part_index,
            });
        }
        self.parts.push(MeshPart {
            triangle_start,
            triangle_end: self.triangles.len(),
            material,
        });
        self.recalculate_dimensions();
        part_index
    }

    /// Adds (or resizes to) a vertex color channel filled with `fill`,
    /// returning the channel index. Channels are capped at
    /// [`MAX_COLOR_CHANNELS`].
    pub fn add_color_channel(&mut self, fill: Color) -> usize {
        let index = self.vertices.colors.len().min(MAX_COLOR_CHANNELS - 1);
        if self.vertices.colors.len() < MAX_COLOR_CHANNELS {
            self.vertices
                .colors
                .push(vec![fill; self.vertices.len()]);
        }
        self.attributes |= VertexAttributes::COLORS;
        index
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Recomputes the cached local-space bounds. Degenerate extents are
    /// clamped to a small positive size.
    pub fn recalculate_dimensions(&mut self) {
        let mut dims = Dimensions::empty();
        for &p in &self.vertices.positions {
            dims.expand_to(p);
        }
        self.dimensions = if dims.is_empty() {
            Dimensions::default()
        } else {
            dims.clamped_min_size()
        };
    }

    /// Recomputes per-triangle face normals and smooth vertex normals from
    /// current positions.
    pub fn recalculate_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.vertices.len()];
        for tri in &mut self.triangles {
            let a = self.vertices.positions[tri.indices[0] as usize];
            let b = self.vertices.positions[tri.indices[1] as usize];
            let c = self.vertices.positions[tri.indices[2] as usize];
            let face = (b - a).cross(c - a);
            tri.normal = face.normalize_or_zero();
            for &i in &tri.indices {
                accumulated[i as usize] += face;
            }
        }
        self.vertices.normals = accumulated
            .into_iter()
            .map(Vec3::normalize_or_zero)
            .collect();
        self.attributes |= VertexAttributes::NORMALS;
    }

    /// Builds the uniform-grid broadphase used by triangle-mesh collision.
    /// A grid of one cell or fewer degenerates to "test all triangles".
    pub fn build_broadphase(&mut self, cells_per_axis: usize) {
        self.broadphase = Some(Broadphase::new(self, cells_per_axis));
    }

    #[must_use]
    pub fn broadphase(&self) -> Option<&Broadphase> {
        self.broadphase.as_ref()
    }
}
