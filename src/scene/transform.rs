use glam::{Mat4, Quat, Vec3};

use crate::math;

/// Transform component for scene nodes.
///
/// Holds the authoritative local position, rotation and scale together with
/// the cached world matrix and its dirty flag. Local values compose as
/// `T * R * S`; the world matrix is the parent's world matrix times the
/// local composition.
///
/// Mutation goes through [`Scene`](crate::scene::Scene) setters so the
/// subtree below the node is marked dirty; the cached world matrix is
/// refreshed lazily the next time it is read.
#[derive(Debug, Clone)]
pub struct Transform {
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) scale: Vec3,

    pub(crate) world_matrix: Mat4,
    pub(crate) dirty: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world_matrix: Mat4::IDENTITY,
            dirty: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// True while the cached world matrix is stale or unset.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Local `T * R * S` composition, computed fresh.
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Cached world matrix. Only meaningful when [`is_dirty`](Self::is_dirty)
    /// is false; go through [`Scene::world_matrix`](crate::scene::Scene::world_matrix)
    /// to get a refreshed value.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Overwrites local TRS by decomposing `m`.
    ///
    /// Negative scale is not supported by the decomposition and produces an
    /// incorrect rotation.
    pub fn set_from_matrix(&mut self, m: Mat4) {
        let (translation, rotation, scale) = math::decompose(m);
        self.position = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.dirty = true;
    }

    /// Orients the transform so local -Z points at `target` (parent space).
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let rot = math::look_at_rotation(self.position, target, up);
        self.rotation = rot;
        self.dirty = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
