use glam::{Mat4, Vec3};

use crate::math::MIN_DIMENSION;

/// An axis-aligned box described by its minimum and maximum corners.
///
/// Used both for mesh bounds in local space and for world-space bounding
/// volumes. An empty `Dimensions` (from [`Dimensions::empty`]) has inverted
/// corners so that the first [`expand_to`](Dimensions::expand_to) snaps it
/// to the point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub min: Vec3,
    pub max: Vec3,
}

impl Dimensions {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Inverted-corner accumulator seed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Box of the given full extents centered on `center`.
    #[must_use]
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = (size * 0.5).abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn expand_to(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[must_use]
    pub fn union(self, other: Dimensions) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Largest extent over the three axes.
    #[must_use]
    pub fn max_span(&self) -> f32 {
        let s = self.size();
        s.x.max(s.y).max(s.z)
    }

    #[must_use]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[must_use]
    pub fn overlaps(&self, other: &Dimensions) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Point inside the box nearest to `p`.
    #[must_use]
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    #[must_use]
    pub fn translated(self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Axis-aligned enclosure of this box transformed by `m`.
    ///
    /// The eight corners are transformed and re-bounded, so a rotated box
    /// becomes the AABB of its OBB.
    #[must_use]
    pub fn transformed(self, m: Mat4) -> Self {
        let mut out = Dimensions::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_to(m.transform_point3(corner));
        }
        out
    }

    /// Ensures every extent is at least [`MIN_DIMENSION`], growing
    /// degenerate axes symmetrically around the center.
    #[must_use]
    pub fn clamped_min_size(self) -> Self {
        let center = self.center();
        let mut half = self.size() * 0.5;
        half.x = half.x.max(MIN_DIMENSION * 0.5);
        half.y = half.y.max(MIN_DIMENSION * 0.5);
        half.z = half.z.max(MIN_DIMENSION * 0.5);
        Self {
            min: center - half,
            max: center + half,
        }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn expand_from_empty() {
        let mut d = Dimensions::empty();
        d.expand_to(Vec3::new(1.0, -2.0, 3.0));
        d.expand_to(Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(d.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(d.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn rotated_box_encloses_obb() {
        let d = Dimensions::from_center_size(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let m = Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let t = d.transformed(m);
        // A unit half-extent cube rotated 45 degrees spans sqrt(2) on X/Z.
        assert!((t.max.x - std::f32::consts::SQRT_2).abs() < 1e-4);
        assert!((t.max.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn overlap_is_inclusive() {
        let a = Dimensions::from_center_size(Vec3::ZERO, Vec3::splat(2.0));
        let b = Dimensions::from_center_size(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(2.0));
        assert!(a.overlaps(&b));
        let c = Dimensions::from_center_size(Vec3::new(2.1, 0.0, 0.0), Vec3::splat(2.0));
        assert!(!a.overlaps(&c));
    }
}
