//! Numeric primitives shared across the engine.
//!
//! Vector, matrix and quaternion math comes from [`glam`]; this module adds
//! the handful of types glam does not provide (colors, axis-aligned
//! dimensions) and small helpers over `Mat4`.
//!
//! The engine uses a right-handed coordinate system throughout:
//! +X right, +Y up, +Z toward the viewer. Matrices compose as `T * R * S`.

pub mod color;
pub mod dimensions;

pub use color::Color;
pub use dimensions::Dimensions;

use glam::{Mat4, Quat, Vec3};

/// Smallest scale magnitude accepted by decomposition and mesh bounds.
///
/// Zero or negative sizes are clamped here and processing continues.
pub const MIN_DIMENSION: f32 = 1e-6;

/// Inverts `m`, returning identity when `m` is singular.
#[must_use]
pub fn safe_inverse(m: Mat4) -> Mat4 {
    if m.determinant().abs() < f32::EPSILON {
        Mat4::IDENTITY
    } else {
        m.inverse()
    }
}

/// Decomposes `m` into translation, rotation and non-negative scale.
///
/// Exact for matrices composed as `T * R * S` with positive scale and
/// orthonormal rotation. Negative scale is not supported and yields an
/// incorrect rotation.
#[must_use]
pub fn decompose(m: Mat4) -> (Vec3, Quat, Vec3) {
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    (translation, rotation, scale)
}

/// Builds a rotation that points local -Z from `from` toward `to`.
///
/// Falls back to identity when the direction is degenerate or parallel to
/// `up`.
#[must_use]
pub fn look_at_rotation(from: Vec3, to: Vec3, up: Vec3) -> Quat {
    let forward = to - from;
    if forward.length_squared() < f32::EPSILON {
        return Quat::IDENTITY;
    }
    let forward = forward.normalize();
    if forward.cross(up).length_squared() < 1e-8 {
        return Quat::IDENTITY;
    }
    let right = forward.cross(up).normalize();
    let new_up = right.cross(forward).normalize();
    let rot = glam::Mat3::from_cols(right, new_up, -forward);
    Quat::from_mat3(&rot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_inverse_of_singular_is_identity() {
        let singular = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(safe_inverse(singular), Mat4::IDENTITY);
    }

    #[test]
    fn safe_inverse_round_trip() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let product = m * safe_inverse(m);
        for col in 0..4 {
            for row in 0..4 {
                let expected = if col == row { 1.0 } else { 0.0 };
                assert!((product.col(col)[row] - expected).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn look_at_points_forward() {
        let from = Vec3::new(1.0, 0.0, 0.0);
        let to = Vec3::new(1.0, 0.0, -5.0);
        let rot = look_at_rotation(from, to, Vec3::Y);
        let forward = rot * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_Z).length() < 1e-4);
    }
}
