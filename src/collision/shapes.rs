//! Closest-point primitives shared by the intersection tests.

use glam::Vec3;

/// Closest point to `p` on segment `ab`.
#[must_use]
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point to `p` on triangle `abc` (Ericson, Real-Time Collision
/// Detection §5.1.5).
#[must_use]
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Closest points between segments `p1q1` and `p2q2` (Ericson §5.1.9).
#[must_use]
pub fn closest_points_on_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let (s, t);
    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }
    if a <= f32::EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s_val = if denom.abs() > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t_val = (b * s_val + f) / e;
            if t_val < 0.0 {
                t_val = 0.0;
                s_val = (-c / a).clamp(0.0, 1.0);
            } else if t_val > 1.0 {
                t_val = 1.0;
                s_val = ((b - c) / a).clamp(0.0, 1.0);
            }
            s = s_val;
            t = t_val;
        }
    }
    (p1 + d1 * s, p2 + d2 * t)
}

/// Projection interval of a triangle onto `axis`, relative to `origin`.
#[must_use]
pub fn project_triangle(axis: Vec3, origin: Vec3, verts: &[Vec3; 3]) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for v in verts {
        let d = (*v - origin).dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

/// Radius of a box with half-extents `half` projected onto `axis` (the box
/// is world-axis aligned).
#[must_use]
pub fn project_aabb_radius(axis: Vec3, half: Vec3) -> f32 {
    half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_point_inside_triangle_is_projection() {
        let a = Vec3::new(-1.0, 0.0, -1.0);
        let b = Vec3::new(1.0, 0.0, -1.0);
        let c = Vec3::new(0.0, 0.0, 1.0);
        let p = Vec3::new(0.0, 2.0, 0.0);
        let cp = closest_point_on_triangle(p, a, b, c);
        assert!((cp - Vec3::new(0.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn closest_point_clamps_to_vertex() {
        let a = Vec3::ZERO;
        let b = Vec3::X;
        let c = Vec3::Z;
        let p = Vec3::new(-1.0, 0.5, -1.0);
        assert_eq!(closest_point_on_triangle(p, a, b, c), a);
    }

    #[test]
    fn segment_segment_crossing() {
        let (p, q) = closest_points_on_segments(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(0.0, -1.0, 1.0),
        );
        assert!((p - Vec3::ZERO).length() < 1e-5);
        assert!((q - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }
}
