//! Software triangle rasterization.
//!
//! Implements the textured-triangle drawing operation the render pipeline
//! emits into: barycentric coverage over the triangle's bounding box,
//! affine (not perspective-correct) attribute interpolation, depth testing
//! against view-space distance, texture sampling with filter/wrap modes,
//! alpha clipping and composite blending.

use glam::{Vec2, Vec3};

use crate::math::Color;
use crate::resources::image::Image;
use crate::resources::material::{Composite, TextureFilter, TextureWrap};

/// One triangle corner as handed to [`draw_triangles`].
#[derive(Debug, Clone, Copy)]
pub struct DrawVertex {
    /// Destination position in pixels.
    pub position: Vec2,
    /// Source texture coordinates (normalized).
    pub uv: Vec2,
    /// Per-channel color scale (lighting × material × tint).
    pub color: Color,
    /// View-space distance for depth testing.
    pub depth: f32,
}

/// Raster state for a batch of triangles.
pub struct DrawOptions<'a> {
    pub texture: Option<&'a Image>,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
    pub composite: Composite,
    /// Discard fragments whose sampled alpha is below one half.
    pub alpha_clip: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    /// Face normal written to the normal target, when one is attached.
    pub face_normal: Option<Vec3>,
}

impl Default for DrawOptions<'_> {
    fn default() -> Self {
        Self {
            texture: None,
            filter: TextureFilter::Nearest,
            wrap: TextureWrap::Repeat,
            composite: Composite::SourceOver,
            alpha_clip: false,
            depth_test: true,
            depth_write: true,
            face_normal: None,
        }
    }
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Draws indexed triangles into the color and depth targets.
///
/// `indices` holds triples into `vertices`. Degenerate and fully
/// offscreen triangles are skipped; nothing here panics on malformed
/// input.
pub fn draw_triangles(
    color: &mut Image,
    depth: &mut Image,
    mut normal: Option<&mut Image>,
    vertices: &[DrawVertex],
    indices: &[u32],
    options: &DrawOptions<'_>,
) {
    for tri in indices.chunks_exact(3) {
        let (Some(v0), Some(v1), Some(v2)) = (
            vertices.get(tri[0] as usize),
            vertices.get(tri[1] as usize),
            vertices.get(tri[2] as usize),
        ) else {
            continue;
        };
        draw_triangle(color, depth, normal.as_deref_mut(), *v0, *v1, *v2, options);
    }
}

#[allow(clippy::similar_names)]
fn draw_triangle(
    color: &mut Image,
    depth: &mut Image,
    normal: Option<&mut Image>,
    v0: DrawVertex,
    v1: DrawVertex,
    v2: DrawVertex,
    options: &DrawOptions<'_>,
) {
    let (width, height) = color.bounds();

    let area = edge(v0.position, v1.position, v2.position);
    if area.abs() < f32::EPSILON {
        return;
    }
    let inv_area = 1.0 / area;

    let min_x = v0.position.x.min(v1.position.x).min(v2.position.x).floor().max(0.0) as u32;
    let max_x = (v0.position.x.max(v1.position.x).max(v2.position.x).ceil() as i64)
        .clamp(0, i64::from(width) - 1) as u32;
    let min_y = v0.position.y.min(v1.position.y).min(v2.position.y).floor().max(0.0) as u32;
    let max_y = (v0.position.y.max(v1.position.y).max(v2.position.y).ceil() as i64)
        .clamp(0, i64::from(height) - 1) as u32;
    if min_x > max_x || min_y > max_y {
        return;
    }

    let normal_color = options
        .face_normal
        .map(|n| Color::new(n.x * 0.5 + 0.5, n.y * 0.5 + 0.5, n.z * 0.5 + 0.5, 1.0));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);

            // Barycentric weights; dividing by the signed area keeps them
            // in [0, 1] for interior points of either winding.
            let w0 = edge(v1.position, v2.position, p) * inv_area;
            let w1 = edge(v2.position, v0.position, p) * inv_area;
            let w2 = edge(v0.position, v1.position, p) * inv_area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let frag_depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
            if options.depth_test && frag_depth > depth.pixel(x, y).r {
                continue;
            }

            let vertex_color = Color::new(
                w0 * v0.color.r + w1 * v1.color.r + w2 * v2.color.r,
                w0 * v0.color.g + w1 * v1.color.g + w2 * v2.color.g,
                w0 * v0.color.b + w1 * v1.color.b + w2 * v2.color.b,
                w0 * v0.color.a + w1 * v1.color.a + w2 * v2.color.a,
            );

            // Affine texture interpolation; acceptable for the retro look.
            let src = match options.texture {
                Some(texture) => {
                    let u = w0 * v0.uv.x + w1 * v1.uv.x + w2 * v2.uv.x;
                    let v = w0 * v0.uv.y + w1 * v1.uv.y + w2 * v2.uv.y;
                    texture.sample(u, v, options.filter, options.wrap).modulate(vertex_color)
                }
                None => vertex_color,
            };
            if options.alpha_clip && src.a < 0.5 {
                continue;
            }

            let dst = color.pixel(x, y);
            let blended = match options.composite {
                Composite::SourceOver => {
                    let a = src.a.clamp(0.0, 1.0);
                    Color::new(
                        src.r * a + dst.r * (1.0 - a),
                        src.g * a + dst.g * (1.0 - a),
                        src.b * a + dst.b * (1.0 - a),
                        (a + dst.a * (1.0 - a)).clamp(0.0, 1.0),
                    )
                }
                Composite::Additive => dst + src * src.a,
                Composite::Subtractive => {
                    let scaled = src * src.a;
                    Color::new(dst.r - scaled.r, dst.g - scaled.g, dst.b - scaled.b, dst.a)
                }
                Composite::Multiply => dst.modulate(src),
            };
            color.set_pixel(x, y, blended.clamped());

            if options.depth_write {
                depth.set_pixel(x, y, Color::new(frag_depth, 0.0, 0.0, 1.0));
            }
        }
    }

    // Normal target pass, done separately so the main loop keeps a single
    // mutable image borrow.
    if let (Some(normal_img), Some(nc)) = (normal, normal_color) {
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(v1.position, v2.position, p) * inv_area;
                let w1 = edge(v2.position, v0.position, p) * inv_area;
                let w2 = edge(v0.position, v1.position, p) * inv_area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let frag_depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
                if (frag_depth - depth.pixel(x, y).r).abs() < 1e-4 {
                    normal_img.set_pixel(x, y, nc);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_screen_triangle() -> [DrawVertex; 3] {
        let v = |x: f32, y: f32| DrawVertex {
            position: Vec2::new(x, y),
            uv: Vec2::ZERO,
            color: Color::WHITE,
            depth: 1.0,
        };
        [v(-4.0, -4.0), v(20.0, -4.0), v(-4.0, 20.0)]
    }

    #[test]
    fn covers_pixels_and_writes_depth() {
        let mut color = Image::new(8, 8);
        let mut depth = Image::new(8, 8);
        depth.fill(Color::new(f32::MAX, 0.0, 0.0, 1.0));
        let verts = full_screen_triangle();
        draw_triangles(
            &mut color,
            &mut depth,
            None,
            &verts,
            &[0, 1, 2],
            &DrawOptions::default(),
        );
        assert_eq!(color.pixel(2, 2), Color::WHITE);
        assert!((depth.pixel(2, 2).r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn depth_test_rejects_farther_fragments() {
        let mut color = Image::new(8, 8);
        let mut depth = Image::new(8, 8);
        depth.fill(Color::new(0.5, 0.0, 0.0, 1.0));
        let verts = full_screen_triangle();
        draw_triangles(
            &mut color,
            &mut depth,
            None,
            &verts,
            &[0, 1, 2],
            &DrawOptions::default(),
        );
        assert_eq!(color.pixel(2, 2), Color::TRANSPARENT);
    }

    #[test]
    fn alpha_clip_discards_transparent_texels() {
        let mut color = Image::new(4, 4);
        let mut depth = Image::new(4, 4);
        depth.fill(Color::new(f32::MAX, 0.0, 0.0, 1.0));
        let texture = Image::from_pixels(1, 1, vec![Color::new(1.0, 0.0, 0.0, 0.2)]);
        let verts = full_screen_triangle();
        let options = DrawOptions {
            texture: Some(&texture),
            alpha_clip: true,
            ..DrawOptions::default()
        };
        draw_triangles(&mut color, &mut depth, None, &verts, &[0, 1, 2], &options);
        assert_eq!(color.pixel(1, 1), Color::TRANSPARENT);
    }
}
