use crate::errors::Result;
use crate::math::Color;
use crate::resources::material::{TextureFilter, TextureWrap};

/// A software image: both the render target and the texture type.
///
/// Pixels are linear [`Color`] values so lighting and blending accumulate
/// without quantization; depth targets reuse the type with view distance in
/// the red channel. Textures are shared as `Arc<Image>` handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Image {
    /// A transparent-black image of the given size (clamped to at least
    /// 1×1).
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; (width * height) as usize],
        }
    }

    /// Builds an image from row-major pixels. The pixel count must equal
    /// `width * height`.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Self {
        assert_eq!(
            pixels.len(),
            (width * height) as usize,
            "pixel count must match image dimensions"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decodes a PNG or JPEG byte stream.
    pub fn from_encoded_bytes(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        let pixels = decoded
            .pixels()
            .map(|p| Color::from_rgba8(p.0[0], p.0[1], p.0[2], p.0[3]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Converts raw RGBA8 data (as the glTF importer hands over).
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, data: &[u8]) -> Self {
        let pixels = data
            .chunks_exact(4)
            .map(|p| Color::from_rgba8(p[0], p[1], p[2], p[3]))
            .collect();
        Self::from_pixels(width, height, pixels)
    }

    #[must_use]
    pub fn bounds(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    #[inline]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return Color::TRANSPARENT;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Color] {
        &mut self.pixels
    }

    /// Samples the image at UV coordinates.
    ///
    /// `Repeat` wraps with `rem_euclid` (negative coordinates wrap
    /// correctly); `Clamp` pins to the edge. `Linear` filtering is a plain
    /// bilinear blend of the four neighboring texels.
    #[must_use]
    pub fn sample(&self, u: f32, v: f32, filter: TextureFilter, wrap: TextureWrap) -> Color {
        match filter {
            TextureFilter::Nearest => {
                let (x, y) = self.texel_coords(u, v, wrap);
                self.pixel(x, y)
            }
            TextureFilter::Linear => {
                let fx = u * self.width as f32 - 0.5;
                let fy = v * self.height as f32 - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let tx = fx - x0;
                let ty = fy - y0;
                let sample_at = |xi: f32, yi: f32| {
                    let (x, y) = self.wrap_texel(xi as i64, yi as i64, wrap);
                    self.pixel(x, y)
                };
                let c00 = sample_at(x0, y0);
                let c10 = sample_at(x0 + 1.0, y0);
                let c01 = sample_at(x0, y0 + 1.0);
                let c11 = sample_at(x0 + 1.0, y0 + 1.0);
                c00.lerp(c10, tx).lerp(c01.lerp(c11, tx), ty)
            }
        }
    }

    fn texel_coords(&self, u: f32, v: f32, wrap: TextureWrap) -> (u32, u32) {
        let x = (u * self.width as f32).floor() as i64;
        let y = (v * self.height as f32).floor() as i64;
        self.wrap_texel(x, y, wrap)
    }

    fn wrap_texel(&self, x: i64, y: i64, wrap: TextureWrap) -> (u32, u32) {
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        match wrap {
            TextureWrap::Repeat => ((x.rem_euclid(w)) as u32, (y.rem_euclid(h)) as u32),
            TextureWrap::Clamp => (x.clamp(0, w - 1) as u32, y.clamp(0, h - 1) as u32),
        }
    }

    /// Flattens to RGBA8 bytes, row-major.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| c.to_rgba8())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Image {
        Image::from_pixels(
            2,
            2,
            vec![
                Color::rgb(1.0, 0.0, 0.0),
                Color::rgb(0.0, 1.0, 0.0),
                Color::rgb(0.0, 0.0, 1.0),
                Color::WHITE,
            ],
        )
    }

    #[test]
    fn nearest_sampling_hits_texel_centers() {
        let img = two_by_two();
        let c = img.sample(0.25, 0.25, TextureFilter::Nearest, TextureWrap::Repeat);
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));
        let c = img.sample(0.75, 0.75, TextureFilter::Nearest, TextureWrap::Repeat);
        assert_eq!(c, Color::WHITE);
    }

    #[test]
    fn repeat_wraps_negative_coordinates() {
        let img = two_by_two();
        let wrapped = img.sample(-0.75, 0.25, TextureFilter::Nearest, TextureWrap::Repeat);
        let direct = img.sample(0.25, 0.25, TextureFilter::Nearest, TextureWrap::Repeat);
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn bilinear_blends_neighbors() {
        let img = two_by_two();
        let c = img.sample(0.5, 0.25, TextureFilter::Linear, TextureWrap::Clamp);
        assert!((c.r - 0.5).abs() < 1e-5);
        assert!((c.g - 0.5).abs() < 1e-5);
    }
}
