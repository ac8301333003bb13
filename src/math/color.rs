use std::ops::{Add, AddAssign, Mul, Sub};

use glam::{Vec3, Vec4};

/// Linear RGBA color with 32-bit float channels.
///
/// Channels are unbounded during accumulation (lighting sums can exceed 1.0)
/// and clamped on conversion to an output format.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from RGB channels.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            a: f32::from(a) / 255.0,
        }
    }

    /// Clamps every channel to `[0, 1]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }

    /// Converts linear channels to sRGB. Alpha passes through unchanged.
    #[must_use]
    pub fn to_srgb(self) -> Self {
        fn encode(c: f32) -> f32 {
            let c = c.clamp(0.0, 1.0);
            if c <= 0.003_130_8 {
                12.92 * c
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            }
        }
        Self {
            r: encode(self.r),
            g: encode(self.g),
            b: encode(self.b),
            a: self.a.clamp(0.0, 1.0),
        }
    }

    /// Channels widened to 16 bits per component.
    #[must_use]
    pub fn to_rgba16(self) -> [u16; 4] {
        let c = self.clamped();
        [
            (c.r * f32::from(u16::MAX)) as u16,
            (c.g * f32::from(u16::MAX)) as u16,
            (c.b * f32::from(u16::MAX)) as u16,
            (c.a * f32::from(u16::MAX)) as u16,
        ]
    }

    #[must_use]
    pub fn to_rgba8(self) -> [u8; 4] {
        let c = self.clamped();
        [
            (c.r * 255.0 + 0.5) as u8,
            (c.g * 255.0 + 0.5) as u8,
            (c.b * 255.0 + 0.5) as u8,
            (c.a * 255.0 + 0.5) as u8,
        ]
    }

    #[must_use]
    pub fn lerp(self, other: Color, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Component-wise modulation, alpha included.
    #[must_use]
    pub fn modulate(self, other: Color) -> Self {
        Self {
            r: self.r * other.r,
            g: self.g * other.g,
            b: self.b * other.b,
            a: self.a * other.a,
        }
    }
}

impl Add for Color {
    type Output = Color;
    fn add(self, rhs: Color) -> Color {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

impl Sub for Color {
    type Output = Color;
    fn sub(self, rhs: Color) -> Color {
        Color::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b, self.a - rhs.a)
    }
}

impl Mul<f32> for Color {
    type Output = Color;
    fn mul(self, rhs: f32) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

impl From<Vec3> for Color {
    fn from(v: Vec3) -> Self {
        Color::rgb(v.x, v.y, v.z)
    }
}

impl From<Vec4> for Color {
    fn from(v: Vec4) -> Self {
        Color::new(v.x, v.y, v.z, v.w)
    }
}

impl From<Color> for Vec4 {
    fn from(c: Color) -> Self {
        Vec4::new(c.r, c.g, c.b, c.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints() {
        assert_eq!(Color::BLACK.to_srgb(), Color::BLACK);
        let white = Color::WHITE.to_srgb();
        assert!((white.r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rgba16_scales_full_range() {
        let c = Color::new(0.0, 1.0, 0.5, 1.0).to_rgba16();
        assert_eq!(c[0], 0);
        assert_eq!(c[1], u16::MAX);
        assert_eq!(c[3], u16::MAX);
    }

    #[test]
    fn modulate_is_componentwise() {
        let c = Color::new(0.5, 1.0, 0.0, 1.0).modulate(Color::new(1.0, 0.5, 1.0, 0.5));
        assert_eq!(c, Color::new(0.5, 0.5, 0.0, 0.5));
    }
}
