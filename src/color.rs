//! Linear color types.
//!
//! Colors are stored as `f64` channels in linear space, nominally in `[0, 1]`.
//! Values outside that range are allowed during shading and are only clamped
//! when converting to 8-bit images.

use std::ops::{Add, AddAssign, Div, Mul, Sub};

/// A linear RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
}

impl Rgb {
    /// Black.
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    /// White.
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    /// Create a color from its channels.
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Create a gray color with all channels set to `v`.
    pub const fn gray(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Channel by index (0 = red, 1 = green, 2 = blue).
    ///
    /// # Panics
    /// Panics if `channel > 2`.
    #[inline]
    pub fn channel(&self, channel: usize) -> f64 {
        match channel {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            _ => panic!("RGB channel index {} out of range", channel),
        }
    }

    /// Channels as an array.
    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    /// Apply `f` to every channel.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    /// Channel-wise product.
    #[inline]
    pub fn modulate(self, other: Rgb) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    /// Clamp every channel to `[0, 1]`.
    #[inline]
    pub fn clamped(self) -> Self {
        self.map(|c| c.clamp(0.0, 1.0))
    }

    /// Squared Euclidean norm of the channel vector.
    #[inline]
    pub fn norm_squared(self) -> f64 {
        self.r * self.r + self.g * self.g + self.b * self.b
    }

    /// Attach an alpha channel.
    #[inline]
    pub fn with_alpha(self, a: f64) -> Rgba {
        Rgba::new(self.r, self.g, self.b, a)
    }

    /// Convert to an 8-bit pixel, clamping to `[0, 1]`.
    pub fn to_rgb8(self) -> ::image::Rgb<u8> {
        let c = self.clamped();
        ::image::Rgb([to_u8(c.r), to_u8(c.g), to_u8(c.b)])
    }

    /// Convert from an 8-bit pixel.
    pub fn from_rgb8(p: &::image::Rgb<u8>) -> Self {
        Self::new(
            p.0[0] as f64 / 255.0,
            p.0[1] as f64 / 255.0,
            p.0[2] as f64 / 255.0,
        )
    }
}

impl Add for Rgb {
    type Output = Rgb;
    #[inline]
    fn add(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Rgb {
    #[inline]
    fn add_assign(&mut self, rhs: Rgb) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Sub for Rgb {
    type Output = Rgb;
    #[inline]
    fn sub(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl Mul<f64> for Rgb {
    type Output = Rgb;
    #[inline]
    fn mul(self, rhs: f64) -> Rgb {
        Rgb::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl Div<f64> for Rgb {
    type Output = Rgb;
    #[inline]
    fn div(self, rhs: f64) -> Rgb {
        Rgb::new(self.r / rhs, self.g / rhs, self.b / rhs)
    }
}

/// A linear RGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
    /// Alpha (coverage) channel.
    pub a: f64,
}

impl Rgba {
    /// Fully transparent black, the default background.
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its channels.
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Drop the alpha channel.
    #[inline]
    pub fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    /// Convert to an 8-bit pixel, clamping to `[0, 1]`.
    pub fn to_rgba8(self) -> ::image::Rgba<u8> {
        ::image::Rgba([
            to_u8(self.r.clamp(0.0, 1.0)),
            to_u8(self.g.clamp(0.0, 1.0)),
            to_u8(self.b.clamp(0.0, 1.0)),
            to_u8(self.a.clamp(0.0, 1.0)),
        ])
    }
}

impl Add for Rgba {
    type Output = Rgba;
    #[inline]
    fn add(self, rhs: Rgba) -> Rgba {
        Rgba::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl Mul<f64> for Rgba {
    type Output = Rgba;
    #[inline]
    fn mul(self, rhs: f64) -> Rgba {
        Rgba::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

impl From<Rgb> for Rgba {
    fn from(c: Rgb) -> Self {
        c.with_alpha(1.0)
    }
}

#[inline]
fn to_u8(c: f64) -> u8 {
    (c * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb8_conversion_clamps() {
        let c = Rgb::new(1.5, -0.2, 0.5);
        let p = c.to_rgb8();
        assert_eq!(p.0, [255, 0, 128]);
    }

    #[test]
    fn test_modulate() {
        let c = Rgb::new(0.5, 1.0, 0.25).modulate(Rgb::new(0.5, 0.5, 4.0));
        assert_eq!(c, Rgb::new(0.25, 0.5, 1.0));
    }
}
