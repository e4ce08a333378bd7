//! Dense pixel images.
//!
//! [`PixelImage`] is a row-major `width × height` grid of arbitrary values. It
//! is used for rendered colors, correspondence images, label distributions and
//! textures alike. Out-of-range access is governed by an [`AccessMode`].

use rayon::prelude::*;

use crate::color::{Rgb, Rgba};
use crate::error::{Error, Result};
use crate::interpolate::Interpolate;

/// Boundary policy for accesses outside the image domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Out-of-range coordinates are clamped to the nearest border pixel.
    #[default]
    Clamp,
    /// Coordinates wrap around (periodic texture).
    Repeat,
    /// Out-of-range access is a programming error and panics.
    Strict,
}

impl AccessMode {
    /// Map a possibly out-of-range coordinate into `0..size`.
    #[inline]
    fn resolve(self, i: i64, size: usize) -> usize {
        let n = size as i64;
        match self {
            AccessMode::Clamp => i.clamp(0, n - 1) as usize,
            AccessMode::Repeat => i.rem_euclid(n) as usize,
            AccessMode::Strict => {
                assert!(
                    i >= 0 && i < n,
                    "pixel coordinate {} outside image of size {}",
                    i,
                    size
                );
                i as usize
            }
        }
    }
}

/// A dense, row-major image of values of type `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelImage<A> {
    width: usize,
    height: usize,
    data: Vec<A>,
}

impl<A: Clone> PixelImage<A> {
    /// Create an image filled with `value`.
    pub fn new(width: usize, height: usize, value: A) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }
}

impl<A> PixelImage<A> {
    /// Wrap a row-major data vector.
    pub fn from_vec(width: usize, height: usize, data: Vec<A>) -> Result<Self> {
        Error::check_len("image data", width * height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> A) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether `other` has the same size.
    #[inline]
    pub fn same_size<B>(&self, other: &PixelImage<B>) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Fail with [`Error::ImageSizeMismatch`] unless `other` has the same size.
    pub fn check_same_size<B>(&self, other: &PixelImage<B>) -> Result<()> {
        if self.same_size(other) {
            Ok(())
        } else {
            Err(Error::ImageSizeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: other.width,
                height: other.height,
            })
        }
    }

    /// Value at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the pixel lies outside the image.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &A {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) out of range", x, y);
        &self.data[y * self.width + x]
    }

    /// Mutable value at `(x, y)`.
    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut A {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) out of range", x, y);
        &mut self.data[y * self.width + x]
    }

    /// Set the value at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: A) {
        *self.get_mut(x, y) = value;
    }

    /// Value at possibly out-of-range integer coordinates.
    #[inline]
    pub fn at(&self, x: i64, y: i64, mode: AccessMode) -> &A {
        let xi = mode.resolve(x, self.width);
        let yi = mode.resolve(y, self.height);
        &self.data[yi * self.width + xi]
    }

    /// Row-major data.
    #[inline]
    pub fn as_slice(&self) -> &[A] {
        &self.data
    }

    /// Consume the image and return its row-major data.
    pub fn into_vec(self) -> Vec<A> {
        self.data
    }

    /// Iterate over `(x, y, value)` in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, &A)> + '_ {
        let w = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % w, i / w, v))
    }

    /// Apply `f` to every pixel.
    pub fn map<B>(&self, f: impl Fn(&A) -> B) -> PixelImage<B> {
        PixelImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<A: Send + Sync> PixelImage<A> {
    /// Create an image by evaluating `f(x, y)` for every pixel in parallel.
    pub fn par_from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> A + Sync) -> Self {
        let data = (0..width * height)
            .into_par_iter()
            .map(|i| f(i % width, i / width))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Apply `f` to every pixel in parallel.
    pub fn par_map<B: Send>(&self, f: impl Fn(&A) -> B + Sync) -> PixelImage<B> {
        PixelImage {
            width: self.width,
            height: self.height,
            data: self.data.par_iter().map(|v| f(v)).collect(),
        }
    }
}

impl<A: Interpolate> PixelImage<A> {
    /// Bilinear sample at continuous pixel coordinates.
    ///
    /// Pixel `(i, j)` has its center at `(i, j)`; neighbours outside the
    /// domain are resolved with `mode`.
    pub fn interpolate(&self, x: f64, y: f64, mode: AccessMode) -> A {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);
        // On a pixel center the far neighbour has zero weight and is not read
        let xn = if fx > 0.0 { xi + 1 } else { xi };
        let yn = if fy > 0.0 { yi + 1 } else { yi };

        let top = A::lerp(self.at(xi, yi, mode), self.at(xn, yi, mode), fx);
        let bottom = A::lerp(self.at(xi, yn, mode), self.at(xn, yn, mode), fx);
        A::lerp(&top, &bottom, fy)
    }

    /// Bilinear sample at texture coordinates `(u, v)` in `[0, 1]²`.
    ///
    /// `u` runs along the columns and `v` along the rows (top to bottom).
    pub fn sample_uv(&self, u: f64, v: f64, mode: AccessMode) -> A {
        let x = u * self.width as f64 - 0.5;
        let y = v * self.height as f64 - 0.5;
        self.interpolate(x, y, mode)
    }
}

impl PixelImage<Rgba> {
    /// Box-filter `factor × factor` blocks into single pixels.
    ///
    /// The image size must be a multiple of `factor`.
    pub fn downsample(&self, factor: usize) -> Result<PixelImage<Rgba>> {
        if factor == 0 || self.width % factor != 0 || self.height % factor != 0 {
            return Err(Error::invalid_param(
                "factor",
                factor,
                "must be positive and divide the image size",
            ));
        }
        let (w, h) = (self.width / factor, self.height / factor);
        let norm = 1.0 / (factor * factor) as f64;
        Ok(PixelImage::par_from_fn(w, h, |x, y| {
            let mut sum = Rgba::TRANSPARENT;
            for sy in 0..factor {
                for sx in 0..factor {
                    sum = sum + *self.get(x * factor + sx, y * factor + sy);
                }
            }
            sum * norm
        }))
    }

    /// Convert to an 8-bit RGBA buffer.
    pub fn to_rgba_image(&self) -> ::image::RgbaImage {
        ::image::RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            self.get(x as usize, y as usize).to_rgba8()
        })
    }
}

impl PixelImage<Rgb> {
    /// Convert from an 8-bit RGB buffer.
    pub fn from_rgb_image(img: &::image::RgbImage) -> Self {
        PixelImage::from_fn(img.width() as usize, img.height() as usize, |x, y| {
            Rgb::from_rgb8(img.get_pixel(x as u32, y as u32))
        })
    }
}
