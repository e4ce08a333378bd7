//! Linear blending of attribute values.
//!
//! Everything that can be attached to a surface or stored in a sampled image
//! implements [`Interpolate`], which is all barycentric and bilinear
//! interpolation need.

use nalgebra::{Point2, Point3, Vector2, Vector3};

use crate::color::{Rgb, Rgba};

/// Values that support affine combinations.
pub trait Interpolate: Clone + Send + Sync {
    /// Affine combination `w[0]·a + w[1]·b + w[2]·c`.
    ///
    /// Callers pass weights that sum to one. A unit weight on one argument
    /// reproduces that argument exactly.
    fn combine3(a: &Self, b: &Self, c: &Self, w: [f64; 3]) -> Self;

    /// Linear interpolation `(1 - t)·a + t·b`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self::combine3(a, b, b, [1.0 - t, t, 0.0])
    }
}

macro_rules! impl_linear_interpolate {
    ($($t:ty),*) => {
        $(
            impl Interpolate for $t {
                #[inline]
                fn combine3(a: &Self, b: &Self, c: &Self, w: [f64; 3]) -> Self {
                    *a * w[0] + *b * w[1] + *c * w[2]
                }
            }
        )*
    };
}

impl_linear_interpolate!(f64, Rgb, Rgba, Vector2<f64>, Vector3<f64>);

impl Interpolate for Point2<f64> {
    #[inline]
    fn combine3(a: &Self, b: &Self, c: &Self, w: [f64; 3]) -> Self {
        Point2::from(a.coords * w[0] + b.coords * w[1] + c.coords * w[2])
    }
}

impl Interpolate for Point3<f64> {
    #[inline]
    fn combine3(a: &Self, b: &Self, c: &Self, w: [f64; 3]) -> Self {
        Point3::from(a.coords * w[0] + b.coords * w[1] + c.coords * w[2])
    }
}
