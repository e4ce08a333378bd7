//! Real spherical harmonics basis and SH environment lights.
//!
//! Coefficients are ordered by band `l` and then by order `m = -l..=l`, so
//! band count `B` uses `B²` coefficients. Up to four bands (16 functions) are
//! supported.
//!
//! # References
//!
//! - Ramamoorthi, R., Hanrahan, P. (2001). "An Efficient Representation for
//!   Irradiance Environment Maps." SIGGRAPH '01.

use nalgebra::Vector3;

use crate::color::Rgb;
use crate::error::{Error, Result};

/// Maximum number of supported bands.
pub const MAX_BANDS: usize = 4;

/// Normalization constant of `Y_0^0`.
const Y00: f64 = 0.282_094_791_773_878_14;
const Y1: f64 = 0.488_602_511_902_919_9;
const Y2_A: f64 = 1.092_548_430_592_079_2;
const Y2_B: f64 = 0.315_391_565_252_520_05;
const Y2_C: f64 = 0.546_274_215_296_039_6;
const Y3_A: f64 = 0.590_043_589_926_643_5;
const Y3_B: f64 = 2.890_611_442_640_554;
const Y3_C: f64 = 0.457_045_799_464_465_8;
const Y3_D: f64 = 0.373_176_332_590_115_4;
const Y3_E: f64 = 1.445_305_721_320_277;

/// Number of coefficients for `bands` bands.
#[inline]
pub fn num_coefficients(bands: usize) -> usize {
    bands * bands
}

/// Number of bands for `n` coefficients, if `n` is a supported square.
pub fn bands_for(n: usize) -> Result<usize> {
    (1..=MAX_BANDS)
        .find(|b| b * b == n)
        .ok_or(Error::UnsupportedBandCount(n))
}

/// Band `l` of coefficient index `i`.
#[inline]
pub fn band_of(i: usize) -> usize {
    (i as f64).sqrt().floor() as usize
}

/// Evaluate the first `n` real SH basis functions at a direction.
///
/// The direction is normalized before evaluation. `n` must be at most 16.
pub fn sh_basis(direction: &Vector3<f64>, n: usize) -> Vec<f64> {
    assert!(n <= num_coefficients(MAX_BANDS), "at most 16 SH basis functions");
    let d = direction.normalize();
    let (x, y, z) = (d.x, d.y, d.z);
    let all = [
        Y00,
        Y1 * y,
        Y1 * z,
        Y1 * x,
        Y2_A * x * y,
        Y2_A * y * z,
        Y2_B * (3.0 * z * z - 1.0),
        Y2_A * x * z,
        Y2_C * (x * x - y * y),
        Y3_A * y * (3.0 * x * x - y * y),
        Y3_B * x * y * z,
        Y3_C * y * (5.0 * z * z - 1.0),
        Y3_D * z * (5.0 * z * z - 3.0),
        Y3_C * x * (5.0 * z * z - 1.0),
        Y3_E * z * (x * x - y * y),
        Y3_A * x * (x * x - 3.0 * y * y),
    ];
    all[..n].to_vec()
}

/// Unit per-coefficient kernel for `bands` bands.
pub fn unit_kernel(bands: usize) -> Vec<f64> {
    vec![1.0; num_coefficients(bands)]
}

/// Lambertian reflectance kernel for `bands` bands, expanded per coefficient.
///
/// Per band the factors are the cosine-lobe convolution weights divided by π
/// (1, 2/3, 1/4, 0): the radiance reflected by a white Lambertian surface
/// under environment radiance `L` is `Σ k_l · L_lm · Y_lm(n)`.
pub fn lambert_kernel(bands: usize) -> Vec<f64> {
    const BAND_FACTORS: [f64; MAX_BANDS] = [1.0, 2.0 / 3.0, 0.25, 0.0];
    (0..num_coefficients(bands))
        .map(|i| BAND_FACTORS[band_of(i)])
        .collect()
}

/// An environment light in the spherical harmonics basis.
///
/// Each coefficient holds one RGB weight. Coefficients are irradiance-domain:
/// the light reaching a surface with normal `n` is `Σ c_i · Y_i(n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalHarmonicsLight {
    coefficients: Vec<Vector3<f64>>,
}

impl SphericalHarmonicsLight {
    /// Create a light from per-basis RGB coefficients (1, 4, 9 or 16 of them).
    pub fn new(coefficients: Vec<Vector3<f64>>) -> Result<Self> {
        bands_for(coefficients.len())?;
        Ok(Self { coefficients })
    }

    /// No light at all, with `bands` bands.
    pub fn zero(bands: usize) -> Result<Self> {
        Self::new(vec![Vector3::zeros(); num_coefficients(bands)])
    }

    /// Uniform white light of unit irradiance.
    pub fn ambient_white() -> Self {
        Self {
            coefficients: vec![Vector3::repeat(1.0 / Y00)],
        }
    }

    /// Convert environment radiance coefficients into irradiance coefficients
    /// by applying a per-coefficient reflectance kernel.
    pub fn from_radiance(radiance: &[Vector3<f64>], kernel: &[f64]) -> Result<Self> {
        Error::check_len("SH kernel", radiance.len(), kernel.len())?;
        Self::new(
            radiance
                .iter()
                .zip(kernel)
                .map(|(c, k)| c * *k)
                .collect(),
        )
    }

    /// Per-basis RGB coefficients.
    pub fn coefficients(&self) -> &[Vector3<f64>] {
        &self.coefficients
    }

    /// Number of bands.
    pub fn bands(&self) -> usize {
        band_of(self.coefficients.len() - 1) + 1
    }

    /// Light reaching a surface with normal `n`.
    pub fn irradiance(&self, normal: &Vector3<f64>) -> Rgb {
        let basis = sh_basis(normal, self.coefficients.len());
        let sum = basis
            .iter()
            .zip(&self.coefficients)
            .fold(Vector3::zeros(), |acc, (y, c)| acc + c * *y);
        Rgb::new(sum.x, sum.y, sum.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Fibonacci sphere directions.
    fn directions(n: usize) -> Vec<Vector3<f64>> {
        let golden = PI * (3.0 - 5.0_f64.sqrt());
        (0..n)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
                let r = (1.0 - z * z).sqrt();
                let phi = golden * i as f64;
                Vector3::new(r * phi.cos(), r * phi.sin(), z)
            })
            .collect()
    }

    #[test]
    fn test_basis_is_orthonormal() {
        // Monte Carlo quadrature over a dense, uniform point set
        let dirs = directions(20000);
        let basis: Vec<Vec<f64>> = dirs.iter().map(|d| sh_basis(d, 16)).collect();
        let w = 4.0 * PI / dirs.len() as f64;
        for i in 0..16 {
            for j in 0..16 {
                let dot: f64 = basis.iter().map(|b| b[i] * b[j]).sum::<f64>() * w;
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (dot - expected).abs() < 1e-2,
                    "<Y{}, Y{}> = {}, expected {}",
                    i,
                    j,
                    dot,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_bands_for() {
        assert_eq!(bands_for(1).unwrap(), 1);
        assert_eq!(bands_for(9).unwrap(), 3);
        assert!(matches!(bands_for(5), Err(Error::UnsupportedBandCount(5))));
        assert!(bands_for(25).is_err());
    }

    #[test]
    fn test_ambient_white_is_unit() {
        let light = SphericalHarmonicsLight::ambient_white();
        let e = light.irradiance(&Vector3::new(0.3, -0.5, 0.2));
        assert!((e.r - 1.0).abs() < 1e-12 && (e.b - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lambert_kernel_per_band() {
        let k = lambert_kernel(3);
        assert_eq!(k.len(), 9);
        assert_eq!(k[0], 1.0);
        assert!(k[1..4].iter().all(|&v| (v - 2.0 / 3.0).abs() < 1e-15));
        assert!(k[4..9].iter().all(|&v| v == 0.25));
    }

    #[test]
    fn test_new_rejects_non_square_count() {
        assert!(SphericalHarmonicsLight::new(vec![Vector3::zeros(); 3]).is_err());
    }
}
