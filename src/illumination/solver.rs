//! Least-squares estimation of SH light coefficients.
//!
//! Every [`IlluminatedPoint`] contributes one equation per color channel:
//!
//! ```text
//! radiance_c = albedo_c · Σ_i kernel_i · Y_i(normal) · x_i,c
//! ```
//!
//! Stacking all points gives a block-diagonal system whose three channel
//! blocks are independent; each block is an `N × K` dense least-squares
//! problem solved by SVD (minimum-norm if under-determined).
//!
//! No regularization is applied. With few points, or normals clustered in a
//! small region of the sphere, the system is ill-conditioned and the recovered
//! light is unreliable; this is a property of the inverse problem.

use log::debug;
use nalgebra::{DMatrix, DVector, Vector3};
use rayon::prelude::*;

use super::sh::{bands_for, num_coefficients, sh_basis, unit_kernel};
use crate::color::Rgb;
use crate::error::{Error, Result};

/// Iteration cap of the SVD; non-convergence is reported as an error.
const MAX_SVD_ITERATIONS: usize = 1000;

/// One observation for the illumination solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IlluminatedPoint {
    /// Surface normal in the illumination frame.
    pub normal: Vector3<f64>,
    /// Observed radiance.
    pub radiance: Rgb,
    /// Surface albedo.
    pub albedo: Rgb,
}

/// Solve for SH coefficients against a per-coefficient deconvolution kernel.
///
/// Returns one RGB coefficient per kernel entry. Fails on an empty point set
/// and on kernel lengths that are not 1, 4, 9 or 16.
///
/// # Example
///
/// ```
/// use facesynth::color::Rgb;
/// use facesynth::illumination::{solve_sh_system_deconvolve, unit_kernel, IlluminatedPoint};
/// use nalgebra::Vector3;
///
/// let points: Vec<IlluminatedPoint> = [Vector3::x(), Vector3::y(), Vector3::z()]
///     .iter()
///     .map(|n| IlluminatedPoint { normal: *n, radiance: Rgb::gray(0.5), albedo: Rgb::WHITE })
///     .collect();
/// let coefficients = solve_sh_system_deconvolve(&points, &unit_kernel(1)).unwrap();
/// assert_eq!(coefficients.len(), 1);
/// ```
pub fn solve_sh_system_deconvolve(
    points: &[IlluminatedPoint],
    kernel: &[f64],
) -> Result<Vec<Vector3<f64>>> {
    if points.is_empty() {
        return Err(Error::EmptyPointSet);
    }
    let k = kernel.len();
    bands_for(k)?;
    points.iter().try_for_each(check_point)?;

    // Basis values weighted by the kernel, shared by all three channels
    let weighted_basis: Vec<Vec<f64>> = points
        .par_iter()
        .map(|p| {
            sh_basis(&p.normal, k)
                .into_iter()
                .zip(kernel)
                .map(|(y, w)| y * w)
                .collect()
        })
        .collect();

    let channels: Vec<DVector<f64>> = (0..3)
        .into_par_iter()
        .map(|c| solve_channel(points, &weighted_basis, c))
        .collect::<Result<_>>()?;

    debug!(
        "solved SH illumination: {} points, {} coefficients",
        points.len(),
        k
    );

    Ok((0..k)
        .map(|i| Vector3::new(channels[0][i], channels[1][i], channels[2][i]))
        .collect())
}

/// Solve with a unit kernel for `bands` bands.
pub fn solve_sh_system(points: &[IlluminatedPoint], bands: usize) -> Result<Vec<Vector3<f64>>> {
    if bands == 0 || num_coefficients(bands) > 16 {
        return Err(Error::UnsupportedBandCount(num_coefficients(bands)));
    }
    solve_sh_system_deconvolve(points, &unit_kernel(bands))
}

/// Reject points that would turn the system into NaNs.
fn check_point(point: &IlluminatedPoint) -> Result<()> {
    let norm = point.normal.norm();
    if !(norm.is_finite() && norm > 0.0) {
        return Err(Error::invalid_param(
            "illuminated point normal",
            format!("{:?}", point.normal),
            "must be finite and non-zero",
        ));
    }
    let finite = |c: Rgb| c.to_array().iter().all(|v| v.is_finite());
    if !finite(point.radiance) || !finite(point.albedo) {
        return Err(Error::invalid_param(
            "illuminated point color",
            format!("radiance={:?}, albedo={:?}", point.radiance, point.albedo),
            "must be finite",
        ));
    }
    Ok(())
}

/// Least-squares solve of one channel block.
fn solve_channel(
    points: &[IlluminatedPoint],
    weighted_basis: &[Vec<f64>],
    channel: usize,
) -> Result<DVector<f64>> {
    let n = points.len();
    let k = weighted_basis[0].len();
    let a = DMatrix::from_fn(n, k, |r, col| {
        points[r].albedo.channel(channel) * weighted_basis[r][col]
    });
    let b = DVector::from_fn(n, |r, _| points[r].radiance.channel(channel));

    least_squares(a, &b, channel, MAX_SVD_ITERATIONS)
}

/// Minimum-norm least-squares solution of `a · x = b` by SVD.
fn least_squares(
    a: DMatrix<f64>,
    b: &DVector<f64>,
    channel: usize,
    max_iterations: usize,
) -> Result<DVector<f64>> {
    let (n, k) = a.shape();
    let svd = a
        .try_svd(true, true, f64::EPSILON, max_iterations)
        .ok_or_else(|| {
            Error::Numerical(format!(
                "SVD of the {}x{} system for channel {} did not converge",
                n, k, channel
            ))
        })?;
    let sigma_max = svd.singular_values.max();
    let eps = f64::EPSILON * n.max(k) as f64 * sigma_max;
    svd.solve(b, eps).map_err(|e| Error::Numerical(e.to_string()))
}
