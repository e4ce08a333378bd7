//! Spherical harmonics illumination.
//!
//! - [`sh`]: basis functions, kernels and the [`SphericalHarmonicsLight`] type
//! - [`solver`]: least-squares recovery of light coefficients from observations
//! - [`estimate`]: gathering observations from a rendered correspondence image

pub mod estimate;
pub mod sh;
pub mod solver;

pub use estimate::{EstimateOptions, IlluminationEstimator};
pub use sh::{lambert_kernel, sh_basis, unit_kernel, SphericalHarmonicsLight};
pub use solver::{solve_sh_system, solve_sh_system_deconvolve, IlluminatedPoint};
