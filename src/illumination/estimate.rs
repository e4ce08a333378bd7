//! Illumination estimation from a rendered correspondence and a target image.
//!
//! Every covered pixel of the correspondence image contributes one
//! [`IlluminatedPoint`]: the surface normal in the illumination frame, the
//! model albedo, and the target color with the sensor color transform undone.
//! The directional light is assumed to be off.

use log::{debug, warn};

use super::sh::{lambert_kernel, unit_kernel, SphericalHarmonicsLight, MAX_BANDS};
use super::solver::{solve_sh_system_deconvolve, IlluminatedPoint};
use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::pixel::PixelImage;
use crate::render::{CorrespondenceImage, RenderParameter, Shader};

/// Options for illumination estimation.
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    /// Number of SH bands to estimate (default: 3).
    pub bands: usize,

    /// Solve for environment radiance against the Lambertian kernel instead of
    /// for irradiance directly (default: true). The resulting light is the same
    /// for bands 0-2; band 3 is not observable through a Lambertian surface and
    /// comes out as zero.
    pub lambertian: bool,

    /// Use every `stride`-th covered pixel (default: 1).
    pub stride: usize,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            bands: 3,
            lambertian: true,
            stride: 1,
        }
    }
}

impl EstimateOptions {
    /// Set the number of bands.
    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    /// Choose between the Lambertian and the unit kernel.
    pub fn with_lambertian(mut self, lambertian: bool) -> Self {
        self.lambertian = lambertian;
        self
    }

    /// Set the pixel stride (at least 1).
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.bands == 0 || self.bands > MAX_BANDS {
            return Err(Error::UnsupportedBandCount(self.bands * self.bands));
        }
        Ok(())
    }
}

/// Estimates SH environment lights.
#[derive(Debug, Clone, Default)]
pub struct IlluminationEstimator {
    options: EstimateOptions,
}

impl IlluminationEstimator {
    /// Create an estimator.
    pub fn new(options: EstimateOptions) -> Self {
        Self { options }
    }

    /// The options in use.
    pub fn options(&self) -> &EstimateOptions {
        &self.options
    }

    /// Collect the observations of all covered pixels.
    pub fn collect_points(
        &self,
        parameter: &RenderParameter,
        correspondence: &CorrespondenceImage,
        target: &PixelImage<Rgb>,
    ) -> Result<Vec<IlluminatedPoint>> {
        correspondence.check_same_size(target)?;
        let shader = Shader::new(parameter)?;
        let color_transform = &parameter.color_transform;
        Ok(correspondence
            .as_slice()
            .iter()
            .zip(target.as_slice())
            .filter_map(|(fragment, color)| fragment.as_ref().map(|f| (f, color)))
            .step_by(self.options.stride.max(1))
            .map(|(f, color)| IlluminatedPoint {
                normal: shader.illumination_normal(f),
                radiance: color_transform.invert(*color),
                albedo: shader.albedo_value(f),
            })
            .collect())
    }

    /// Estimate the light that best explains `target`.
    ///
    /// Fails with [`Error::EmptyPointSet`] if no pixel is covered.
    pub fn estimate(
        &self,
        parameter: &RenderParameter,
        correspondence: &CorrespondenceImage,
        target: &PixelImage<Rgb>,
    ) -> Result<SphericalHarmonicsLight> {
        self.options.validate()?;
        let points = self.collect_points(parameter, correspondence, target)?;
        let kernel = if self.options.lambertian {
            lambert_kernel(self.options.bands)
        } else {
            unit_kernel(self.options.bands)
        };
        let radiance = solve_sh_system_deconvolve(&points, &kernel)?;
        debug!(
            "estimated {}-band illumination from {} points",
            self.options.bands,
            points.len()
        );
        SphericalHarmonicsLight::from_radiance(&radiance, &kernel)
    }

    /// Like [`estimate`](Self::estimate), but keep `previous` when no pixel is
    /// covered.
    pub fn estimate_or(
        &self,
        parameter: &RenderParameter,
        correspondence: &CorrespondenceImage,
        target: &PixelImage<Rgb>,
        previous: &SphericalHarmonicsLight,
    ) -> Result<SphericalHarmonicsLight> {
        match self.estimate(parameter, correspondence, target) {
            Err(Error::EmptyPointSet) => {
                warn!("no visible surface for illumination estimation, keeping previous light");
                Ok(previous.clone())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ColorNormalMesh, TriangleMesh};
    use crate::render::{Camera, ImageSize, ParametricRenderer, Pose, ViewParameter};
    use nalgebra::Vector3;

    fn renderer() -> ParametricRenderer<ColorNormalMesh> {
        let shape = TriangleMesh::uv_sphere(1.0, 16, 32).unwrap();
        let colors = shape
            .points()
            .iter()
            .map(|p| Rgb::new(0.6 + 0.2 * p.x, 0.5, 0.4 + 0.1 * p.y))
            .collect();
        ParametricRenderer::new(ColorNormalMesh::with_vertex_colors(shape, colors).unwrap())
    }

    fn light() -> SphericalHarmonicsLight {
        let mut c = vec![Vector3::zeros(); 9];
        c[0] = Vector3::new(3.0, 2.8, 2.5);
        c[1] = Vector3::new(0.2, 0.1, -0.1);
        c[2] = Vector3::new(0.4, 0.3, 0.2);
        c[3] = Vector3::new(-0.3, 0.1, 0.0);
        c[6] = Vector3::new(0.1, 0.05, 0.1);
        SphericalHarmonicsLight::new(c).unwrap()
    }

    fn parameter() -> RenderParameter {
        RenderParameter::default()
            .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 5.0)))
            .with_camera(Camera::default().with_clipping(0.5, 50.0))
            .with_pose(Pose::default().with_yaw(0.4))
            .with_image_size(ImageSize::new(64, 64))
            .with_environment(light())
    }

    fn target(r: &ParametricRenderer<ColorNormalMesh>, p: &RenderParameter) -> PixelImage<Rgb> {
        r.render_image(p).unwrap().map(|c| c.rgb())
    }

    #[test]
    fn test_recovers_rendering_light() {
        let r = renderer();
        let p = parameter();
        let image = target(&r, &p);
        let correspondence = r.render_correspondence(&p).unwrap();
        for lambertian in [false, true] {
            let estimator =
                IlluminationEstimator::new(EstimateOptions::default().with_lambertian(lambertian));
            let estimated = estimator.estimate(&p, &correspondence, &image).unwrap();
            for (e, t) in estimated.coefficients().iter().zip(light().coefficients()) {
                assert!((e - t).norm() < 1e-6, "lambertian={}: {:?} vs {:?}", lambertian, e, t);
            }
        }
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let r = renderer();
        let p = parameter();
        let correspondence = r.render_correspondence(&p).unwrap();
        let wrong = PixelImage::new(10, 10, Rgb::BLACK);
        assert!(matches!(
            IlluminationEstimator::default().estimate(&p, &correspondence, &wrong),
            Err(Error::ImageSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_coverage_keeps_previous() {
        let r = renderer();
        // Model behind the camera
        let p = parameter().with_view(ViewParameter::at(Vector3::new(0.0, 0.0, -5.0)));
        let correspondence = r.render_correspondence(&p).unwrap();
        assert!(correspondence.as_slice().iter().all(Option::is_none));
        let image = PixelImage::new(64, 64, Rgb::gray(0.5));
        let estimator = IlluminationEstimator::default();
        assert!(matches!(
            estimator.estimate(&p, &correspondence, &image),
            Err(Error::EmptyPointSet)
        ));
        let previous = SphericalHarmonicsLight::ambient_white();
        let kept = estimator
            .estimate_or(&p, &correspondence, &image, &previous)
            .unwrap();
        assert_eq!(kept, previous);
    }
}
