//! Parametric rendering of morphable model instances.
//!
//! [`ParametricRenderer`] turns a [`RenderParameter`] into images. Every image
//! product is a pure per-pixel map over the correspondence image; background
//! pixels receive the configured clear value.

use std::sync::Arc;

use nalgebra::{Point2, Vector3};

use super::correspondence::{CorrespondenceImage, CorrespondenceRenderer, Fragment};
use super::parameter::RenderParameter;
use super::raster::RasterOptions;
use super::shader::Shader;
use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::mesh::PointId;
use crate::model::MorphableModel;
use crate::pixel::PixelImage;

/// Options for [`ParametricRenderer`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Samples per pixel along each axis for color images (default: 1).
    pub supersampling: usize,

    /// Color of background pixels (default: transparent black).
    pub clear_color: Rgba,

    /// Whether to render and shade in parallel (default: true).
    pub parallel: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            supersampling: 1,
            clear_color: Rgba::TRANSPARENT,
            parallel: true,
        }
    }
}

impl RenderOptions {
    /// Set the supersampling factor (at least 1).
    pub fn with_supersampling(mut self, factor: usize) -> Self {
        self.supersampling = factor.max(1);
        self
    }

    /// Set the background color.
    pub fn with_clear_color(mut self, color: Rgba) -> Self {
        self.clear_color = color;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn raster(&self, supersampling: usize) -> RasterOptions {
        RasterOptions {
            supersampling,
            parallel: self.parallel,
        }
    }
}

/// Anything that renders a color image from parameters.
pub trait ImageRenderer: Send + Sync {
    /// Render the shaded image for `parameter`.
    fn render_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>>;
}

/// Renders shaded images and image products of a morphable model.
///
/// # Example
///
/// ```
/// use facesynth::color::Rgb;
/// use facesynth::mesh::{ColorNormalMesh, TriangleMesh};
/// use facesynth::render::{ImageSize, ParametricRenderer, RenderParameter, ViewParameter};
/// use nalgebra::Vector3;
///
/// let shape = TriangleMesh::uv_sphere(1.0, 8, 16).unwrap();
/// let colors = vec![Rgb::gray(0.5); shape.num_points()];
/// let mesh = ColorNormalMesh::with_vertex_colors(shape, colors).unwrap();
///
/// let renderer = ParametricRenderer::new(mesh);
/// let parameter = RenderParameter::default()
///     .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 20.0)))
///     .with_image_size(ImageSize::new(32, 32));
/// let image = renderer.render_image(&parameter).unwrap();
/// assert_eq!(image.width(), 32);
/// ```
#[derive(Debug)]
pub struct ParametricRenderer<M> {
    correspondence: CorrespondenceRenderer<M>,
    options: RenderOptions,
}

impl<M> Clone for ParametricRenderer<M> {
    fn clone(&self) -> Self {
        Self {
            correspondence: self.correspondence.clone(),
            options: self.options.clone(),
        }
    }
}

impl<M: MorphableModel> ParametricRenderer<M> {
    /// Create a renderer with default options.
    pub fn new(model: M) -> Self {
        Self::from_shared(Arc::new(model))
    }

    /// Create a renderer for a shared model.
    pub fn from_shared(model: Arc<M>) -> Self {
        Self {
            correspondence: CorrespondenceRenderer::from_shared(model),
            options: RenderOptions::default(),
        }
    }

    /// Set the options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// The options in use.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The rendered model.
    pub fn model(&self) -> &Arc<M> {
        self.correspondence.model()
    }

    /// Correspondence image at output resolution (one sample per pixel).
    pub fn render_correspondence(&self, parameter: &RenderParameter) -> Result<CorrespondenceImage> {
        self.correspondence
            .render_with(parameter, &self.options.raster(1))
    }

    /// Shaded color image.
    pub fn render_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>> {
        let shader = Shader::new(parameter)?;
        self.color_product(parameter, |f| shader.shade(f))
    }

    /// Albedo image, without any illumination or color transform.
    pub fn albedo_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>> {
        let shader = Shader::new(parameter)?;
        self.color_product(parameter, |f| shader.albedo_value(f).into())
    }

    /// Illumination image: shading of a white surface.
    pub fn illumination_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>> {
        let shader = Shader::new(parameter)?;
        self.color_product(parameter, |f| shader.illumination_value(f).into())
    }

    /// Distance from the eye along the viewing axis; `None` on background.
    pub fn depth_map(&self, parameter: &RenderParameter) -> Result<PixelImage<Option<f64>>> {
        let shader = Shader::new(parameter)?;
        let correspondence = self.render_correspondence(parameter)?;
        Ok(self.map(&correspondence, |f| f.as_ref().map(|f| shader.depth_value(f))))
    }

    /// Unit eye-space normals; `None` on background.
    pub fn normal_map(
        &self,
        parameter: &RenderParameter,
    ) -> Result<PixelImage<Option<Vector3<f64>>>> {
        let shader = Shader::new(parameter)?;
        let correspondence = self.render_correspondence(parameter)?;
        Ok(self.map(&correspondence, |f| f.as_ref().map(|f| shader.normal_value(f))))
    }

    /// Screen position of model points (landmarks) of the instance at
    /// `parameter`.
    pub fn project_landmarks(
        &self,
        parameter: &RenderParameter,
        landmarks: &[PointId],
    ) -> Result<Vec<Point2<f64>>> {
        let transform = parameter.transform()?;
        let instance = self.model().instance(&parameter.coefficients)?;
        let shape = instance.shape();
        landmarks
            .iter()
            .map(|&id| {
                if id.index() >= shape.num_points() {
                    return Err(Error::invalid_param(
                        "landmark",
                        id.index(),
                        "point index out of range",
                    ));
                }
                let v = transform.project(shape.position(id));
                Ok(Point2::new(v.position.x, v.position.y))
            })
            .collect()
    }

    /// Shade every fragment of the (possibly supersampled) correspondence
    /// image and box-filter back to output resolution.
    fn color_product(
        &self,
        parameter: &RenderParameter,
        f: impl Fn(&Fragment) -> Rgba + Sync,
    ) -> Result<PixelImage<Rgba>> {
        let factor = self.options.supersampling.max(1);
        let correspondence = self
            .correspondence
            .render_with(parameter, &self.options.raster(factor))?;
        let clear = self.options.clear_color;
        let samples = self.map(&correspondence, |frag| frag.as_ref().map_or(clear, &f));
        if factor == 1 {
            Ok(samples)
        } else {
            samples.downsample(factor)
        }
    }

    fn map<B: Send>(
        &self,
        correspondence: &CorrespondenceImage,
        f: impl Fn(&Option<Fragment>) -> B + Sync,
    ) -> PixelImage<B> {
        if self.options.parallel {
            correspondence.par_map(f)
        } else {
            correspondence.map(f)
        }
    }
}

impl<M: MorphableModel> ImageRenderer for ParametricRenderer<M> {
    fn render_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>> {
        ParametricRenderer::render_image(self, parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::mesh::{ColorNormalMesh, TriangleMesh};
    use crate::render::parameter::{Camera, ImageSize, Pose, ViewParameter};

    fn renderer() -> ParametricRenderer<ColorNormalMesh> {
        let shape = TriangleMesh::grid(4, 1.0).unwrap();
        let n = shape.num_points();
        let mesh = ColorNormalMesh::with_vertex_colors(shape, vec![Rgb::new(0.8, 0.5, 0.3); n])
            .unwrap();
        ParametricRenderer::new(mesh)
    }

    fn parameter() -> RenderParameter {
        RenderParameter::default()
            .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 4.0)))
            .with_camera(Camera::default().with_clipping(0.1, 100.0))
            .with_image_size(ImageSize::new(32, 32))
    }

    #[test]
    fn test_background_gets_clear_color() {
        let clear = Rgba::new(0.1, 0.2, 0.3, 1.0);
        let r = renderer().with_options(RenderOptions::default().with_clear_color(clear));
        let image = r.render_image(&parameter()).unwrap();
        assert_eq!(*image.get(0, 0), clear);
        let center = image.get(16, 16);
        assert!((center.rgb() - Rgb::new(0.8, 0.5, 0.3)).norm_squared() < 1e-20);
    }

    #[test]
    fn test_supersampling_keeps_size_and_blends_edges() {
        let r = renderer().with_options(RenderOptions::default().with_supersampling(4));
        // At 30 pixels the grid border falls inside a pixel
        let p = parameter().with_image_size(ImageSize::new(30, 30));
        let image = r.render_image(&p).unwrap();
        assert_eq!((image.width(), image.height()), (30, 30));
        let alphas: Vec<f64> = image.as_slice().iter().map(|c| c.a).collect();
        assert!(alphas.iter().any(|&a| a > 0.0 && a < 1.0), "no partial coverage");
        assert!(alphas.iter().all(|&a| (0.0..=1.0).contains(&a)));
    }

    #[test]
    fn test_depth_and_normal_maps() {
        let r = renderer();
        let depth = r.depth_map(&parameter()).unwrap();
        let normals = r.normal_map(&parameter()).unwrap();
        assert_eq!(*depth.get(0, 0), None);
        let d = depth.get(16, 16).expect("center covered");
        assert!((d - 4.0).abs() < 1e-9);
        let n = normals.get(16, 16).expect("center covered");
        assert!((n - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_albedo_ignores_light() {
        let r = renderer();
        let p = parameter().with_environment(
            crate::illumination::SphericalHarmonicsLight::zero(1).unwrap(),
        );
        assert_eq!(r.render_image(&p).unwrap().get(16, 16).rgb(), Rgb::BLACK);
        let albedo = r.albedo_image(&p).unwrap();
        assert!((albedo.get(16, 16).rgb() - Rgb::new(0.8, 0.5, 0.3)).norm_squared() < 1e-20);
    }

    #[test]
    fn test_landmark_projection() {
        let r = renderer();
        // Grid point 12 is the center of the 5 × 5 grid
        let lm = r.project_landmarks(&parameter(), &[PointId::new(12)]).unwrap();
        assert!((lm[0] - Point2::new(16.0, 16.0)).norm() < 1e-9);
        assert!(r.project_landmarks(&parameter(), &[PointId::new(99)]).is_err());
    }

    #[test]
    fn test_zero_pose_scaling_is_an_error() {
        let r = renderer();
        let p = parameter().with_pose(Pose::default().with_scaling(0.0));
        assert!(matches!(
            r.render_image(&p),
            Err(crate::error::Error::InvalidParameter { .. })
        ));
        assert!(r.render_correspondence(&p).is_err());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let a = renderer().render_image(&parameter()).unwrap();
        let b = renderer()
            .with_options(RenderOptions::default().sequential())
            .render_image(&parameter())
            .unwrap();
        assert_eq!(a, b);
    }
}
