//! Correspondence images: which surface point is visible at each pixel.
//!
//! The correspondence image is the shared substrate of every image product.
//! Shaded images, depth, normal and albedo maps, and the illumination
//! estimator are all pure maps over it.

use std::fmt;
use std::sync::Arc;

use nalgebra::Point3;

use super::parameter::RenderParameter;
use super::raster::{rasterize_mesh, RasterOptions};
use crate::error::Result;
use crate::mesh::{BarycentricCoordinates, ColorNormalMesh, TriangleId};
use crate::model::MorphableModel;
use crate::pixel::PixelImage;

/// The surface point seen at one pixel.
#[derive(Clone)]
pub struct Fragment {
    /// Visible triangle.
    pub triangle: TriangleId,
    /// Perspective-correct barycentric coordinates inside `triangle`.
    pub bcc: BarycentricCoordinates,
    /// World-space position of the surface point.
    pub world_position: Point3<f64>,
    /// The model instance the triangle belongs to.
    pub mesh: Arc<ColorNormalMesh>,
}

/// Fragments compare by surface point and position; the owning mesh is
/// compared by identity or, failing that, by geometry.
impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.triangle == other.triangle
            && self.bcc == other.bcc
            && self.world_position == other.world_position
            && (Arc::ptr_eq(&self.mesh, &other.mesh) || self.mesh.shape() == other.mesh.shape())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("triangle", &self.triangle)
            .field("bcc", &self.bcc)
            .field("world_position", &self.world_position)
            .finish_non_exhaustive()
    }
}

/// Per-pixel visible fragment; `None` is background.
pub type CorrespondenceImage = PixelImage<Option<Fragment>>;

/// Renders correspondence images of a morphable model.
#[derive(Debug)]
pub struct CorrespondenceRenderer<M> {
    model: Arc<M>,
    options: RasterOptions,
}

impl<M> Clone for CorrespondenceRenderer<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            options: self.options.clone(),
        }
    }
}

impl<M: MorphableModel> CorrespondenceRenderer<M> {
    /// Create a renderer with default options (one sample per pixel).
    pub fn new(model: M) -> Self {
        Self::from_shared(Arc::new(model))
    }

    /// Create a renderer for a model shared with other renderers.
    pub fn from_shared(model: Arc<M>) -> Self {
        Self {
            model,
            options: RasterOptions::default(),
        }
    }

    /// Set the raster options.
    pub fn with_options(mut self, options: RasterOptions) -> Self {
        self.options = options;
        self
    }

    /// The rendered model.
    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// The raster options in use.
    pub fn options(&self) -> &RasterOptions {
        &self.options
    }

    /// Render with the configured options.
    ///
    /// With supersampling factor `s` the image has `s·w × s·h` samples.
    pub fn render(&self, parameter: &RenderParameter) -> Result<CorrespondenceImage> {
        self.render_with(parameter, &self.options)
    }

    /// Render with explicit raster options.
    pub fn render_with(
        &self,
        parameter: &RenderParameter,
        options: &RasterOptions,
    ) -> Result<CorrespondenceImage> {
        let transform = parameter.transform()?;
        let instance = Arc::new(self.model.instance(&parameter.coefficients)?);
        let samples = rasterize_mesh(instance.shape(), &transform, parameter.image_size, options)
            .into_samples();

        let to_fragment = |sample: &Option<super::raster::RasterSample>| {
            sample.map(|s| Fragment {
                triangle: s.triangle,
                bcc: s.bcc,
                world_position: transform.to_world(&instance.position_at(s.triangle, &s.bcc)),
                mesh: Arc::clone(&instance),
            })
        };
        Ok(if options.parallel {
            samples.par_map(to_fragment)
        } else {
            samples.map(to_fragment)
        })
    }
}
