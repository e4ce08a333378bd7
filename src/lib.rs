//! # facesynth
//!
//! Analysis-by-synthesis building blocks for morphable face models.
//!
//! facesynth renders parametric face model instances, segments images into
//! labels with loopy belief propagation, and recovers spherical harmonics
//! illumination from observed images.
//!
//! ## Features
//!
//! - **Rendering**: z-buffered triangle rasterization with perspective-correct
//!   interpolation, correspondence images, albedo/illumination/depth/normal
//!   maps and supersampling
//! - **Shading**: spherical harmonics environment light plus a Phong
//!   directional light and a sensor color transform
//! - **Segmentation**: 4-connected loopy belief propagation with per-label
//!   color models and optional region priors
//! - **Illumination**: least-squares spherical harmonics estimation from a
//!   rendered correspondence image and a target photo
//!
//! ## Quick Start
//!
//! ```
//! use facesynth::prelude::*;
//! use nalgebra::Vector3;
//!
//! // A gray sphere
//! let shape = TriangleMesh::uv_sphere(2.0, 12, 24).unwrap();
//! let colors = vec![Rgb::gray(0.6); shape.num_points()];
//! let mesh = ColorNormalMesh::with_vertex_colors(shape, colors).unwrap();
//!
//! let renderer = ParametricRenderer::new(mesh);
//! let parameter = RenderParameter::default()
//!     .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 20.0)))
//!     .with_image_size(ImageSize::new(64, 64));
//!
//! let image = renderer.render_image(&parameter).unwrap();
//! assert!(image.get(32, 32).a > 0.99);
//! assert_eq!(image.get(0, 0).a, 0.0);
//! ```
//!
//! ## Segmentation
//!
//! ```
//! use facesynth::prelude::*;
//!
//! let image = PixelImage::from_fn(12, 12, |x, _| {
//!     if x < 6 { Rgb::new(0.9, 0.1, 0.1) } else { Rgb::new(0.1, 0.1, 0.9) }
//! });
//! let initial = PixelImage::from_fn(12, 12, |x, _| usize::from(x >= 3));
//!
//! let segmenter = LabelSegmenter::new(Potts::new(2, 0.9).unwrap(), LbpOptions::default()).unwrap();
//! let result = segmenter.segment(&image, &initial, None).unwrap();
//! assert_eq!(*result.labels.get(4, 5), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod color;
pub mod error;
pub mod illumination;
pub mod interpolate;
pub mod mesh;
pub mod model;
pub mod pixel;
pub mod render;
pub mod segmentation;

/// Prelude module for convenient imports.
///
/// ```
/// use facesynth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::color::{Rgb, Rgba};
    pub use crate::error::{Error, Result};
    pub use crate::illumination::{IlluminationEstimator, SphericalHarmonicsLight};
    pub use crate::mesh::{BarycentricCoordinates, ColorNormalMesh, PointId, TriangleId, TriangleMesh};
    pub use crate::model::{LinearMorphableModel, ModelCoefficients, MorphableModel};
    pub use crate::pixel::PixelImage;
    pub use crate::render::{
        Camera, ImageRenderer, ImageSize, Illumination, ParametricRenderer, Pose,
        RenderParameter, ViewParameter,
    };
    pub use crate::segmentation::{LabelSegmenter, LbpOptions, Potts, RegionPriors};
}

pub use error::{Error, Result};

// Re-export nalgebra types for convenience
pub use nalgebra;
