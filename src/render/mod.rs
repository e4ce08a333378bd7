//! Rasterization, shading and parametric rendering.
//!
//! The pipeline runs model instance → pose/view/projection → rasterizer →
//! correspondence image → per-pixel shading. Each stage is a pure function of
//! its inputs.
//!
//! - [`raster`]: z-buffered barycentric rasterization
//! - [`correspondence`]: per-pixel visible surface points
//! - [`shader`]: shading and modality functions
//! - [`renderer`]: shaded images, maps and landmarks
//! - [`cache`]: LRU-memoized renderer

pub mod cache;
pub mod correspondence;
pub mod parameter;
pub mod raster;
pub mod renderer;
pub mod shader;

pub use cache::CachedRenderer;
pub use correspondence::{CorrespondenceImage, CorrespondenceRenderer, Fragment};
pub use parameter::{
    Camera, Illumination, ImageSize, Pose, RenderParameter, RenderTransform, ScreenVertex,
    ViewParameter,
};
pub use raster::{rasterize, rasterize_mesh, RasterOptions, RasterSample, ZBuffer};
pub use renderer::{ImageRenderer, ParametricRenderer, RenderOptions};
pub use shader::{ColorTransform, DirectionalLight, IlluminationFrame, Shader};
