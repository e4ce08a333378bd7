//! Image segmentation with loopy belief propagation.
//!
//! - [`LabelDistribution`] / [`LogLabelDistribution`]: per-pixel label beliefs
//! - [`ColorDistribution`]: per-label color models
//! - [`Compatibility`], [`Potts`], [`CompatibilityMatrix`]: pairwise terms
//! - [`LabelSegmenter`]: the iterative segmentation
//! - [`RegionPriors`]: optional spatial label priors competing for the image

mod color_model;
mod compatibility;
mod distribution;
mod field;
mod lbp;
mod observer;
mod prior;

pub use color_model::ColorDistribution;
pub use compatibility::{Compatibility, CompatibilityMatrix, Potts};
pub use distribution::{LabelDistribution, LogLabelDistribution};
pub use lbp::{LabelSegmenter, LbpOptions, Segmentation};
pub use observer::{IterationObserver, IterationSnapshot};
pub use prior::{RegionPrior, RegionPriors};
