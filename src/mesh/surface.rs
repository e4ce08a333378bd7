//! Surface properties: values attached to a triangulated surface.
//!
//! A [`SurfaceProperty`] answers one question: what is the value at the
//! surface point `(triangle, barycentric coordinates)`? Concrete attachment
//! schemes implement the trait independently:
//!
//! - [`VertexProperty`]: one value per point, interpolated with the weights
//! - [`TriangleProperty`]: one constant value per triangle
//! - [`TextureMappedProperty`]: interpolated UV coordinates sampled into an image
//! - [`IndirectProperty`]: a per-triangle index selects among several properties
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use facesynth::mesh::{BarycentricCoordinates, SurfaceProperty, TriangleId, TriangleList, VertexProperty};
//!
//! let triangulation = Arc::new(TriangleList::new(&[[0, 1, 2]], 3).unwrap());
//! let heights = VertexProperty::new(triangulation, vec![0.0, 1.0, 2.0]).unwrap();
//!
//! let center = heights.on_surface(TriangleId::new(0), &BarycentricCoordinates::CENTER);
//! assert!((center - 1.0).abs() < 1e-12);
//! ```

use std::sync::Arc;

use nalgebra::Point2;

use super::index::TriangleId;
use super::triangle_mesh::{BarycentricCoordinates, TriangleList};
use crate::error::{Error, Result};
use crate::interpolate::Interpolate;
use crate::pixel::{AccessMode, PixelImage};

/// A value of type `A` defined everywhere on a triangulated surface.
pub trait SurfaceProperty<A>: Send + Sync {
    /// Evaluate at a surface point.
    ///
    /// # Panics
    /// Panics if `triangle` is outside the declared triangulation.
    fn on_surface(&self, triangle: TriangleId, bcc: &BarycentricCoordinates) -> A;

    /// The triangulation this property is declared on.
    fn triangulation(&self) -> &Arc<TriangleList>;
}

/// Check that a property lives on `expected`.
pub(crate) fn check_triangulation<A>(
    what: &str,
    property: &dyn SurfaceProperty<A>,
    expected: &Arc<TriangleList>,
) -> Result<()> {
    let actual = property.triangulation();
    if Arc::ptr_eq(actual, expected) || **actual == **expected {
        Ok(())
    } else {
        Err(Error::TriangulationMismatch(format!(
            "{} is declared on {} triangles over {} points, mesh has {} triangles over {} points",
            what,
            actual.num_triangles(),
            actual.num_points(),
            expected.num_triangles(),
            expected.num_points()
        )))
    }
}

/// One value per point, interpolated with barycentric weights.
#[derive(Debug, Clone)]
pub struct VertexProperty<A> {
    triangulation: Arc<TriangleList>,
    values: Vec<A>,
}

impl<A: Interpolate> VertexProperty<A> {
    /// Attach one value per point of `triangulation`.
    pub fn new(triangulation: Arc<TriangleList>, values: Vec<A>) -> Result<Self> {
        Error::check_len("vertex property values", triangulation.num_points(), values.len())?;
        Ok(Self {
            triangulation,
            values,
        })
    }

    /// The per-point values.
    pub fn values(&self) -> &[A] {
        &self.values
    }
}

impl<A: Interpolate> SurfaceProperty<A> for VertexProperty<A> {
    #[inline]
    fn on_surface(&self, triangle: TriangleId, bcc: &BarycentricCoordinates) -> A {
        let [a, b, c] = self.triangulation.triangle(triangle);
        bcc.interpolate(
            &self.values[a.index()],
            &self.values[b.index()],
            &self.values[c.index()],
        )
    }

    fn triangulation(&self) -> &Arc<TriangleList> {
        &self.triangulation
    }
}

/// One constant value per triangle.
#[derive(Debug, Clone)]
pub struct TriangleProperty<A> {
    triangulation: Arc<TriangleList>,
    values: Vec<A>,
}

impl<A: Clone + Send + Sync> TriangleProperty<A> {
    /// Attach one value per triangle of `triangulation`.
    pub fn new(triangulation: Arc<TriangleList>, values: Vec<A>) -> Result<Self> {
        Error::check_len(
            "triangle property values",
            triangulation.num_triangles(),
            values.len(),
        )?;
        Ok(Self {
            triangulation,
            values,
        })
    }
}

impl<A: Clone + Send + Sync> SurfaceProperty<A> for TriangleProperty<A> {
    #[inline]
    fn on_surface(&self, triangle: TriangleId, _bcc: &BarycentricCoordinates) -> A {
        self.values[triangle.index()].clone()
    }

    fn triangulation(&self) -> &Arc<TriangleList> {
        &self.triangulation
    }
}

/// A texture sampled at interpolated UV coordinates.
pub struct TextureMappedProperty<A> {
    uv: Arc<dyn SurfaceProperty<Point2<f64>>>,
    texture: Arc<PixelImage<A>>,
    mode: AccessMode,
}

impl<A: Interpolate> TextureMappedProperty<A> {
    /// Map `texture` onto the surface through the `uv` property.
    pub fn new(
        uv: Arc<dyn SurfaceProperty<Point2<f64>>>,
        texture: Arc<PixelImage<A>>,
        mode: AccessMode,
    ) -> Result<Self> {
        if texture.width() == 0 || texture.height() == 0 {
            return Err(Error::invalid_param(
                "texture",
                format!("{}x{}", texture.width(), texture.height()),
                "texture must not be empty",
            ));
        }
        Ok(Self { uv, texture, mode })
    }
}

impl<A: Interpolate> SurfaceProperty<A> for TextureMappedProperty<A> {
    fn on_surface(&self, triangle: TriangleId, bcc: &BarycentricCoordinates) -> A {
        let uv = self.uv.on_surface(triangle, bcc);
        self.texture.sample_uv(uv.x, uv.y, self.mode)
    }

    fn triangulation(&self) -> &Arc<TriangleList> {
        self.uv.triangulation()
    }
}

/// Per-triangle indirection into several underlying properties.
///
/// Used for multi-material surfaces: triangle `t` is evaluated by
/// `properties[index[t]]`.
pub struct IndirectProperty<A> {
    index: TriangleProperty<usize>,
    properties: Vec<Arc<dyn SurfaceProperty<A>>>,
}

impl<A> IndirectProperty<A> {
    /// Create an indirected property.
    ///
    /// Every index must select an existing property, and every property must be
    /// declared on the same triangulation as the index.
    pub fn new(
        index: TriangleProperty<usize>,
        properties: Vec<Arc<dyn SurfaceProperty<A>>>,
    ) -> Result<Self> {
        for (t, &i) in index.values.iter().enumerate() {
            if i >= properties.len() {
                return Err(Error::invalid_param(
                    "material index",
                    format!("{} at triangle {}", i, t),
                    "no property with this index",
                ));
            }
        }
        for p in &properties {
            check_triangulation("indirected property", p.as_ref(), &index.triangulation)?;
        }
        Ok(Self { index, properties })
    }
}

impl<A> SurfaceProperty<A> for IndirectProperty<A> {
    fn on_surface(&self, triangle: TriangleId, bcc: &BarycentricCoordinates) -> A {
        let i = self.index.values[triangle.index()];
        self.properties[i].on_surface(triangle, bcc)
    }

    fn triangulation(&self) -> &Arc<TriangleList> {
        &self.index.triangulation
    }
}
