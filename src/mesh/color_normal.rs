//! Shape, color and normals bundled into one renderable surface.

use std::fmt;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};

use super::index::TriangleId;
use super::surface::{check_triangulation, SurfaceProperty, VertexProperty};
use super::triangle_mesh::{BarycentricCoordinates, TriangleMesh};
use crate::color::Rgb;
use crate::error::Result;

/// A triangle mesh with an attached albedo and normal field.
///
/// This is what a morphable model instance evaluates to and what the
/// renderers consume. Both properties are declared on the shape's
/// triangulation; this is checked once at construction.
#[derive(Clone)]
pub struct ColorNormalMesh {
    shape: TriangleMesh,
    color: Arc<dyn SurfaceProperty<Rgb>>,
    normals: Arc<dyn SurfaceProperty<Vector3<f64>>>,
}

impl ColorNormalMesh {
    /// Bundle a shape with color and normal properties.
    pub fn new(
        shape: TriangleMesh,
        color: Arc<dyn SurfaceProperty<Rgb>>,
        normals: Arc<dyn SurfaceProperty<Vector3<f64>>>,
    ) -> Result<Self> {
        check_triangulation("color property", color.as_ref(), shape.triangulation())?;
        check_triangulation("normal property", normals.as_ref(), shape.triangulation())?;
        Ok(Self {
            shape,
            color,
            normals,
        })
    }

    /// A mesh with per-vertex colors and smooth area-weighted vertex normals.
    pub fn with_vertex_colors(shape: TriangleMesh, colors: Vec<Rgb>) -> Result<Self> {
        let triangulation = Arc::clone(shape.triangulation());
        let color = VertexProperty::new(Arc::clone(&triangulation), colors)?;
        let normals = VertexProperty::new(triangulation, shape.vertex_normals())?;
        Self::new(shape, Arc::new(color), Arc::new(normals))
    }

    /// The geometry.
    #[inline]
    pub fn shape(&self) -> &TriangleMesh {
        &self.shape
    }

    /// Albedo at a surface point.
    #[inline]
    pub fn color_at(&self, t: TriangleId, bcc: &BarycentricCoordinates) -> Rgb {
        self.color.on_surface(t, bcc)
    }

    /// Unit normal at a surface point (model coordinates).
    #[inline]
    pub fn normal_at(&self, t: TriangleId, bcc: &BarycentricCoordinates) -> Vector3<f64> {
        let n = self.normals.on_surface(t, bcc);
        let len = n.norm();
        if len > 0.0 {
            n / len
        } else {
            self.shape.triangle_normal(t)
        }
    }

    /// Position at a surface point (model coordinates).
    #[inline]
    pub fn position_at(&self, t: TriangleId, bcc: &BarycentricCoordinates) -> Point3<f64> {
        self.shape.point_at(t, bcc)
    }
}

impl fmt::Debug for ColorNormalMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorNormalMesh")
            .field("points", &self.shape.num_points())
            .field("triangles", &self.shape.num_triangles())
            .finish_non_exhaustive()
    }
}
