//! Triangle meshes and surface properties.
//!
//! # Overview
//!
//! - [`TriangleMesh`]: immutable points plus a shared [`TriangleList`]
//! - [`BarycentricCoordinates`]: together with a [`TriangleId`] they address one
//!   surface point
//! - [`SurfaceProperty`]: values defined on the surface (colors, normals, UVs)
//! - [`ColorNormalMesh`]: shape + albedo + normals, the unit of rendering
//!
//! Index types ([`PointId`], [`TriangleId`]) are type-safe wrappers so points
//! and triangles cannot be confused.

mod color_normal;
mod index;
mod surface;
mod triangle_mesh;

pub use color_normal::ColorNormalMesh;
pub use index::{PointId, TriangleId};
pub use surface::{
    IndirectProperty, SurfaceProperty, TextureMappedProperty, TriangleProperty, VertexProperty,
};
pub use triangle_mesh::{BarycentricCoordinates, TriangleList, TriangleMesh};
