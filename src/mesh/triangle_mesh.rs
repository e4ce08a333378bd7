//! Triangle meshes and barycentric surface addressing.

use std::f64::consts::PI;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};

use super::index::{PointId, TriangleId};
use crate::error::{Error, Result};
use crate::interpolate::Interpolate;

/// Barycentric coordinates `(a, b, c)` of a point inside a triangle.
///
/// The weights sum to one. Inside the triangle all weights are non-negative;
/// points exactly on an edge may carry tiny negative values from rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarycentricCoordinates {
    /// Weight of the first triangle corner.
    pub a: f64,
    /// Weight of the second triangle corner.
    pub b: f64,
    /// Weight of the third triangle corner.
    pub c: f64,
}

impl BarycentricCoordinates {
    /// The first corner.
    pub const V0: Self = Self::new(1.0, 0.0, 0.0);
    /// The second corner.
    pub const V1: Self = Self::new(0.0, 1.0, 0.0);
    /// The third corner.
    pub const V2: Self = Self::new(0.0, 0.0, 1.0);
    /// The centroid.
    pub const CENTER: Self = Self::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);

    /// Create coordinates from raw weights (not normalized).
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Create coordinates from weights, scaling them to sum to one.
    pub fn normalized(a: f64, b: f64, c: f64) -> Self {
        let s = a + b + c;
        Self::new(a / s, b / s, c / s)
    }

    /// Weights as an array.
    #[inline]
    pub fn weights(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Sum of the weights (one for valid coordinates).
    #[inline]
    pub fn sum(&self) -> f64 {
        self.a + self.b + self.c
    }

    /// Whether all weights are at least `-tolerance`.
    #[inline]
    pub fn is_inside(&self, tolerance: f64) -> bool {
        self.a >= -tolerance && self.b >= -tolerance && self.c >= -tolerance
    }

    /// Interpolate three corner values with these weights.
    #[inline]
    pub fn interpolate<A: Interpolate>(&self, v0: &A, v1: &A, v2: &A) -> A {
        A::combine3(v0, v1, v2, self.weights())
    }
}

/// An immutable triangulation: ordered triples of point indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleList {
    triangles: Vec<[PointId; 3]>,
    num_points: usize,
}

impl TriangleList {
    /// Build a triangulation over `num_points` points.
    ///
    /// Fails with [`Error::InvalidPointIndex`] if any triangle references a
    /// point outside `0..num_points`.
    pub fn new(triangles: &[[usize; 3]], num_points: usize) -> Result<Self> {
        let mut list = Vec::with_capacity(triangles.len());
        for (ti, tri) in triangles.iter().enumerate() {
            for &p in tri {
                if p >= num_points {
                    return Err(Error::InvalidPointIndex {
                        triangle: ti,
                        point: p,
                    });
                }
            }
            list.push([PointId::new(tri[0]), PointId::new(tri[1]), PointId::new(tri[2])]);
        }
        Ok(Self {
            triangles: list,
            num_points,
        })
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of points the triangulation is defined over.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// The three points of a triangle.
    ///
    /// # Panics
    /// Panics if `t` is out of range.
    #[inline]
    pub fn triangle(&self, t: TriangleId) -> [PointId; 3] {
        self.triangles[t.index()]
    }

    /// Iterate over all triangle IDs.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> {
        (0..self.triangles.len()).map(TriangleId::new)
    }

    /// Iterate over all triangles.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleId, [PointId; 3])> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .map(|(i, t)| (TriangleId::new(i), *t))
    }
}

/// A triangle mesh: points plus a shared triangulation.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    points: Vec<Point3<f64>>,
    triangulation: Arc<TriangleList>,
}

impl TriangleMesh {
    /// Build a mesh from points and triangle index triples.
    ///
    /// # Example
    /// ```
    /// use facesynth::mesh::TriangleMesh;
    /// use nalgebra::Point3;
    ///
    /// let points = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    /// let mesh = TriangleMesh::from_triangles(points, &[[0, 1, 2]]).unwrap();
    /// assert_eq!(mesh.num_triangles(), 1);
    /// ```
    pub fn from_triangles(points: Vec<Point3<f64>>, triangles: &[[usize; 3]]) -> Result<Self> {
        let triangulation = Arc::new(TriangleList::new(triangles, points.len())?);
        Ok(Self {
            points,
            triangulation,
        })
    }

    /// Build a mesh on an existing triangulation.
    pub fn new(points: Vec<Point3<f64>>, triangulation: Arc<TriangleList>) -> Result<Self> {
        Error::check_len("mesh points", triangulation.num_points(), points.len())?;
        Ok(Self {
            points,
            triangulation,
        })
    }

    /// The triangulation.
    #[inline]
    pub fn triangulation(&self) -> &Arc<TriangleList> {
        &self.triangulation
    }

    /// Number of points.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangulation.num_triangles()
    }

    /// All points.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Position of a point.
    #[inline]
    pub fn position(&self, p: PointId) -> &Point3<f64> {
        &self.points[p.index()]
    }

    /// Positions of the three corners of a triangle.
    #[inline]
    pub fn triangle_positions(&self, t: TriangleId) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangulation.triangle(t);
        [self.points[a.index()], self.points[b.index()], self.points[c.index()]]
    }

    /// Surface point addressed by barycentric coordinates.
    pub fn point_at(&self, t: TriangleId, bcc: &BarycentricCoordinates) -> Point3<f64> {
        let [a, b, c] = self.triangle_positions(t);
        bcc.interpolate(&a, &b, &c)
    }

    /// Unit normal of a triangle (counter-clockwise winding).
    pub fn triangle_normal(&self, t: TriangleId) -> Vector3<f64> {
        let [p0, p1, p2] = self.triangle_positions(t);
        (p1 - p0).cross(&(p2 - p0)).normalize()
    }

    /// Area of a triangle.
    pub fn triangle_area(&self, t: TriangleId) -> f64 {
        let [p0, p1, p2] = self.triangle_positions(t);
        0.5 * (p1 - p0).cross(&(p2 - p0)).norm()
    }

    /// Area-weighted vertex normals.
    ///
    /// Points not used by any triangle get a zero normal.
    pub fn vertex_normals(&self) -> Vec<Vector3<f64>> {
        let mut normals = vec![Vector3::zeros(); self.points.len()];
        for (t, tri) in self.triangulation.triangles() {
            let [p0, p1, p2] = self.triangle_positions(t);
            let n = (p1 - p0).cross(&(p2 - p0)); // Area-weighted (not normalized)
            for p in tri {
                normals[p.index()] += n;
            }
        }
        for n in &mut normals {
            let len = n.norm();
            if len > 0.0 {
                *n /= len;
            }
        }
        normals
    }

    /// Axis-aligned bounding box, or `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.points {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }

    /// Apply `f` to every point, keeping the triangulation.
    pub fn transform(&self, f: impl Fn(&Point3<f64>) -> Point3<f64>) -> Self {
        Self {
            points: self.points.iter().map(f).collect(),
            triangulation: Arc::clone(&self.triangulation),
        }
    }

    /// A UV sphere with counter-clockwise (outward-facing) triangles.
    ///
    /// `rings` is the number of latitude bands and `segments` the number of
    /// longitude bands. Poles are single points.
    pub fn uv_sphere(radius: f64, rings: usize, segments: usize) -> Result<Self> {
        if rings < 2 {
            return Err(Error::invalid_param("rings", rings, "must be at least 2"));
        }
        if segments < 3 {
            return Err(Error::invalid_param("segments", segments, "must be at least 3"));
        }

        let mut points = Vec::with_capacity((rings - 1) * segments + 2);
        points.push(Point3::new(0.0, radius, 0.0));
        for r in 1..rings {
            let theta = PI * r as f64 / rings as f64;
            for s in 0..segments {
                let phi = 2.0 * PI * s as f64 / segments as f64;
                points.push(Point3::new(
                    radius * theta.sin() * phi.sin(),
                    radius * theta.cos(),
                    radius * theta.sin() * phi.cos(),
                ));
            }
        }
        let south = points.len();
        points.push(Point3::new(0.0, -radius, 0.0));

        let ring_start = |r: usize| 1 + (r - 1) * segments;
        let mut triangles = Vec::with_capacity(2 * rings * segments);
        for s in 0..segments {
            let s1 = (s + 1) % segments;
            triangles.push([0, ring_start(1) + s, ring_start(1) + s1]);
        }
        for r in 1..rings - 1 {
            for s in 0..segments {
                let s1 = (s + 1) % segments;
                let a = ring_start(r) + s;
                let b = ring_start(r) + s1;
                let c = ring_start(r + 1) + s;
                let d = ring_start(r + 1) + s1;
                triangles.push([a, c, d]);
                triangles.push([a, d, b]);
            }
        }
        for s in 0..segments {
            let s1 = (s + 1) % segments;
            triangles.push([ring_start(rings - 1) + s, south, ring_start(rings - 1) + s1]);
        }

        Self::from_triangles(points, &triangles)
    }

    /// A planar `n × n` quad grid in the z = 0 plane spanning `[-half, half]²`,
    /// split into counter-clockwise triangles facing +z.
    pub fn grid(n: usize, half: f64) -> Result<Self> {
        if n == 0 {
            return Err(Error::invalid_param("n", n, "must be positive"));
        }
        let mut points = Vec::with_capacity((n + 1) * (n + 1));
        for j in 0..=n {
            for i in 0..=n {
                points.push(Point3::new(
                    -half + 2.0 * half * i as f64 / n as f64,
                    -half + 2.0 * half * j as f64 / n as f64,
                    0.0,
                ));
            }
        }
        let mut triangles = Vec::with_capacity(2 * n * n);
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + (n + 1);
                let v11 = v01 + 1;
                triangles.push([v00, v10, v11]);
                triangles.push([v00, v11, v01]);
            }
        }
        Self::from_triangles(points, &triangles)
    }
}
