//! Barycentric triangle rasterization with a z-buffer.
//!
//! Triangles are scan-converted with edge functions over their screen-space
//! bounding box and tested at pixel centers.
//!
//! # Edge function
//!
//! For an edge from `u` to `v` and a sample `p`:
//!
//! ```text
//! E(p) = (p.x - u.x) * (v.y - u.y) - (p.y - u.y) * (v.x - u.x)
//! ```
//!
//! A front-facing triangle `(a, b, c)` has `E_ab(c) > 0`; its interior is where
//! all three edge functions are positive. The edge values, divided by their
//! sum, are the screen-space barycentric coordinates.
//!
//! # Fill rule
//!
//! Samples exactly on an edge belong to the triangle only if the edge is a
//! *top* edge (horizontal, interior below) or a *left* edge (interior to the
//! right). Two triangles sharing an edge traverse it in opposite directions,
//! so exactly one of them owns the samples on it.
//!
//! # Depth and ties
//!
//! Depth is NDC z, interpolated linearly in screen space. A sample is written
//! only if its depth is strictly smaller than the stored one, so on equal depth
//! the triangle submitted first keeps the pixel.
//!
//! Triangles with zero or negative projected area (collapsed or back-facing),
//! and triangles reaching in front of the near plane, produce no samples.

use log::trace;
use nalgebra::Point3;
use rayon::prelude::*;

use super::parameter::{ImageSize, RenderTransform, ScreenVertex};
use crate::mesh::{BarycentricCoordinates, TriangleId, TriangleMesh};
use crate::pixel::PixelImage;

/// Options for mesh rasterization.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Samples per pixel along each axis (1 = one sample at the pixel center).
    pub supersampling: usize,

    /// Whether to project vertices in parallel (default: true).
    pub parallel: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            supersampling: 1,
            parallel: true,
        }
    }
}

impl RasterOptions {
    /// Set the supersampling factor (at least 1).
    pub fn with_supersampling(mut self, factor: usize) -> Self {
        self.supersampling = factor.max(1);
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// The surface point visible at one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSample {
    /// Owning triangle (submission index).
    pub triangle: TriangleId,
    /// Perspective-correct barycentric coordinates.
    pub bcc: BarycentricCoordinates,
}

/// Depth buffer plus the owning sample of every pixel.
#[derive(Debug, Clone)]
pub struct ZBuffer {
    depth: PixelImage<f64>,
    samples: PixelImage<Option<RasterSample>>,
}

/// Edge function of `p` against the edge `u → v`.
#[inline]
fn edge(u: &Point3<f64>, v: &Point3<f64>, px: f64, py: f64) -> f64 {
    (px - u.x) * (v.y - u.y) - (py - u.y) * (v.x - u.x)
}

/// Whether `u → v` is a top or left edge of a front-facing triangle.
#[inline]
fn is_top_left(u: &Point3<f64>, v: &Point3<f64>) -> bool {
    let dx = v.x - u.x;
    let dy = v.y - u.y;
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

#[inline]
fn covers(e: f64, top_left: bool) -> bool {
    e > 0.0 || (e == 0.0 && top_left)
}

impl ZBuffer {
    /// An empty buffer: infinite depth, no samples.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            depth: PixelImage::new(width, height, f64::INFINITY),
            samples: PixelImage::new(width, height, None),
        }
    }

    /// Width in samples.
    pub fn width(&self) -> usize {
        self.depth.width()
    }

    /// Height in samples.
    pub fn height(&self) -> usize {
        self.depth.height()
    }

    /// Minimal depth per sample (`INFINITY` where nothing was drawn).
    pub fn depth(&self) -> &PixelImage<f64> {
        &self.depth
    }

    /// Owning sample per pixel.
    pub fn samples(&self) -> &PixelImage<Option<RasterSample>> {
        &self.samples
    }

    /// Consume the buffer and return the sample image.
    pub fn into_samples(self) -> PixelImage<Option<RasterSample>> {
        self.samples
    }

    /// Rasterize one triangle; returns the number of samples written.
    pub fn draw_triangle(&mut self, id: TriangleId, vertices: &[ScreenVertex; 3]) -> usize {
        let [va, vb, vc] = vertices;
        let (a, b, c) = (&va.position, &vb.position, &vc.position);

        if vertices.iter().any(|v| v.w <= 0.0 || v.position.z < -1.0) {
            return 0;
        }
        let area2 = edge(a, b, c.x, c.y);
        if !(area2 > 0.0) {
            return 0;
        }

        let (w, h) = (self.width(), self.height());
        if w == 0 || h == 0 {
            return 0;
        }
        let min_x = a.x.min(b.x).min(c.x);
        let max_x = a.x.max(b.x).max(c.x);
        let min_y = a.y.min(b.y).min(c.y);
        let max_y = a.y.max(b.y).max(c.y);
        // Pixel i has its center at i + 0.5
        let x0 = (min_x - 0.5).ceil().max(0.0);
        let x1 = (max_x - 0.5).floor().min(w as f64 - 1.0);
        let y0 = (min_y - 0.5).ceil().max(0.0);
        let y1 = (max_y - 0.5).floor().min(h as f64 - 1.0);
        if x0 > x1 || y0 > y1 {
            return 0;
        }

        let tl_bc = is_top_left(b, c);
        let tl_ca = is_top_left(c, a);
        let tl_ab = is_top_left(a, b);
        let inv_w = [1.0 / va.w, 1.0 / vb.w, 1.0 / vc.w];

        let mut written = 0;
        for py in (y0 as usize)..=(y1 as usize) {
            let cy = py as f64 + 0.5;
            for px in (x0 as usize)..=(x1 as usize) {
                let cx = px as f64 + 0.5;
                let e0 = edge(b, c, cx, cy);
                let e1 = edge(c, a, cx, cy);
                let e2 = edge(a, b, cx, cy);
                if !(covers(e0, tl_bc) && covers(e1, tl_ca) && covers(e2, tl_ab)) {
                    continue;
                }

                let l0 = e0 / area2;
                let l1 = e1 / area2;
                let l2 = e2 / area2;
                let z = l0 * a.z + l1 * b.z + l2 * c.z;
                if z > 1.0 || z >= *self.depth.get(px, py) {
                    continue;
                }

                let bcc = BarycentricCoordinates::normalized(
                    l0 * inv_w[0],
                    l1 * inv_w[1],
                    l2 * inv_w[2],
                );
                self.depth.set(px, py, z);
                self.samples.set(px, py, Some(RasterSample { triangle: id, bcc }));
                written += 1;
            }
        }
        written
    }
}

/// Rasterize screen-space triangles in submission order.
pub fn rasterize(triangles: &[[ScreenVertex; 3]], size: ImageSize) -> ZBuffer {
    let mut buffer = ZBuffer::new(size.width, size.height);
    let mut drawn = 0;
    let mut written = 0;
    for (i, tri) in triangles.iter().enumerate() {
        let n = buffer.draw_triangle(TriangleId::new(i), tri);
        if n > 0 {
            drawn += 1;
            written += n;
        }
    }
    trace!(
        "rasterized {}/{} triangles, {} samples written",
        drawn,
        triangles.len(),
        written
    );
    buffer
}

/// Project a mesh and rasterize it.
///
/// With supersampling factor `s` the buffer has `s·width × s·height` samples.
pub fn rasterize_mesh(
    mesh: &TriangleMesh,
    transform: &RenderTransform,
    size: ImageSize,
    options: &RasterOptions,
) -> ZBuffer {
    let factor = options.supersampling.max(1);
    let transform = transform.scaled(factor);
    let projected: Vec<ScreenVertex> = if options.parallel {
        mesh.points().par_iter().map(|p| transform.project(p)).collect()
    } else {
        mesh.points().iter().map(|p| transform.project(p)).collect()
    };
    let triangles: Vec<[ScreenVertex; 3]> = mesh
        .triangulation()
        .triangles()
        .map(|(_, [a, b, c])| [projected[a.index()], projected[b.index()], projected[c.index()]])
        .collect();
    rasterize(&triangles, size.scaled(factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::parameter::{Camera, RenderParameter, ViewParameter};
    use nalgebra::Vector3;

    fn sv(x: f64, y: f64, z: f64) -> ScreenVertex {
        ScreenVertex {
            position: Point3::new(x, y, z),
            w: 1.0,
        }
    }

    /// Front-facing in screen space (y down) means clockwise on screen.
    fn quad(z: f64) -> Vec<[ScreenVertex; 3]> {
        vec![
            [sv(0.0, 8.0, z), sv(8.0, 8.0, z), sv(8.0, 0.0, z)],
            [sv(0.0, 8.0, z), sv(8.0, 0.0, z), sv(0.0, 0.0, z)],
        ]
    }

    #[test]
    fn test_shared_edge_covered_exactly_once() {
        // The diagonal of the quad passes through pixel centers
        let tris = quad(0.0);
        let mut counts = PixelImage::new(8, 8, 0usize);
        for (i, tri) in tris.iter().enumerate() {
            let mut single = ZBuffer::new(8, 8);
            single.draw_triangle(TriangleId::new(i), tri);
            for (x, y, s) in single.samples().pixels() {
                if s.is_some() {
                    *counts.get_mut(x, y) += 1;
                }
            }
        }
        for (x, y, c) in counts.pixels() {
            assert_eq!(*c, 1, "pixel ({}, {}) covered {} times", x, y, c);
        }
    }

    #[test]
    fn test_back_facing_and_degenerate_skipped() {
        let mut buf = ZBuffer::new(8, 8);
        let back = [sv(0.0, 8.0, 0.0), sv(8.0, 0.0, 0.0), sv(8.0, 8.0, 0.0)];
        assert_eq!(buf.draw_triangle(TriangleId::new(0), &back), 0);
        let flat = [sv(0.0, 0.0, 0.0), sv(4.0, 4.0, 0.0), sv(8.0, 8.0, 0.0)];
        assert_eq!(buf.draw_triangle(TriangleId::new(1), &flat), 0);
        assert!(buf.samples().as_slice().iter().all(Option::is_none));
    }

    #[test]
    fn test_nearest_triangle_wins() {
        let mut tris = quad(0.5);
        tris.extend(quad(-0.5));
        let buf = rasterize(&tris, ImageSize::new(8, 8));
        for (_, _, s) in buf.samples().pixels() {
            let s = s.expect("pixel should be covered");
            assert!(s.triangle.index() >= 2, "far triangle claimed a pixel");
        }
        assert!(buf.depth().as_slice().iter().all(|&z| z == -0.5));
    }

    #[test]
    fn test_equal_depth_first_submitted_wins() {
        let mut tris = quad(0.0);
        tris.extend(quad(0.0));
        let buf = rasterize(&tris, ImageSize::new(8, 8));
        for (_, _, s) in buf.samples().pixels() {
            assert!(s.unwrap().triangle.index() < 2);
        }
    }

    #[test]
    fn test_barycentric_coordinates_sum_to_one() {
        let tri = [[sv(1.3, 7.1, 0.0), sv(7.7, 6.2, 0.2), sv(3.1, 0.4, -0.3)]];
        let buf = rasterize(&tri, ImageSize::new(8, 8));
        let mut covered = 0;
        for (_, _, s) in buf.samples().pixels() {
            if let Some(s) = s {
                covered += 1;
                assert!((s.bcc.sum() - 1.0).abs() < 1e-6);
                assert!(s.bcc.is_inside(1e-9));
            }
        }
        assert!(covered > 10);
    }

    #[test]
    fn test_perspective_correct_bcc_reprojects_to_pixel_center() {
        let param = RenderParameter::default()
            .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 4.0)))
            .with_camera(Camera::default().with_clipping(0.1, 100.0))
            .with_image_size(ImageSize::new(40, 40));
        let transform = param.transform().unwrap();
        // A plane strongly tilted away from the camera
        let mesh = TriangleMesh::grid(3, 1.0)
            .unwrap()
            .transform(|p| Point3::new(p.x, p.y, 0.8 * p.y));
        let buf = rasterize_mesh(&mesh, &transform, param.image_size, &RasterOptions::default());
        let mut covered = 0;
        for (x, y, s) in buf.samples().pixels() {
            if let Some(s) = s {
                covered += 1;
                let p = mesh.point_at(s.triangle, &s.bcc);
                let v = transform.project(&p);
                assert!((v.position.x - (x as f64 + 0.5)).abs() < 1e-6);
                assert!((v.position.y - (y as f64 + 0.5)).abs() < 1e-6);
            }
        }
        assert!(covered > 100, "only {} pixels covered", covered);
    }

    #[test]
    fn test_supersampling_scales_buffer() {
        let param = RenderParameter::default()
            .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 4.0)))
            .with_camera(Camera::default().with_clipping(0.1, 100.0))
            .with_image_size(ImageSize::new(10, 12));
        let mesh = TriangleMesh::grid(2, 1.0).unwrap();
        let options = RasterOptions::default().with_supersampling(3);
        let buf = rasterize_mesh(&mesh, &param.transform().unwrap(), param.image_size, &options);
        assert_eq!(buf.width(), 30);
        assert_eq!(buf.height(), 36);
    }
}
