//! Benchmarks for rendering, segmentation and illumination solving.

use criterion::{criterion_group, criterion_main, Criterion};
use facesynth::illumination::{lambert_kernel, sh_basis, solve_sh_system_deconvolve, IlluminatedPoint};
use facesynth::prelude::*;
use facesynth::render::{rasterize_mesh, RasterOptions, RenderOptions, RenderTransform};
use facesynth::segmentation::LbpOptions;
use nalgebra::Vector3;

fn sphere_renderer(rings: usize) -> ParametricRenderer<ColorNormalMesh> {
    let shape = TriangleMesh::uv_sphere(1.0, rings, 2 * rings).unwrap();
    let colors = vec![Rgb::new(0.8, 0.6, 0.5); shape.num_points()];
    ParametricRenderer::new(ColorNormalMesh::with_vertex_colors(shape, colors).unwrap())
}

fn parameter(size: usize) -> RenderParameter {
    RenderParameter::default()
        .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 12.0)))
        .with_image_size(ImageSize::new(size, size))
}

fn bench_rasterization(c: &mut Criterion) {
    let shape = TriangleMesh::uv_sphere(1.0, 64, 128).unwrap();
    let param = parameter(256);
    let transform = RenderTransform::new(&param).unwrap();

    c.bench_function("rasterize_sphere_256", |b| {
        b.iter(|| rasterize_mesh(&shape, &transform, param.image_size, &RasterOptions::default()))
    });
}

fn bench_rendering(c: &mut Criterion) {
    let param = parameter(256);
    let renderer = sphere_renderer(64);

    c.bench_function("render_image_256", |b| {
        b.iter(|| renderer.render_image(&param).unwrap())
    });

    let sequential = sphere_renderer(64).with_options(RenderOptions::default().sequential());
    c.bench_function("render_image_256_sequential", |b| {
        b.iter(|| sequential.render_image(&param).unwrap())
    });

    let supersampled =
        sphere_renderer(64).with_options(RenderOptions::default().with_supersampling(2));
    c.bench_function("render_image_256_ss2", |b| {
        b.iter(|| supersampled.render_image(&param).unwrap())
    });
}

fn bench_segmentation(c: &mut Criterion) {
    let image = PixelImage::from_fn(128, 128, |x, y| {
        let noise = ((x * 31 + y * 17) % 7) as f64 * 0.02;
        if (x as f64 - 64.0).hypot(y as f64 - 64.0) < 40.0 {
            Rgb::new(0.8 - noise, 0.5, 0.4)
        } else {
            Rgb::new(0.2, 0.3, 0.7 + noise)
        }
    });
    let initial = PixelImage::from_fn(128, 128, |x, _| usize::from(x >= 64));
    let segmenter =
        LabelSegmenter::new(Potts::new(2, 0.9).unwrap(), LbpOptions::default().with_iterations(5))
            .unwrap();

    c.bench_function("lbp_128x128_5_iterations", |b| {
        b.iter(|| segmenter.segment(&image, &initial, None).unwrap())
    });
}

fn bench_illumination(c: &mut Criterion) {
    let light = SphericalHarmonicsLight::ambient_white();
    let points: Vec<IlluminatedPoint> = (0..10_000)
        .map(|i| {
            let t = i as f64 * 0.618;
            let normal = Vector3::new(t.cos(), t.sin(), (i % 7) as f64 / 7.0 - 0.5).normalize();
            let albedo = Rgb::new(0.7, 0.5, 0.4);
            IlluminatedPoint {
                normal,
                radiance: albedo.modulate(light.irradiance(&normal)),
                albedo,
            }
        })
        .collect();
    let kernel = lambert_kernel(3);

    c.bench_function("sh_basis_9", |b| {
        b.iter(|| sh_basis(&Vector3::new(0.3, 0.4, 0.866), 9))
    });
    c.bench_function("solve_sh_10000_points", |b| {
        b.iter(|| solve_sh_system_deconvolve(&points, &kernel).unwrap())
    });
}

criterion_group!(
    benches,
    bench_rasterization,
    bench_rendering,
    bench_segmentation,
    bench_illumination
);
criterion_main!(benches);
