//! facesynth CLI - render demo models, segment images and estimate light.
//!
//! Usage: facesynth <COMMAND> [OPTIONS]
//!
//! Run `facesynth --help` for available commands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use nalgebra::Vector3;

use facesynth::color::Rgb;
use facesynth::illumination::{EstimateOptions, IlluminationEstimator};
use facesynth::mesh::{ColorNormalMesh, TriangleMesh};
use facesynth::pixel::PixelImage;
use facesynth::render::{
    ImageSize, ParametricRenderer, Pose, RenderOptions, RenderParameter, ViewParameter,
};
use facesynth::segmentation::{LabelSegmenter, LbpOptions, Potts};

#[derive(Parser)]
#[command(name = "facesynth")]
#[command(author, version, about = "Face model rendering and analysis CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a demo model to a PNG image
    Render {
        /// Output PNG file
        output: PathBuf,

        /// Demo model
        #[arg(short, long, value_enum, default_value = "sphere")]
        model: DemoModel,

        /// What to render
        #[arg(short, long, value_enum, default_value = "image")]
        kind: RenderKind,

        /// Image width and height in pixels
        #[arg(short, long, default_value = "256")]
        size: usize,

        /// Rotation around the vertical axis in degrees
        #[arg(long, default_value = "0")]
        yaw: f64,

        /// Supersampling factor per axis
        #[arg(long, default_value = "1")]
        supersampling: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Segment an image into labels
    Segment {
        /// Input PNG file
        input: PathBuf,

        /// Output label PNG file (one gray level per label)
        output: PathBuf,

        /// Number of labels; initial labels are luminance bands
        #[arg(short, long, default_value = "2")]
        labels: usize,

        /// Number of iterations
        #[arg(short, long, default_value = "10")]
        iterations: usize,

        /// Potts weight of equal neighbouring labels
        #[arg(short, long, default_value = "0.9")]
        p_equal: f64,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Estimate spherical harmonics light from an image of the demo model
    EstimateLight {
        /// Input PNG file, rendered with the same view as `render`
        input: PathBuf,

        /// Demo model
        #[arg(short, long, value_enum, default_value = "sphere")]
        model: DemoModel,

        /// Rotation around the vertical axis in degrees
        #[arg(long, default_value = "0")]
        yaw: f64,

        /// Number of spherical harmonics bands
        #[arg(short, long, default_value = "3")]
        bands: usize,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DemoModel {
    /// Sphere with a vertical albedo gradient
    Sphere,
    /// Flat grid facing the camera
    Grid,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum RenderKind {
    /// Shaded color image
    Image,
    /// Albedo only
    Albedo,
    /// Illumination only
    Illumination,
    /// Eye-space depth, near is bright
    Depth,
    /// World normals mapped to colors
    Normals,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Render {
            output,
            model,
            kind,
            size,
            yaw,
            supersampling,
            sequential,
        } => {
            cmd_render(&output, model, kind, size, yaw, supersampling, sequential)?;
        }

        Commands::Segment {
            input,
            output,
            labels,
            iterations,
            p_equal,
            sequential,
        } => {
            cmd_segment(&input, &output, labels, iterations, p_equal, sequential)?;
        }

        Commands::EstimateLight {
            input,
            model,
            yaw,
            bands,
        } => {
            cmd_estimate_light(&input, model, yaw, bands)?;
        }
    }

    Ok(())
}

fn demo_mesh(model: DemoModel) -> facesynth::Result<ColorNormalMesh> {
    let shape = match model {
        DemoModel::Sphere => TriangleMesh::uv_sphere(1.0, 32, 64)?,
        DemoModel::Grid => TriangleMesh::grid(16, 1.0)?,
    };
    let colors = shape
        .points()
        .iter()
        .map(|p| {
            let t = 0.5 + 0.5 * p.y.clamp(-1.0, 1.0);
            Rgb::new(0.9 - 0.3 * t, 0.6, 0.4 + 0.4 * t)
        })
        .collect();
    ColorNormalMesh::with_vertex_colors(shape, colors)
}

fn demo_parameter(size: usize, yaw: f64) -> RenderParameter {
    RenderParameter::default()
        .with_pose(Pose::default().with_yaw(yaw.to_radians()))
        .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 14.0)))
        .with_image_size(ImageSize::new(size, size))
}

fn cmd_render(
    output: &Path,
    model: DemoModel,
    kind: RenderKind,
    size: usize,
    yaw: f64,
    supersampling: usize,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = demo_mesh(model)?;
    info!(
        "Model: {} points, {} triangles",
        mesh.shape().num_points(),
        mesh.shape().num_triangles()
    );

    let options = RenderOptions::default()
        .with_supersampling(supersampling)
        .with_parallel(!sequential);
    let renderer = ParametricRenderer::new(mesh).with_options(options);
    let parameter = demo_parameter(size, yaw);

    let start = Instant::now();
    let image = match kind {
        RenderKind::Image => renderer.render_image(&parameter)?.to_rgba_image(),
        RenderKind::Albedo => renderer.albedo_image(&parameter)?.to_rgba_image(),
        RenderKind::Illumination => renderer.illumination_image(&parameter)?.to_rgba_image(),
        RenderKind::Depth => {
            let depth = renderer.depth_map(&parameter)?;
            let (near, far) = depth
                .as_slice()
                .iter()
                .flatten()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &d| {
                    (lo.min(d), hi.max(d))
                });
            let range = (far - near).max(f64::EPSILON);
            depth
                .map(|d| match d {
                    Some(d) => Rgb::gray(1.0 - (d - near) / range).with_alpha(1.0),
                    None => Rgb::BLACK.with_alpha(0.0),
                })
                .to_rgba_image()
        }
        RenderKind::Normals => renderer
            .normal_map(&parameter)?
            .map(|n| match n {
                Some(n) => Rgb::new(0.5 + 0.5 * n.x, 0.5 + 0.5 * n.y, 0.5 + 0.5 * n.z)
                    .with_alpha(1.0),
                None => Rgb::BLACK.with_alpha(0.0),
            })
            .to_rgba_image(),
    };
    let elapsed = start.elapsed();

    image.save(output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_segment(
    input: &Path,
    output: &Path,
    labels: usize,
    iterations: usize,
    p_equal: f64,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let photo = PixelImage::from_rgb_image(&image::open(input)?.to_rgb8());
    println!("Loaded: {}x{} pixels", photo.width(), photo.height());

    // Luminance bands as the initial labelling
    let initial = photo.map(|c| {
        let luminance = (c.r + c.g + c.b) / 3.0;
        ((luminance * labels as f64) as usize).min(labels.saturating_sub(1))
    });

    let options = LbpOptions::default()
        .with_iterations(iterations)
        .with_parallel(!sequential);
    let segmenter = LabelSegmenter::new(Potts::new(labels, p_equal)?, options)?;

    let mode = if sequential { "sequential" } else { "parallel" };
    println!("Segmenting into {} labels ({} iterations, {})...", labels, iterations, mode);

    let start = Instant::now();
    let result = segmenter.segment(&photo, &initial, None)?;
    let elapsed = start.elapsed();

    let scale = 255.0 / (labels - 1) as f64;
    let out = image::GrayImage::from_fn(photo.width() as u32, photo.height() as u32, |x, y| {
        image::Luma([(*result.labels.get(x as usize, y as usize) as f64 * scale).round() as u8])
    });
    out.save(output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn cmd_estimate_light(
    input: &Path,
    model: DemoModel,
    yaw: f64,
    bands: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = PixelImage::from_rgb_image(&image::open(input)?.to_rgb8());
    if target.width() != target.height() {
        return Err(format!(
            "expected a square image, got {}x{}",
            target.width(),
            target.height()
        )
        .into());
    }

    let renderer = ParametricRenderer::new(demo_mesh(model)?);
    let parameter = demo_parameter(target.width(), yaw);
    let correspondence = renderer.render_correspondence(&parameter)?;

    let estimator = IlluminationEstimator::new(EstimateOptions::default().with_bands(bands));
    let start = Instant::now();
    let light = estimator.estimate(&parameter, &correspondence, &target)?;
    let elapsed = start.elapsed();

    println!("Estimated {}-band light ({:.2?}):", light.bands(), elapsed);
    for (i, c) in light.coefficients().iter().enumerate() {
        println!("  [{:2}] r={:+.4} g={:+.4} b={:+.4}", i, c.x, c.y, c.z);
    }

    Ok(())
}
