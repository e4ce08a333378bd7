//! Morphable model interface.
//!
//! Renderers only need one query from a statistical face model: evaluate an
//! instance at given coefficients. [`MorphableModel`] captures that contract.
//! [`LinearMorphableModel`] is a minimal mean-plus-basis implementation; a
//! plain [`ColorNormalMesh`] acts as a model whose instance never changes.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Point3};

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::mesh::{ColorNormalMesh, TriangleList, TriangleMesh};

/// Coefficients selecting one model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCoefficients {
    /// Identity shape coefficients.
    pub shape: DVector<f64>,
    /// Albedo coefficients.
    pub color: DVector<f64>,
    /// Expression coefficients.
    pub expression: DVector<f64>,
}

impl ModelCoefficients {
    /// All-zero coefficients with the given dimensions (the model mean).
    pub fn zeros(shape: usize, color: usize, expression: usize) -> Self {
        Self {
            shape: DVector::zeros(shape),
            color: DVector::zeros(color),
            expression: DVector::zeros(expression),
        }
    }
}

impl Default for ModelCoefficients {
    fn default() -> Self {
        Self::zeros(0, 0, 0)
    }
}

/// A statistical model that can be evaluated at coefficients.
pub trait MorphableModel: Send + Sync {
    /// The mesh instance for `coefficients`.
    fn instance(&self, coefficients: &ModelCoefficients) -> Result<ColorNormalMesh>;
}

impl MorphableModel for ColorNormalMesh {
    fn instance(&self, _coefficients: &ModelCoefficients) -> Result<ColorNormalMesh> {
        Ok(self.clone())
    }
}

/// A linear subspace `mean + basis · α` over stacked 3D values.
#[derive(Debug, Clone)]
pub struct LinearBasis {
    mean: DVector<f64>,
    basis: DMatrix<f64>,
}

impl LinearBasis {
    /// Create a basis; `basis` has one column per coefficient.
    pub fn new(mean: DVector<f64>, basis: DMatrix<f64>) -> Result<Self> {
        Error::check_len("basis rows", mean.len(), basis.nrows())?;
        if mean.len() % 3 != 0 {
            return Err(Error::invalid_param(
                "mean",
                mean.len(),
                "length must be a multiple of 3",
            ));
        }
        Ok(Self { mean, basis })
    }

    /// A basis without variation around `mean`.
    pub fn constant(mean: DVector<f64>) -> Result<Self> {
        let rows = mean.len();
        Self::new(mean, DMatrix::zeros(rows, 0))
    }

    /// Number of coefficients.
    pub fn rank(&self) -> usize {
        self.basis.ncols()
    }

    /// Evaluate at `coefficients`; missing trailing coefficients are zero.
    fn evaluate(&self, what: &'static str, coefficients: &DVector<f64>) -> Result<DVector<f64>> {
        if coefficients.len() > self.rank() {
            return Err(Error::LengthMismatch {
                what,
                expected: self.rank(),
                actual: coefficients.len(),
            });
        }
        let used = self.basis.columns(0, coefficients.len());
        Ok(&self.mean + used * coefficients)
    }
}

/// A shape/color/expression model with linear bases over a fixed triangulation.
#[derive(Debug, Clone)]
pub struct LinearMorphableModel {
    triangulation: Arc<TriangleList>,
    shape: LinearBasis,
    color: LinearBasis,
    expression: LinearBasis,
}

impl LinearMorphableModel {
    /// Create a model. Every basis stacks `(x, y, z)` or `(r, g, b)` per point.
    pub fn new(
        triangulation: Arc<TriangleList>,
        shape: LinearBasis,
        color: LinearBasis,
        expression: LinearBasis,
    ) -> Result<Self> {
        let n = 3 * triangulation.num_points();
        Error::check_len("shape basis rows", n, shape.mean.len())?;
        Error::check_len("color basis rows", n, color.mean.len())?;
        Error::check_len("expression basis rows", n, expression.mean.len())?;
        Ok(Self {
            triangulation,
            shape,
            color,
            expression,
        })
    }

    /// A model with a single instance: `mesh` with `colors`.
    pub fn from_mesh(mesh: &TriangleMesh, colors: &[Rgb]) -> Result<Self> {
        Error::check_len("vertex colors", mesh.num_points(), colors.len())?;
        let shape = DVector::from_iterator(
            3 * mesh.num_points(),
            mesh.points().iter().flat_map(|p| [p.x, p.y, p.z]),
        );
        let color = DVector::from_iterator(
            3 * colors.len(),
            colors.iter().flat_map(|c| c.to_array()),
        );
        let zero = DVector::zeros(shape.len());
        Self::new(
            Arc::clone(mesh.triangulation()),
            LinearBasis::constant(shape)?,
            LinearBasis::constant(color)?,
            LinearBasis::constant(zero)?,
        )
    }

    /// The reference triangulation.
    pub fn triangulation(&self) -> &Arc<TriangleList> {
        &self.triangulation
    }

    /// Zero coefficients of the right dimensions.
    pub fn zero_coefficients(&self) -> ModelCoefficients {
        ModelCoefficients::zeros(self.shape.rank(), self.color.rank(), self.expression.rank())
    }
}

impl MorphableModel for LinearMorphableModel {
    fn instance(&self, coefficients: &ModelCoefficients) -> Result<ColorNormalMesh> {
        let shape = self.shape.evaluate("shape coefficients", &coefficients.shape)?;
        let expression = self
            .expression
            .evaluate("expression coefficients", &coefficients.expression)?;
        let color = self.color.evaluate("color coefficients", &coefficients.color)?;

        let positions = shape + expression;
        let points = positions
            .as_slice()
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();
        let colors = color
            .as_slice()
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();

        let mesh = TriangleMesh::new(points, Arc::clone(&self.triangulation))?;
        ColorNormalMesh::with_vertex_colors(mesh, colors)
    }
}
