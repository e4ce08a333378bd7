//! Error types for facesynth.
//!
//! Precondition violations (mismatched lengths, empty inputs, out-of-range
//! labels) are reported through [`Error`]. Absent per-pixel data such as
//! background pixels is not an error and is represented with `Option`.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rendering, segmentation and illumination solving.
#[derive(Error, Debug)]
pub enum Error {
    /// Two collections that must have the same length do not.
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        /// What was being compared.
        what: &'static str,
        /// The expected length.
        expected: usize,
        /// The actual length.
        actual: usize,
    },

    /// A surface property was declared on a different triangulation than the mesh.
    #[error("triangulation mismatch: {0}")]
    TriangulationMismatch(String),

    /// A triangle references a point that does not exist.
    #[error("triangle {triangle} references invalid point index {point}")]
    InvalidPointIndex {
        /// The triangle index.
        triangle: usize,
        /// The invalid point index.
        point: usize,
    },

    /// A label is outside `0..num_labels`.
    #[error("label {label} at pixel ({x}, {y}) is out of range for {num_labels} labels")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Number of labels.
        num_labels: usize,
        /// Pixel column.
        x: usize,
        /// Pixel row.
        y: usize,
    },

    /// Two images that must share a domain do not.
    #[error("image size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ImageSizeMismatch {
        /// Expected width.
        expected_width: usize,
        /// Expected height.
        expected_height: usize,
        /// Actual width.
        width: usize,
        /// Actual height.
        height: usize,
    },

    /// The spherical harmonics solver received no points.
    #[error("cannot solve for illumination without any illuminated points")]
    EmptyPointSet,

    /// A coefficient count that does not correspond to a full SH band count.
    #[error("unsupported spherical harmonics coefficient count {0} (expected 1, 4, 9 or 16)")]
    UnsupportedBandCount(usize),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// A numerical routine failed.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Check that `actual == expected`, reporting a [`Error::LengthMismatch`] otherwise.
    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::LengthMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}
