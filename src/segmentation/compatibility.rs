//! Pairwise label compatibilities of neighbouring pixels.

use std::fmt::Debug;

use crate::error::{Error, Result};

/// Joint weight of label pairs on neighbouring pixels.
///
/// Weights need not be normalized; messages are normalized after
/// marginalization.
pub trait Compatibility: Debug + Send + Sync {
    /// Number of labels.
    fn num_labels(&self) -> usize;

    /// Weight of `a` at the sender next to `b` at the receiver.
    fn weight(&self, a: usize, b: usize) -> f64;

    /// `out[b] = Σ_a message[a] · weight(a, b)`.
    fn marginalize(&self, message: &[f64], out: &mut [f64]) {
        for (b, o) in out.iter_mut().enumerate() {
            *o = message
                .iter()
                .enumerate()
                .map(|(a, m)| m * self.weight(a, b))
                .sum();
        }
    }
}

/// Potts model: equal labels have weight `p_equal`, every other pair shares
/// `1 - p_equal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Potts {
    num_labels: usize,
    p_equal: f64,
    p_other: f64,
}

impl Potts {
    /// Create a Potts compatibility for at least two labels.
    pub fn new(num_labels: usize, p_equal: f64) -> Result<Self> {
        if num_labels < 2 {
            return Err(Error::invalid_param("num_labels", num_labels, "need at least 2 labels"));
        }
        if !(p_equal > 0.0 && p_equal <= 1.0) {
            return Err(Error::invalid_param("p_equal", p_equal, "must be in (0, 1]"));
        }
        Ok(Self {
            num_labels,
            p_equal,
            p_other: (1.0 - p_equal) / (num_labels - 1) as f64,
        })
    }

    /// Weight of equal labels.
    pub fn p_equal(&self) -> f64 {
        self.p_equal
    }
}

impl Compatibility for Potts {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn weight(&self, a: usize, b: usize) -> f64 {
        if a == b {
            self.p_equal
        } else {
            self.p_other
        }
    }

    // O(L) instead of O(L²)
    fn marginalize(&self, message: &[f64], out: &mut [f64]) {
        let total: f64 = message.iter().sum();
        for (o, m) in out.iter_mut().zip(message) {
            *o = self.p_equal * m + self.p_other * (total - m);
        }
    }
}

/// A dense `L × L` weight table, row = sender label.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityMatrix {
    num_labels: usize,
    weights: Vec<f64>,
}

impl CompatibilityMatrix {
    /// Create from row-major weights.
    pub fn new(num_labels: usize, weights: Vec<f64>) -> Result<Self> {
        Error::check_len("compatibility matrix", num_labels * num_labels, weights.len())?;
        if let Some(w) = weights.iter().find(|w| !(**w >= 0.0 && w.is_finite())) {
            return Err(Error::invalid_param(
                "compatibility weight",
                w,
                "must be finite and non-negative",
            ));
        }
        Ok(Self {
            num_labels,
            weights,
        })
    }
}

impl Compatibility for CompatibilityMatrix {
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn weight(&self, a: usize, b: usize) -> f64 {
        self.weights[a * self.num_labels + b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_potts_fast_path_matches_dense() {
        let potts = Potts::new(4, 0.7).unwrap();
        let dense = CompatibilityMatrix::new(
            4,
            (0..16)
                .map(|i| potts.weight(i / 4, i % 4))
                .collect(),
        )
        .unwrap();
        let message = [0.1, 0.5, 0.15, 0.25];
        let mut fast = [0.0; 4];
        let mut slow = [0.0; 4];
        potts.marginalize(&message, &mut fast);
        dense.marginalize(&message, &mut slow);
        for (f, s) in fast.iter().zip(&slow) {
            assert!((f - s).abs() < 1e-15);
        }
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(Potts::new(1, 0.9).is_err());
        assert!(Potts::new(2, 0.0).is_err());
        assert!(Potts::new(2, 1.5).is_err());
        assert!(CompatibilityMatrix::new(2, vec![1.0; 3]).is_err());
        assert!(CompatibilityMatrix::new(2, vec![1.0, -1.0, 1.0, 1.0]).is_err());
    }
}
