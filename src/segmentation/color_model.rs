//! Per-label color likelihood models.

use std::f64::consts::PI;

use crate::color::Rgb;

/// Likelihood of a pixel color under one label.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorDistribution {
    /// Axis-aligned Gaussian in RGB.
    Gaussian {
        /// Per-channel mean.
        mean: Rgb,
        /// Per-channel standard deviation (positive).
        stddev: Rgb,
    },
    /// Constant density over the unit color cube.
    Uniform,
}

impl ColorDistribution {
    /// Log-density of `color`.
    pub fn log_likelihood(&self, color: Rgb) -> f64 {
        match self {
            ColorDistribution::Gaussian { mean, stddev } => {
                let half_log_2pi = 0.5 * (2.0 * PI).ln();
                (0..3)
                    .map(|c| {
                        let s = stddev.channel(c);
                        let z = (color.channel(c) - mean.channel(c)) / s;
                        -0.5 * z * z - s.ln() - half_log_2pi
                    })
                    .sum()
            }
            ColorDistribution::Uniform => 0.0,
        }
    }

    /// Weighted maximum-likelihood Gaussian.
    ///
    /// Sums run in pixel order. Returns [`ColorDistribution::Uniform`] when the
    /// total weight is zero. Standard deviations are floored at `min_stddev`.
    pub fn fit_weighted(
        colors: &[Rgb],
        weights: impl Iterator<Item = f64> + Clone,
        min_stddev: f64,
    ) -> Self {
        let mut total = 0.0;
        let mut sum = Rgb::BLACK;
        for (c, w) in colors.iter().zip(weights.clone()) {
            total += w;
            sum += *c * w;
        }
        if !(total > 0.0) {
            return ColorDistribution::Uniform;
        }
        let mean = sum / total;
        let mut var = Rgb::BLACK;
        for (c, w) in colors.iter().zip(weights) {
            let d = *c - mean;
            var += Rgb::new(d.r * d.r, d.g * d.g, d.b * d.b) * w;
        }
        let stddev = (var / total).map(|v| v.sqrt().max(min_stddev));
        ColorDistribution::Gaussian { mean, stddev }
    }

    /// Unweighted Gaussian over the pixels whose label equals `label`.
    pub fn fit_label(colors: &[Rgb], labels: &[usize], label: usize, min_stddev: f64) -> Self {
        Self::fit_weighted(
            colors,
            labels.iter().map(move |&l| if l == label { 1.0 } else { 0.0 }),
            min_stddev,
        )
    }
}
