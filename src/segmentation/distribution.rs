//! Categorical distributions over labels.
//!
//! [`LabelDistribution`] holds probabilities and is normalized by its sum.
//! [`LogLabelDistribution`] holds log-probabilities; products become sums and
//! normalization uses log-sum-exp, so long chains of products neither
//! underflow nor overflow.

use crate::error::{Error, Result};

/// Normalize `values` to sum one; an all-zero (or non-finite) input becomes
/// uniform.
pub(crate) fn normalize(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        let inv = 1.0 / sum;
        values.iter_mut().for_each(|v| *v *= inv);
    } else if !values.is_empty() {
        let u = 1.0 / values.len() as f64;
        values.iter_mut().for_each(|v| *v = u);
    }
}

/// Multiply `values` elementwise by `factor`, then normalize.
#[inline]
pub(crate) fn multiply_normalize(values: &mut [f64], factor: &[f64]) {
    values.iter_mut().zip(factor).for_each(|(v, f)| *v *= f);
    normalize(values);
}

/// Exponentiate log-weights relative to their maximum and normalize.
pub(crate) fn normalize_exp(logs: &mut [f64]) {
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() {
        logs.iter_mut().for_each(|v| *v = (*v - max).exp());
    } else {
        logs.iter_mut().for_each(|v| *v = 0.0);
    }
    normalize(logs);
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// A distribution over `len()` labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDistribution(Vec<f64>);

impl LabelDistribution {
    /// Wrap non-negative weights without normalizing them.
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if let Some(w) = weights.iter().find(|w| !(**w >= 0.0 && w.is_finite())) {
            return Err(Error::invalid_param(
                "label weight",
                w,
                "must be finite and non-negative",
            ));
        }
        Ok(Self(weights))
    }

    /// The uniform distribution over `num_labels` labels.
    pub fn uniform(num_labels: usize) -> Self {
        Self(vec![1.0 / num_labels as f64; num_labels])
    }

    pub(crate) fn from_normalized(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Weight of `label`.
    pub fn get(&self, label: usize) -> f64 {
        self.0[label]
    }

    /// All weights.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// A copy scaled to sum one; uniform if all weights are zero.
    pub fn normalized(&self) -> Self {
        let mut values = self.0.clone();
        normalize(&mut values);
        Self(values)
    }

    /// Normalized elementwise product.
    pub fn product(&self, other: &Self) -> Result<Self> {
        Error::check_len("label distribution", self.len(), other.len())?;
        let mut values = self.0.clone();
        multiply_normalize(&mut values, &other.0);
        Ok(Self(values))
    }

    /// The most probable label; ties go to the lowest label.
    pub fn map_label(&self) -> usize {
        argmax(&self.0)
    }
}

/// A distribution over labels in the log domain.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLabelDistribution(Vec<f64>);

impl LogLabelDistribution {
    /// Wrap log-weights.
    pub fn from_logs(logs: Vec<f64>) -> Self {
        Self(logs)
    }

    /// Log of a probability distribution; zero weights are floored at the
    /// smallest positive double.
    pub fn from_probabilities(p: &[f64]) -> Self {
        Self(p.iter().map(|v| v.max(f64::MIN_POSITIVE).ln()).collect())
    }

    /// The uniform distribution (all log-weights zero).
    pub fn uniform(num_labels: usize) -> Self {
        Self(vec![0.0; num_labels])
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Log-weights.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Multiply by a distribution given in probabilities.
    pub fn multiply_probabilities(&mut self, p: &[f64]) -> Result<()> {
        Error::check_len("label distribution", self.len(), p.len())?;
        for (l, v) in self.0.iter_mut().zip(p) {
            *l += v.max(f64::MIN_POSITIVE).ln();
        }
        Ok(())
    }

    /// Product with another log distribution.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        Error::check_len("label distribution", self.len(), other.len())?;
        Ok(Self(self.0.iter().zip(&other.0).map(|(a, b)| a + b).collect()))
    }

    /// Quotient by another log distribution.
    pub fn divide(&self, other: &Self) -> Result<Self> {
        Error::check_len("label distribution", self.len(), other.len())?;
        Ok(Self(self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect()))
    }

    /// Shift so that `log Σ exp = 0`.
    pub fn normalized(&self) -> Self {
        let max = self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Self::uniform(self.len());
        }
        let lse = max + self.0.iter().map(|v| (v - max).exp()).sum::<f64>().ln();
        Self(self.0.iter().map(|v| v - lse).collect())
    }

    /// Back to probabilities (normalized).
    pub fn to_distribution(&self) -> LabelDistribution {
        let mut values = self.0.clone();
        normalize_exp(&mut values);
        LabelDistribution(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_sums_to_one() {
        let inputs = [
            vec![1.0, 2.0, 3.0],
            vec![1e-300, 3e-300],
            vec![1e300, 1e300, 1e299],
            vec![0.0, 0.0, 5.0, 0.0],
        ];
        for w in inputs {
            let d = LabelDistribution::new(w.clone()).unwrap().normalized();
            assert!((d.sum() - 1.0).abs() < 1e-9, "{:?} -> {:?}", w, d);
        }
    }

    #[test]
    fn test_all_zero_normalizes_to_uniform() {
        let d = LabelDistribution::new(vec![0.0; 4]).unwrap().normalized();
        assert_eq!(d, LabelDistribution::uniform(4));
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert!(LabelDistribution::new(vec![0.5, -0.1]).is_err());
        assert!(LabelDistribution::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_product_length_mismatch() {
        let a = LabelDistribution::uniform(2);
        let b = LabelDistribution::uniform(3);
        assert!(matches!(
            a.product(&b),
            Err(Error::LengthMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_map_label_ties_to_lowest() {
        let d = LabelDistribution::new(vec![0.2, 0.4, 0.4]).unwrap();
        assert_eq!(d.map_label(), 1);
    }

    #[test]
    fn test_log_domain_survives_long_products() {
        // 2000 factors of 1e-3 underflow in the linear domain
        let mut log = LogLabelDistribution::uniform(2);
        for _ in 0..2000 {
            log.multiply_probabilities(&[1e-3, 2e-3]).unwrap();
        }
        let d = log.normalized().to_distribution();
        assert!((d.sum() - 1.0).abs() < 1e-12);
        assert!(d.get(1) > 0.999);
    }

    #[test]
    fn test_log_normalized_is_log_sum_exp_zero() {
        let log = LogLabelDistribution::from_logs(vec![-1000.0, -1001.0, -1002.0]).normalized();
        let total: f64 = log.as_slice().iter().map(|v| v.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_divide_undoes_multiply() {
        let a = LogLabelDistribution::from_probabilities(&[0.2, 0.8]);
        let b = LogLabelDistribution::from_probabilities(&[0.6, 0.4]);
        let back = a.multiply(&b).unwrap().divide(&b).unwrap();
        for (x, y) in back.as_slice().iter().zip(a.as_slice()) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}
