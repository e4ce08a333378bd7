//! Loopy belief propagation segmentation.
//!
//! The image is a 4-connected pairwise Markov random field over labels. Each
//! pixel's data term comes from per-label color models; the pairwise term is a
//! [`Compatibility`]. Every iteration
//!
//! 1. computes local messages from the color models (log domain, log-sum-exp
//!    normalized), multiplied by the region prior if one is active,
//! 2. runs the directional passes Right, Left, Down, Up,
//! 3. computes the belief as the normalized product of the local message and
//!    all four incoming messages,
//! 4. optionally exchanges messages with the region priors,
//! 5. refits the color models to the MAP labelling.
//!
//! All sums run in a fixed order, so parallel and sequential runs give
//! bit-identical results.
//!
//! # Example
//!
//! ```
//! use facesynth::color::Rgb;
//! use facesynth::pixel::PixelImage;
//! use facesynth::segmentation::{LabelSegmenter, LbpOptions, Potts};
//!
//! let image = PixelImage::from_fn(8, 8, |x, _| if x < 4 { Rgb::gray(0.2) } else { Rgb::gray(0.8) });
//! let initial = PixelImage::from_fn(8, 8, |x, _| usize::from(x >= 4));
//!
//! let segmenter = LabelSegmenter::new(Potts::new(2, 0.9).unwrap(), LbpOptions::default()).unwrap();
//! let result = segmenter.segment(&image, &initial, None).unwrap();
//! assert_eq!(*result.labels.get(7, 3), 1);
//! ```

use log::debug;
use rayon::prelude::*;

use super::color_model::ColorDistribution;
use super::compatibility::{Compatibility, Potts};
use super::distribution::{argmax, multiply_normalize, normalize_exp, LabelDistribution};
use super::field::{Direction, MessageField};
use super::observer::{IterationObserver, IterationSnapshot};
use super::prior::RegionPriors;
use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::pixel::PixelImage;

/// Options for [`LabelSegmenter`].
#[derive(Debug, Clone)]
pub struct LbpOptions {
    /// Number of iterations (default: 10).
    pub iterations: usize,

    /// Smoothing of the initial hard labels: the given label gets weight
    /// `1 - L·epsilon`, every other label `epsilon` (default: 1e-3).
    pub epsilon: f64,

    /// Lower bound of the color model standard deviations (default: 0.02).
    pub min_stddev: f64,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for LbpOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            epsilon: 1e-3,
            min_stddev: 0.02,
            parallel: true,
        }
    }
}

impl LbpOptions {
    /// Set the number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the initial label smoothing.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the standard deviation floor.
    pub fn with_min_stddev(mut self, min_stddev: f64) -> Self {
        self.min_stddev = min_stddev;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Result of a segmentation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Final per-pixel label distribution.
    pub belief: PixelImage<LabelDistribution>,
    /// Most probable label per pixel.
    pub labels: PixelImage<usize>,
    /// Color models fitted to `labels`.
    pub color_models: Vec<ColorDistribution>,
    /// Posterior over region priors, if any were given.
    pub region_posterior: Option<LabelDistribution>,
}

/// Segments color images into labels by loopy belief propagation.
#[derive(Debug, Clone)]
pub struct LabelSegmenter<C = Potts> {
    compatibility: C,
    options: LbpOptions,
}

impl<C: Compatibility> LabelSegmenter<C> {
    /// Create a segmenter; the label count is that of `compatibility`.
    pub fn new(compatibility: C, options: LbpOptions) -> Result<Self> {
        let l = compatibility.num_labels();
        if l == 0 {
            return Err(Error::invalid_param("num_labels", l, "need at least one label"));
        }
        if !(options.epsilon >= 0.0 && options.epsilon * (l as f64) < 1.0) {
            return Err(Error::invalid_param(
                "epsilon",
                options.epsilon,
                "require 0 <= epsilon < 1 / num_labels",
            ));
        }
        if !(options.min_stddev > 0.0) {
            return Err(Error::invalid_param(
                "min_stddev",
                options.min_stddev,
                "must be positive",
            ));
        }
        Ok(Self {
            compatibility,
            options,
        })
    }

    /// Number of labels.
    pub fn num_labels(&self) -> usize {
        self.compatibility.num_labels()
    }

    /// The options in use.
    pub fn options(&self) -> &LbpOptions {
        &self.options
    }

    /// Segment `image` starting from hard initial labels.
    pub fn segment(
        &self,
        image: &PixelImage<Rgb>,
        initial_labels: &PixelImage<usize>,
        priors: Option<&RegionPriors>,
    ) -> Result<Segmentation> {
        let models = self.initial_models(image, initial_labels)?;
        self.run(image, models, priors, None)
    }

    /// [`segment`](Self::segment) with a callback after every iteration.
    pub fn segment_with_observer(
        &self,
        image: &PixelImage<Rgb>,
        initial_labels: &PixelImage<usize>,
        priors: Option<&RegionPriors>,
        observer: &IterationObserver,
    ) -> Result<Segmentation> {
        let models = self.initial_models(image, initial_labels)?;
        self.run(image, models, priors, Some(observer))
    }

    /// Segment `image` starting from given color models, one per label.
    pub fn segment_from_models(
        &self,
        image: &PixelImage<Rgb>,
        models: Vec<ColorDistribution>,
        priors: Option<&RegionPriors>,
    ) -> Result<Segmentation> {
        Error::check_len("color models", self.num_labels(), models.len())?;
        self.run(image, models, priors, None)
    }

    /// Color models fitted to smoothed hard labels.
    fn initial_models(
        &self,
        image: &PixelImage<Rgb>,
        labels: &PixelImage<usize>,
    ) -> Result<Vec<ColorDistribution>> {
        image.check_same_size(labels)?;
        let l = self.num_labels();
        if let Some((x, y, &label)) = labels.pixels().find(|&(_, _, &label)| label >= l) {
            return Err(Error::LabelOutOfRange {
                label,
                num_labels: l,
                x,
                y,
            });
        }

        let eps = self.options.epsilon;
        // on + (L - 1) · off = 1 - epsilon
        let norm = 1.0 / (1.0 - eps);
        let on = (1.0 - l as f64 * eps) * norm;
        let off = eps * norm;
        let colors = image.as_slice();
        let fit = |label: usize| {
            ColorDistribution::fit_weighted(
                colors,
                labels
                    .as_slice()
                    .iter()
                    .map(move |&p| if p == label { on } else { off }),
                self.options.min_stddev,
            )
        };
        Ok(if self.options.parallel {
            (0..l).into_par_iter().map(fit).collect()
        } else {
            (0..l).map(fit).collect()
        })
    }

    /// Per-pixel data term: normalized color likelihoods times the prior.
    fn local_messages(
        &self,
        colors: &[Rgb],
        models: &[ColorDistribution],
        prior: Option<&[f64]>,
    ) -> Vec<f64> {
        let l = models.len();
        let mut local = vec![0.0; colors.len() * l];
        let compute = |(p, out): (usize, &mut [f64])| {
            for (o, model) in out.iter_mut().zip(models) {
                *o = model.log_likelihood(colors[p]);
            }
            normalize_exp(out);
            if let Some(prior) = prior {
                multiply_normalize(out, &prior[p * l..(p + 1) * l]);
            }
        };
        if self.options.parallel {
            local.par_chunks_mut(l).enumerate().for_each(compute);
        } else {
            local.chunks_mut(l).enumerate().for_each(compute);
        }
        local
    }

    fn refit(&self, colors: &[Rgb], labels: &[usize]) -> Vec<ColorDistribution> {
        let fit = |label: usize| {
            ColorDistribution::fit_label(colors, labels, label, self.options.min_stddev)
        };
        if self.options.parallel {
            (0..self.num_labels()).into_par_iter().map(fit).collect()
        } else {
            (0..self.num_labels()).map(fit).collect()
        }
    }

    fn run(
        &self,
        image: &PixelImage<Rgb>,
        mut models: Vec<ColorDistribution>,
        priors: Option<&RegionPriors>,
        observer: Option<&IterationObserver>,
    ) -> Result<Segmentation> {
        let (w, h) = (image.width(), image.height());
        let l = self.num_labels();
        if let Some(priors) = priors {
            priors.check(image, l)?;
        }
        let colors = image.as_slice();
        let parallel = self.options.parallel;
        let total = self.options.iterations;

        let mut field = MessageField::new(w, h, l);
        let mut prior: Option<Vec<f64>> = None;
        let mut region_posterior = None;
        let mut belief = self.local_messages(colors, &models, None);
        let mut labels = map_labels(&belief, l);

        for iteration in 0..total {
            let local = self.local_messages(colors, &models, prior.as_deref());
            for direction in Direction::PASS_ORDER {
                field.pass(direction, &local, &self.compatibility, parallel);
            }
            belief = field.belief(&local, parallel);

            if let Some(priors) = priors {
                let update = priors.update(&belief, parallel)?;
                debug!("region posterior: {:?}", update.posterior.as_slice());
                prior = Some(update.prior);
                region_posterior = Some(update.posterior);
            }

            labels = map_labels(&belief, l);
            models = self.refit(colors, &labels);

            debug!(
                "LBP iteration {}/{}: label counts {:?}",
                iteration + 1,
                total,
                label_counts(&labels, l)
            );
            if let Some(observer) = observer {
                observer.notify(&IterationSnapshot {
                    iteration,
                    total,
                    width: w,
                    height: h,
                    num_labels: l,
                    belief: &belief,
                    color_models: &models,
                });
            }
        }

        let belief_image = PixelImage::from_vec(
            w,
            h,
            belief
                .chunks(l)
                .map(|b| LabelDistribution::from_normalized(b.to_vec()))
                .collect(),
        )?;
        Ok(Segmentation {
            belief: belief_image,
            labels: PixelImage::from_vec(w, h, labels)?,
            color_models: models,
            region_posterior,
        })
    }
}

fn map_labels(belief: &[f64], num_labels: usize) -> Vec<usize> {
    belief.chunks(num_labels).map(argmax).collect()
}

fn label_counts(labels: &[usize], num_labels: usize) -> Vec<usize> {
    let mut counts = vec![0; num_labels];
    for &l in labels {
        counts[l] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::compatibility::CompatibilityMatrix;
    use crate::segmentation::prior::RegionPrior;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const A: Rgb = Rgb::new(0.8, 0.2, 0.2);
    const B: Rgb = Rgb::new(0.2, 0.3, 0.8);

    fn two_halves() -> PixelImage<Rgb> {
        PixelImage::from_fn(20, 20, |x, _| if x < 10 { A } else { B })
    }

    /// Boundary deliberately misplaced at x = 5.
    fn rough_labels() -> PixelImage<usize> {
        PixelImage::from_fn(20, 20, |x, _| usize::from(x >= 5))
    }

    fn segmenter(options: LbpOptions) -> LabelSegmenter {
        LabelSegmenter::new(Potts::new(2, 0.9).unwrap(), options).unwrap()
    }

    #[test]
    fn test_two_halves_converge() {
        let options = LbpOptions::default().with_iterations(10);
        let result = segmenter(options)
            .segment(&two_halves(), &rough_labels(), None)
            .unwrap();
        for (x, y, b) in result.belief.pixels() {
            assert!((b.sum() - 1.0).abs() < 1e-9);
            if x < 9 {
                assert!(b.get(0) > 0.9, "pixel ({}, {}): {:?}", x, y, b);
            } else if x > 11 {
                assert!(b.get(1) > 0.9, "pixel ({}, {}): {:?}", x, y, b);
            }
        }
        match &result.color_models[0] {
            ColorDistribution::Gaussian { mean, .. } => {
                assert!((*mean - A).norm_squared() < 1e-20)
            }
            other => panic!("expected Gaussian, got {:?}", other),
        }
    }

    #[test]
    fn test_deterministic_and_parallel_matches_sequential() {
        let image = PixelImage::from_fn(16, 12, |x, y| {
            let noise = ((x * 7 + y * 13) % 5) as f64 * 0.03;
            if x + y < 14 {
                A + Rgb::gray(noise)
            } else {
                B + Rgb::gray(noise)
            }
        });
        let initial = PixelImage::from_fn(16, 12, |x, _| usize::from(x >= 8));
        let options = LbpOptions::default().with_iterations(5);
        let first = segmenter(options.clone())
            .segment(&image, &initial, None)
            .unwrap();
        let second = segmenter(options.clone())
            .segment(&image, &initial, None)
            .unwrap();
        let sequential = segmenter(options.sequential())
            .segment(&image, &initial, None)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first, sequential);
    }

    #[test]
    fn test_dense_compatibility_matches_potts() {
        let potts = Potts::new(2, 0.9).unwrap();
        let dense = CompatibilityMatrix::new(2, vec![0.9, 0.1, 0.1, 0.9]).unwrap();
        let options = LbpOptions::default().with_iterations(3);
        let a = LabelSegmenter::new(potts, options.clone())
            .unwrap()
            .segment(&two_halves(), &rough_labels(), None)
            .unwrap();
        let b = LabelSegmenter::new(dense, options)
            .unwrap()
            .segment(&two_halves(), &rough_labels(), None)
            .unwrap();
        assert_eq!(a.labels, b.labels);
        for (x, y) in a.belief.as_slice().iter().zip(b.belief.as_slice()) {
            assert!((x.get(0) - y.get(0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_region_priors_select_matching_layout() {
        let vertical = RegionPrior::new(
            "vertical",
            PixelImage::from_fn(20, 20, |x, _| {
                LabelDistribution::new(if x < 10 { vec![0.8, 0.2] } else { vec![0.2, 0.8] })
                    .unwrap()
            }),
        );
        let horizontal = RegionPrior::new(
            "horizontal",
            PixelImage::from_fn(20, 20, |_, y| {
                LabelDistribution::new(if y < 10 { vec![0.8, 0.2] } else { vec![0.2, 0.8] })
                    .unwrap()
            }),
        );
        let priors = RegionPriors::new(vec![vertical, horizontal]).unwrap();
        let result = segmenter(LbpOptions::default().with_iterations(4))
            .segment(&two_halves(), &rough_labels(), Some(&priors))
            .unwrap();
        let posterior = result.region_posterior.expect("priors were given");
        assert!(posterior.get(0) > 0.99, "{:?}", posterior);
        assert_eq!(*result.labels.get(2, 15), 0);
        assert_eq!(*result.labels.get(17, 2), 1);
    }

    #[test]
    fn test_observer_sees_every_iteration() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let observer = IterationObserver::new(move |s| {
            assert_eq!(s.iteration, seen.fetch_add(1, Ordering::SeqCst));
            assert!((s.belief_at(0, 0).iter().sum::<f64>() - 1.0).abs() < 1e-9);
        });
        segmenter(LbpOptions::default().with_iterations(4))
            .segment_with_observer(&two_halves(), &rough_labels(), None, &observer)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_preconditions() {
        let s = segmenter(LbpOptions::default());
        let image = two_halves();

        let mut bad = rough_labels();
        bad.set(3, 4, 2);
        assert!(matches!(
            s.segment(&image, &bad, None),
            Err(Error::LabelOutOfRange { label: 2, x: 3, y: 4, .. })
        ));

        let small = PixelImage::new(5, 5, 0usize);
        assert!(matches!(
            s.segment(&image, &small, None),
            Err(Error::ImageSizeMismatch { .. })
        ));

        assert!(matches!(
            s.segment_from_models(&image, vec![ColorDistribution::Uniform], None),
            Err(Error::LengthMismatch { expected: 2, actual: 1, .. })
        ));

        let priors = RegionPriors::new(vec![RegionPrior::new(
            "wrong size",
            PixelImage::new(4, 4, LabelDistribution::uniform(2)),
        )])
        .unwrap();
        assert!(s.segment(&image, &rough_labels(), Some(&priors)).is_err());

        assert!(LabelSegmenter::new(
            Potts::new(2, 0.9).unwrap(),
            LbpOptions::default().with_epsilon(0.6)
        )
        .is_err());
    }
}
