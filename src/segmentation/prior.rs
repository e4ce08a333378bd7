//! Region-type priors for segmentation.
//!
//! A region prior is a spatial map of label probabilities `P_r(p, l)`, for
//! example "where skin, hair and background usually are" for one kind of image
//! region. With several candidate regions the segmentation decides which of
//! them explains the current belief best and feeds that back as a per-pixel
//! label prior.
//!
//! One update runs, given the per-pixel belief `b(p, l)`:
//!
//! 1. evidence of pixel p for region r: `e_p(r) = Σ_l b(p, l) · P_r(p, l)`,
//!    normalized over r;
//! 2. summary over all pixels in the log domain: `S(r) = Σ_p log e_p(r)`;
//! 3. message to pixel p: `m_p(r) ∝ exp(S(r) - log e_p(r))`, i.e. the summary
//!    without the pixel's own contribution;
//! 4. label prior of pixel p: `π_p(l) ∝ Σ_r m_p(r) · P_r(p, l)`.

use rayon::prelude::*;

use super::distribution::{normalize, LabelDistribution, LogLabelDistribution};
use crate::error::{Error, Result};
use crate::pixel::PixelImage;

/// One named region type and its label prior map.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPrior {
    name: String,
    map: PixelImage<LabelDistribution>,
}

impl RegionPrior {
    /// Create a region prior; every pixel distribution is normalized.
    pub fn new(name: impl Into<String>, map: PixelImage<LabelDistribution>) -> Self {
        Self {
            name: name.into(),
            map: map.map(LabelDistribution::normalized),
        }
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label prior map.
    pub fn map(&self) -> &PixelImage<LabelDistribution> {
        &self.map
    }
}

/// A validated set of region priors over one image domain.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPriors {
    regions: Vec<RegionPrior>,
    num_labels: usize,
}

/// Result of one region update.
pub(crate) struct RegionUpdate {
    /// Row-major label prior, `num_labels` values per pixel.
    pub(crate) prior: Vec<f64>,
    /// Posterior over regions.
    pub(crate) posterior: LabelDistribution,
}

impl RegionPriors {
    /// Validate a non-empty set of priors sharing size and label count.
    pub fn new(regions: Vec<RegionPrior>) -> Result<Self> {
        let first = regions.first().ok_or_else(|| {
            Error::invalid_param("regions", 0, "need at least one region prior")
        })?;
        let num_labels = first.map.as_slice().first().map_or(0, LabelDistribution::len);
        for region in &regions {
            first.map.check_same_size(&region.map)?;
            for d in region.map.as_slice() {
                Error::check_len("region prior labels", num_labels, d.len())?;
            }
        }
        Ok(Self {
            regions,
            num_labels,
        })
    }

    /// The regions.
    pub fn regions(&self) -> &[RegionPrior] {
        &self.regions
    }

    /// Number of regions.
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Number of labels of every prior distribution.
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Check compatibility with an image and label count.
    pub(crate) fn check<A>(&self, image: &PixelImage<A>, num_labels: usize) -> Result<()> {
        self.regions[0].map.check_same_size(image)?;
        Error::check_len("region prior labels", num_labels, self.num_labels)
    }

    fn prior_at(&self, region: usize, pixel: usize) -> &[f64] {
        self.regions[region].map.as_slice()[pixel].as_slice()
    }

    /// Run one region message exchange against `belief`.
    pub(crate) fn update(&self, belief: &[f64], parallel: bool) -> Result<RegionUpdate> {
        let l = self.num_labels;
        let r = self.regions.len();
        let n = if l == 0 { 0 } else { belief.len() / l };

        let evidence_of = |p: usize| -> Vec<f64> {
            let b = &belief[p * l..(p + 1) * l];
            let mut e: Vec<f64> = (0..r)
                .map(|region| {
                    b.iter()
                        .zip(self.prior_at(region, p))
                        .map(|(x, y)| x * y)
                        .sum()
                })
                .collect();
            normalize(&mut e);
            e
        };
        let evidence: Vec<Vec<f64>> = if parallel {
            (0..n).into_par_iter().map(evidence_of).collect()
        } else {
            (0..n).map(evidence_of).collect()
        };

        // Fixed pixel order keeps the summary reproducible
        let mut summary = LogLabelDistribution::uniform(r);
        for e in &evidence {
            summary.multiply_probabilities(e)?;
        }

        let prior_of = |p: usize| -> Vec<f64> {
            let own = LogLabelDistribution::from_probabilities(&evidence[p]);
            let message = leave_one_out(&summary, &own);
            let mut prior = vec![0.0; l];
            for region in 0..r {
                let w = message.get(region);
                for (o, q) in prior.iter_mut().zip(self.prior_at(region, p)) {
                    *o += w * q;
                }
            }
            normalize(&mut prior);
            prior
        };
        let prior: Vec<f64> = if parallel {
            (0..n).into_par_iter().flat_map_iter(prior_of).collect()
        } else {
            (0..n).flat_map(prior_of).collect()
        };

        Ok(RegionUpdate {
            prior,
            posterior: summary.to_distribution(),
        })
    }
}

/// `summary / own`, both over the same regions.
fn leave_one_out(summary: &LogLabelDistribution, own: &LogLabelDistribution) -> LabelDistribution {
    let logs = summary
        .as_slice()
        .iter()
        .zip(own.as_slice())
        .map(|(s, o)| s - o)
        .collect();
    LogLabelDistribution::from_logs(logs).to_distribution()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(name: &str, w: usize, h: usize, f: impl Fn(usize, usize) -> [f64; 2]) -> RegionPrior {
        RegionPrior::new(
            name,
            PixelImage::from_fn(w, h, |x, y| LabelDistribution::new(f(x, y).to_vec()).unwrap()),
        )
    }

    fn priors() -> RegionPriors {
        // "left" expects label 0 on the left half, "top" on the top half
        RegionPriors::new(vec![
            region("left", 4, 4, |x, _| if x < 2 { [0.9, 0.1] } else { [0.1, 0.9] }),
            region("top", 4, 4, |_, y| if y < 2 { [0.9, 0.1] } else { [0.1, 0.9] }),
        ])
        .unwrap()
    }

    #[test]
    fn test_matching_region_wins() {
        let priors = priors();
        let belief: Vec<f64> = (0..16)
            .flat_map(|i| if i % 4 < 2 { [0.8, 0.2] } else { [0.2, 0.8] })
            .collect();
        let update = priors.update(&belief, false).unwrap();
        assert!(update.posterior.get(0) > 0.99, "{:?}", update.posterior);
        // The prior follows the "left" map
        assert!((update.prior[0] - 0.9).abs() < 1e-2);
        assert!((update.prior[3 * 2] - 0.1).abs() < 1e-2);
        for p in update.prior.chunks(2) {
            assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_parallel_update_matches_sequential() {
        let priors = priors();
        let belief: Vec<f64> = (0..16)
            .flat_map(|i| {
                let a = 0.2 + 0.05 * i as f64;
                [a, 1.0 - a]
            })
            .collect();
        let a = priors.update(&belief, false).unwrap();
        let b = priors.update(&belief, true).unwrap();
        assert_eq!(a.prior, b.prior);
        assert_eq!(a.posterior, b.posterior);
    }

    #[test]
    fn test_mismatched_priors_rejected() {
        let a = region("a", 4, 4, |_, _| [0.5, 0.5]);
        let b = region("b", 3, 4, |_, _| [0.5, 0.5]);
        assert!(matches!(
            RegionPriors::new(vec![a.clone(), b]),
            Err(Error::ImageSizeMismatch { .. })
        ));
        let c = RegionPrior::new(
            "c",
            PixelImage::new(4, 4, LabelDistribution::uniform(3)),
        );
        assert!(matches!(
            RegionPriors::new(vec![a, c]),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(RegionPriors::new(vec![]).is_err());
    }
}
