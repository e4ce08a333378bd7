//! Per-iteration callbacks for the segmentation loop.
//!
//! # Example
//!
//! ```
//! use facesynth::segmentation::IterationObserver;
//!
//! let observer = IterationObserver::new(|snapshot| {
//!     println!("iteration {}/{}", snapshot.iteration + 1, snapshot.total);
//! });
//! # let _ = observer;
//! ```

use super::color_model::ColorDistribution;

/// State of a segmentation run after one iteration.
#[derive(Debug)]
pub struct IterationSnapshot<'a> {
    /// Completed iteration (0-based).
    pub iteration: usize,
    /// Total number of iterations.
    pub total: usize,
    /// Image width.
    pub width: usize,
    /// Image height.
    pub height: usize,
    /// Number of labels.
    pub num_labels: usize,
    /// Row-major beliefs, `num_labels` values per pixel.
    pub belief: &'a [f64],
    /// Color models estimated at the end of this iteration.
    pub color_models: &'a [ColorDistribution],
}

impl IterationSnapshot<'_> {
    /// Belief at pixel `(x, y)`.
    pub fn belief_at(&self, x: usize, y: usize) -> &[f64] {
        let p = (y * self.width + x) * self.num_labels;
        &self.belief[p..p + self.num_labels]
    }
}

/// A callback invoked after every segmentation iteration.
pub struct IterationObserver {
    callback: Box<dyn Fn(&IterationSnapshot<'_>) + Send + Sync>,
}

impl IterationObserver {
    /// Create an observer with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&IterationSnapshot<'_>) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Notify the callback.
    #[inline]
    pub fn notify(&self, snapshot: &IterationSnapshot<'_>) {
        (self.callback)(snapshot);
    }

    /// An observer that ignores all snapshots.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for IterationObserver {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for IterationObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IterationObserver").finish_non_exhaustive()
    }
}
