//! Memoizing renderer decorator.
//!
//! Sampling-based fitting queries the same parameters repeatedly (a rejected
//! proposal returns to the previous state). [`CachedRenderer`] remembers the
//! images of the most recently used parameters.
//!
//! Keys are compared with exact `==` on [`RenderParameter`]; parameters
//! differing in the last bit are different keys. Lookup is a linear scan,
//! which is negligible next to rendering for the small capacities in use.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::trace;

use super::parameter::RenderParameter;
use super::renderer::ImageRenderer;
use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::pixel::PixelImage;

type Entry = (RenderParameter, Arc<PixelImage<Rgba>>);

/// An [`ImageRenderer`] with a bounded least-recently-used image cache.
#[derive(Debug)]
pub struct CachedRenderer<R> {
    inner: R,
    capacity: usize,
    // Most recently used entry at the back
    entries: Mutex<VecDeque<Entry>>,
}

impl<R: ImageRenderer> CachedRenderer<R> {
    /// Wrap `inner`, keeping at most `capacity` images.
    pub fn new(inner: R, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_param("capacity", capacity, "must be positive"));
        }
        Ok(Self {
            inner,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        })
    }

    /// The wrapped renderer.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached images.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Render through the cache. Errors are returned but not cached.
    pub fn render_shared(&self, parameter: &RenderParameter) -> Result<Arc<PixelImage<Rgba>>> {
        {
            let mut entries = self.lock();
            if let Some(pos) = entries.iter().position(|(key, _)| key == parameter) {
                if let Some(entry) = entries.remove(pos) {
                    let image = Arc::clone(&entry.1);
                    entries.push_back(entry);
                    trace!("render cache hit");
                    return Ok(image);
                }
            }
        }

        // Render without holding the lock
        let image = Arc::new(self.inner.render_image(parameter)?);

        let mut entries = self.lock();
        if !entries.iter().any(|(key, _)| key == parameter) {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back((parameter.clone(), Arc::clone(&image)));
        }
        Ok(image)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Entry>> {
        // A panic while holding the lock cannot leave the deque inconsistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<R: ImageRenderer> ImageRenderer for CachedRenderer<R> {
    fn render_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>> {
        self.render_shared(parameter)
            .map(|image| image.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::parameter::{ImageSize, Pose};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fills the image with the pose scale and counts calls.
    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl ImageRenderer for CountingRenderer {
        fn render_image(&self, parameter: &RenderParameter) -> Result<PixelImage<Rgba>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let v = parameter.pose.scaling;
            Ok(PixelImage::new(2, 2, Rgba::new(v, v, v, 1.0)))
        }
    }

    fn param(scale: f64) -> RenderParameter {
        RenderParameter::default()
            .with_image_size(ImageSize::new(2, 2))
            .with_pose(Pose::default().with_scaling(scale))
    }

    #[test]
    fn test_hit_does_not_render_again() {
        let cache = CachedRenderer::new(CountingRenderer::default(), 2).unwrap();
        let a = cache.render_shared(&param(1.0)).unwrap();
        let b = cache.render_shared(&param(1.0)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = CachedRenderer::new(CountingRenderer::default(), 2).unwrap();
        cache.render_image(&param(1.0)).unwrap();
        cache.render_image(&param(2.0)).unwrap();
        // Touch 1.0 so that 2.0 becomes the oldest
        cache.render_image(&param(1.0)).unwrap();
        cache.render_image(&param(3.0)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 3);

        cache.render_image(&param(1.0)).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 3);
        cache.render_image(&param(2.0)).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(CachedRenderer::new(CountingRenderer::default(), 0).is_err());
    }
}
