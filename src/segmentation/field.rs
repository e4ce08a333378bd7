//! Directional message storage and message passes on a 4-connected grid.
//!
//! The field keeps one plane per incoming direction. A plane is a flat
//! `width × height × L` array; the message a pixel received from one neighbour
//! sits at `(y * width + x) * L`.
//!
//! A pass in direction d updates a single plane: every pixel sends to its
//! neighbour in direction d the product of its local message and the incoming
//! messages from the other three sides, marginalized against the pairwise
//! compatibility. Pixels along the pass axis are processed in order, so each
//! message already includes the ones sent earlier in the same pass. Lines
//! perpendicular to the pass axis are independent and run in parallel; each
//! line writes only its own pixels.

use rayon::prelude::*;

use super::compatibility::Compatibility;
use super::distribution::{multiply_normalize, normalize};

/// Direction in which messages travel during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    /// Order of the passes within one iteration.
    pub(crate) const PASS_ORDER: [Direction; 4] =
        [Direction::Right, Direction::Left, Direction::Down, Direction::Up];
}

/// Incoming messages of every pixel, one plane per side.
#[derive(Debug, Clone)]
pub(crate) struct MessageField {
    width: usize,
    height: usize,
    num_labels: usize,
    from_left: Vec<f64>,
    from_right: Vec<f64>,
    from_above: Vec<f64>,
    from_below: Vec<f64>,
}

/// Messages along one line of pixels.
struct Line<'a> {
    local: &'a [f64],
    side_a: &'a [f64],
    side_b: &'a [f64],
    compatibility: &'a dyn Compatibility,
    num_labels: usize,
}

impl Line<'_> {
    /// Propagate along `n` slots. `carried` holds the message each slot received
    /// from its predecessor; `pixel_of(slot)` maps slots to pixel indices.
    fn sweep(&self, n: usize, reverse: bool, pixel_of: impl Fn(usize) -> usize, carried: &mut [f64]) {
        let l = self.num_labels;
        let mut product = vec![0.0; l];
        let mut out = vec![0.0; l];
        for k in 0..n.saturating_sub(1) {
            let (slot, next) = if reverse {
                (n - 1 - k, n - 2 - k)
            } else {
                (k, k + 1)
            };
            let p = pixel_of(slot) * l;
            product.copy_from_slice(&self.local[p..p + l]);
            multiply_normalize(&mut product, &carried[slot * l..(slot + 1) * l]);
            multiply_normalize(&mut product, &self.side_a[p..p + l]);
            multiply_normalize(&mut product, &self.side_b[p..p + l]);
            self.compatibility.marginalize(&product, &mut out);
            normalize(&mut out);
            carried[next * l..(next + 1) * l].copy_from_slice(&out);
        }
    }
}

impl MessageField {
    /// All messages uniform.
    pub(crate) fn new(width: usize, height: usize, num_labels: usize) -> Self {
        let plane = vec![1.0 / num_labels as f64; width * height * num_labels];
        Self {
            width,
            height,
            num_labels,
            from_left: plane.clone(),
            from_right: plane.clone(),
            from_above: plane.clone(),
            from_below: plane,
        }
    }

    /// Run one directional pass.
    pub(crate) fn pass(
        &mut self,
        direction: Direction,
        local: &[f64],
        compatibility: &dyn Compatibility,
        parallel: bool,
    ) {
        let (w, h, l) = (self.width, self.height, self.num_labels);
        if w == 0 || h == 0 {
            return;
        }
        let Self {
            from_left,
            from_right,
            from_above,
            from_below,
            ..
        } = self;
        // The written plane holds messages from the side the pass comes from
        let (plane, side_a, side_b) = match direction {
            Direction::Right => (from_left, &*from_above, &*from_below),
            Direction::Left => (from_right, &*from_above, &*from_below),
            Direction::Down => (from_above, &*from_left, &*from_right),
            Direction::Up => (from_below, &*from_left, &*from_right),
        };
        let line = Line {
            local,
            side_a,
            side_b,
            compatibility,
            num_labels: l,
        };

        match direction {
            Direction::Right | Direction::Left => {
                let reverse = direction == Direction::Left;
                let sweep_row = |(y, row): (usize, &mut [f64])| {
                    line.sweep(w, reverse, |x| y * w + x, row);
                };
                if parallel {
                    plane.par_chunks_mut(w * l).enumerate().for_each(sweep_row);
                } else {
                    plane.chunks_mut(w * l).enumerate().for_each(sweep_row);
                }
            }
            Direction::Down | Direction::Up => {
                let reverse = direction == Direction::Up;
                let columns: Vec<Vec<f64>> = {
                    let source: &[f64] = &plane[..];
                    let sweep_column = |x: usize| {
                        let mut column = Vec::with_capacity(h * l);
                        for y in 0..h {
                            let p = (y * w + x) * l;
                            column.extend_from_slice(&source[p..p + l]);
                        }
                        line.sweep(h, reverse, |y| y * w + x, &mut column);
                        column
                    };
                    if parallel {
                        (0..w).into_par_iter().map(sweep_column).collect()
                    } else {
                        (0..w).map(sweep_column).collect()
                    }
                };
                for (x, column) in columns.iter().enumerate() {
                    for y in 0..h {
                        let p = (y * w + x) * l;
                        plane[p..p + l].copy_from_slice(&column[y * l..(y + 1) * l]);
                    }
                }
            }
        }
    }

    /// Normalized product of the local message and all four incoming messages.
    pub(crate) fn belief(&self, local: &[f64], parallel: bool) -> Vec<f64> {
        let l = self.num_labels;
        let mut belief = local.to_vec();
        if l == 0 {
            return belief;
        }
        let combine = |(i, b): (usize, &mut [f64])| {
            let p = i * l;
            multiply_normalize(b, &self.from_left[p..p + l]);
            multiply_normalize(b, &self.from_right[p..p + l]);
            multiply_normalize(b, &self.from_above[p..p + l]);
            multiply_normalize(b, &self.from_below[p..p + l]);
        };
        if parallel {
            belief.par_chunks_mut(l).enumerate().for_each(combine);
        } else {
            belief.chunks_mut(l).enumerate().for_each(combine);
        }
        belief
    }
}
