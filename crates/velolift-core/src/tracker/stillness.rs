//! Variance-based stillness detection.
//!
//! A sensor with a constant bias (say a steady -0.15 m/s while the bar sits
//! in the rack) looks like slow movement by magnitude alone. Its variance,
//! however, stays near zero, so a full window with a small sample standard
//! deviation is classified as stationary regardless of the mean.

use std::collections::VecDeque;

/// Fixed-capacity window over the most recent raw samples.
#[derive(Debug, Clone)]
pub struct StillnessWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl StillnessWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a raw sample, evicting the oldest once the window is full.
    pub fn push(&mut self, velocity: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(velocity);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.samples.len() == self.capacity
    }

    /// Sample standard deviation (n - 1 denominator).
    ///
    /// `None` with fewer than two samples.
    pub fn std_dev(&self) -> Option<f64> {
        let n = self.samples.len();
        if n < 2 {
            return None;
        }
        let mean = self.samples.iter().sum::<f64>() / n as f64;
        let sum_sq: f64 = self.samples.iter().map(|v| (v - mean).powi(2)).sum();
        Some((sum_sq / (n - 1) as f64).sqrt())
    }

    /// True only when the window is full and its spread is below `threshold`.
    pub fn is_stationary(&self, threshold: f64) -> bool {
        if !self.is_full() {
            return false;
        }
        self.std_dev().map(|sd| sd < threshold).unwrap_or(false)
    }
}
