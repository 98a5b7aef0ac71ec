//! Bounded window of angular deltas measured against the first sample

use crate::algorithms::angles::wrap_delta;
use crate::algorithms::statistics::{mean, median};
use std::collections::VecDeque;

/// FIFO window storing each sample as a wraparound-safe offset from a reference angle.
///
/// The first sample pushed after construction or [`clear`](Self::clear)
/// becomes the reference and is stored as a zero delta.
#[derive(Debug, Clone)]
pub struct AngularDeltaWindow {
    capacity: usize,
    reference: Option<f32>,
    deltas: VecDeque<f32>,
}

impl AngularDeltaWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            reference: None,
            deltas: VecDeque::with_capacity(capacity),
        }
    }

    /// Add an angle, evicting the oldest delta once full. Returns the stored delta.
    pub fn push(&mut self, angle: f32) -> f32 {
        let delta = match self.reference {
            None => {
                self.reference = Some(angle);
                0.0
            }
            Some(reference) => wrap_delta(angle, reference),
        };

        if self.deltas.len() >= self.capacity {
            self.deltas.pop_front();
        }
        self.deltas.push_back(delta);
        delta
    }

    /// Median of the stored deltas, 0 when empty
    pub fn median_delta(&self) -> f32 {
        let samples: Vec<f32> = self.deltas.iter().copied().collect();
        median(&samples)
    }

    /// Mean of the stored deltas, 0 when empty
    pub fn mean_delta(&self) -> f32 {
        let samples: Vec<f32> = self.deltas.iter().copied().collect();
        mean(&samples)
    }

    /// Reference plus the median delta
    pub fn median_estimate(&self) -> f32 {
        self.reference.unwrap_or(0.0) + self.median_delta()
    }

    /// Reference plus the mean delta
    pub fn mean_estimate(&self) -> f32 {
        self.reference.unwrap_or(0.0) + self.mean_delta()
    }

    pub fn reference(&self) -> Option<f32> {
        self.reference
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.deltas.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.reference = None;
        self.deltas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_reference() {
        let mut window = AngularDeltaWindow::new(5);
        assert_eq!(window.push(42.0), 0.0);
        assert_eq!(window.reference(), Some(42.0));
        assert_eq!(window.median_estimate(), 42.0);
    }

    #[test]
    fn test_deltas_wrap_around_north() {
        let mut window = AngularDeltaWindow::new(5);
        window.push(1.0);
        assert_eq!(window.push(359.0), -2.0);
        assert_eq!(window.push(3.0), 2.0);
        assert_eq!(window.median_estimate(), 1.0);
    }

    #[test]
    fn test_fifo_eviction_keeps_reference() {
        let mut window = AngularDeltaWindow::new(3);
        for angle in [10.0, 20.0, 30.0, 40.0] {
            window.push(angle);
        }
        assert_eq!(window.len(), 3);
        assert!(window.is_full());
        assert_eq!(window.reference(), Some(10.0));
        // deltas 10, 20, 30
        assert_eq!(window.median_estimate(), 30.0);
        assert_eq!(window.mean_estimate(), 30.0);
    }

    #[test]
    fn test_median_and_mean_differ() {
        let mut window = AngularDeltaWindow::new(5);
        for angle in [100.0, 101.0, 102.0, 130.0] {
            window.push(angle);
        }
        assert_eq!(window.median_estimate(), 101.5);
        assert_eq!(window.mean_estimate(), 108.25);
    }

    #[test]
    fn test_clear() {
        let mut window = AngularDeltaWindow::new(5);
        window.push(10.0);
        window.push(20.0);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.reference(), None);
        assert_eq!(window.median_estimate(), 0.0);
    }
}
