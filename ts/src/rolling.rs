//! Fixed-window rolling average

use std::collections::VecDeque;

/// Rolling window over the most recent `window_size` samples
#[derive(Debug, Clone)]
pub struct RollingAverage {
    window_size: usize,
    samples: VecDeque<f64>,
    total: f64,
}

impl RollingAverage {
    /// Create an empty window holding at most `window_size` samples
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            samples: VecDeque::with_capacity(window_size),
            total: 0.0,
        }
    }

    /// Add a sample, evicting the oldest one when the window is full
    pub fn add(&mut self, value: f64) {
        if self.samples.len() == self.window_size
            && let Some(oldest) = self.samples.pop_front()
        {
            self.total -= oldest;
        }
        self.samples.push_back(value);
        self.total += value;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Arithmetic mean, 0.0 when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.total / self.samples.len() as f64
    }

    pub fn min(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.samples.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    pub fn median(&self) -> f64 {
        self.percentile(0.5)
    }

    /// Nearest-rank percentile; `percentile` is clamped to `[0, 1]`
    pub fn percentile(&self, percentile: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let rank = (percentile.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).ceil() as usize;
        sorted[rank]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_window_reports_zero() {
        let avg = RollingAverage::new(10);
        assert!(avg.is_empty());
        assert_eq!(avg.mean(), 0.0);
        assert_eq!(avg.max(), 0.0);
        assert_eq!(avg.percentile(0.95), 0.0);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut avg = RollingAverage::new(3);
        for v in [1.0, 2.0, 3.0, 10.0] {
            avg.add(v);
        }

        assert_eq!(avg.len(), 3);
        assert_eq!(avg.min(), 2.0);
        assert_eq!(avg.max(), 10.0);
        assert_eq!(avg.mean(), 5.0);
    }

    #[test]
    fn test_median_and_percentile() {
        let mut avg = RollingAverage::new(100);
        for v in 1..=10 {
            avg.add(v as f64);
        }

        assert_eq!(avg.median(), 6.0);
        assert_eq!(avg.percentile(0.95), 10.0);
        assert_eq!(avg.percentile(0.0), 1.0);
    }

    #[test]
    fn test_zero_window_size_is_clamped() {
        let mut avg = RollingAverage::new(0);
        avg.add(4.0);
        avg.add(8.0);
        assert_eq!(avg.window_size(), 1);
        assert_eq!(avg.mean(), 8.0);
    }

    proptest! {
        #[test]
        fn prop_mean_stays_within_bounds(values in proptest::collection::vec(0.0f64..1000.0, 1..200)) {
            let mut avg = RollingAverage::new(50);
            for v in &values {
                avg.add(*v);
            }
            let mean = avg.mean();
            prop_assert!(mean >= avg.min() - 1e-6);
            prop_assert!(mean <= avg.max() + 1e-6);
            prop_assert!(avg.len() <= 50);
        }
    }
}
