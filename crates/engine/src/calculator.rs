use std::collections::VecDeque;

use trend_config::BufferPolicy;
use trend_core::{Result, TrendError};

/// Rolling window of samples for one tracked input.
///
/// Once the window holds `capacity` samples, [`observe`](Self::observe)
/// returns `latest - mean(window)` and then applies the [`BufferPolicy`]:
/// `Reset` empties the window, `Slide` evicts the oldest sample so the next
/// observation emits again.
#[derive(Debug, Clone)]
pub struct TrendCalculator {
    samples:   VecDeque<f64>,
    capacity:  usize,
    precision: u32,
    policy:    BufferPolicy,
}

impl TrendCalculator {
    pub fn new(capacity: usize, precision: u32, policy: BufferPolicy) -> Result<Self> {
        if capacity == 0 {
            return Err(TrendError::InvalidSteps(capacity));
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            precision,
            policy,
        })
    }

    /// Push a new sample; returns the trend when the window is full.
    pub fn observe(&mut self, value: f64) -> Option<f64> {
        self.samples.push_back(value);
        if self.samples.len() < self.capacity {
            return None;
        }

        let latest = value;
        let trend = round_to(latest - self.average(), self.precision);

        match self.policy {
            BufferPolicy::Reset => self.samples.clear(),
            BufferPolicy::Slide => {
                self.samples.pop_front();
            }
        }
        Some(trend)
    }

    /// Average of all samples currently in the window (0 when empty).
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let n = self.samples.len() as f64;
        let sum = self.samples.iter().sum::<f64>();
        if sum.is_finite() {
            return sum / n;
        }
        // Sum overflowed; scale each term first.
        self.samples.iter().map(|v| v / n).sum()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> BufferPolicy {
        self.policy
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Change the window size. Pending samples are discarded.
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(TrendError::InvalidSteps(capacity));
        }
        self.capacity = capacity;
        self.samples = VecDeque::with_capacity(capacity);
        Ok(())
    }

    /// Switch policy; the window restarts empty if it actually changed.
    pub fn set_policy(&mut self, policy: BufferPolicy) {
        if self.policy != policy {
            self.policy = policy;
            self.samples.clear();
        }
    }

    pub fn set_precision(&mut self, precision: u32) {
        self.precision = precision;
    }
}

/// Round half away from zero to `precision` decimals; `-0.0` becomes `0.0`.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let scaled = value * factor;
    let rounded = if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    };
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset(capacity: usize) -> TrendCalculator {
        TrendCalculator::new(capacity, 2, BufferPolicy::Reset).unwrap()
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            TrendCalculator::new(0, 2, BufferPolicy::Reset),
            Err(TrendError::InvalidSteps(0))
        ));
    }

    #[test]
    fn trend_is_latest_minus_mean() {
        let mut calc = reset(5);
        for v in [10.0, 10.0, 10.0, 10.0] {
            assert_eq!(calc.observe(v), None);
        }
        assert_eq!(calc.observe(13.0), Some(2.4));
    }

    #[test]
    fn emits_exactly_once_per_window_then_resets() {
        let mut calc = reset(3);
        let emitted: Vec<_> = (0..3).filter_map(|i| calc.observe(i as f64)).collect();

        assert_eq!(emitted.len(), 1);
        assert!(calc.is_empty());

        // Next window needs three fresh samples.
        assert_eq!(calc.observe(1.0), None);
        assert_eq!(calc.observe(1.0), None);
        assert_eq!(calc.observe(1.0), Some(0.0));
    }

    #[test]
    fn slide_keeps_capacity_minus_one() {
        let mut calc = TrendCalculator::new(3, 2, BufferPolicy::Slide).unwrap();
        assert_eq!(calc.observe(1.0), None);
        assert_eq!(calc.observe(2.0), None);
        assert_eq!(calc.observe(3.0), Some(1.0));
        assert_eq!(calc.len(), 2);

        // Window is now [2, 3, 6] → 6 - 11/3 = 2.33
        assert_eq!(calc.observe(6.0), Some(2.33));
        assert_eq!(calc.len(), 2);
    }

    #[test]
    fn never_exceeds_capacity() {
        for policy in [BufferPolicy::Reset, BufferPolicy::Slide] {
            let mut calc = TrendCalculator::new(4, 2, policy).unwrap();
            for i in 0..25 {
                calc.observe(i as f64);
                assert!(calc.len() < calc.capacity());
            }
        }
    }

    #[test]
    fn capacity_one_always_emits_zero() {
        let mut calc = reset(1);
        assert_eq!(calc.observe(42.0), Some(0.0));
        assert_eq!(calc.observe(-7.5), Some(0.0));
    }

    #[test]
    fn negative_zero_normalized() {
        let r = round_to(-0.001, 2);
        assert_eq!(r, 0.0);
        assert!(r.is_sign_positive());

        let mut calc = reset(2);
        calc.observe(-1.0);
        let trend = calc.observe(-1.0).unwrap();
        assert!(trend.is_sign_positive());
    }

    #[test]
    fn huge_identical_samples_trend_to_zero() {
        let mut calc = reset(2);
        assert_eq!(calc.observe(1e308), None);
        assert_eq!(calc.observe(1e308), Some(0.0));
    }

    #[test]
    fn huge_trend_stays_finite() {
        let mut calc = reset(2);
        calc.observe(0.0);
        let trend = calc.observe(1e307).unwrap();
        assert!(trend.is_finite());
        assert_eq!(trend, 5e306);
    }

    #[test]
    fn rounding_leaves_unscalable_values_alone() {
        assert_eq!(round_to(5e306, 2), 5e306);
        assert_eq!(round_to(-1e308, 6), -1e308);
    }

    #[test]
    fn precision_controls_rounding() {
        assert_eq!(round_to(2.345_67, 1), 2.3);
        assert_eq!(round_to(2.345_67, 3), 2.346);
        assert_eq!(round_to(-1.25, 0), -1.0);
    }

    #[test]
    fn resize_discards_partial_window() {
        let mut calc = reset(5);
        calc.observe(1.0);
        calc.observe(2.0);

        calc.resize(2).unwrap();
        assert!(calc.is_empty());
        assert_eq!(calc.capacity(), 2);
        assert!(calc.resize(0).is_err());
        assert_eq!(calc.capacity(), 2);
    }

    #[test]
    fn policy_change_clears_window() {
        let mut calc = reset(3);
        calc.observe(1.0);
        calc.set_policy(BufferPolicy::Reset);
        assert_eq!(calc.len(), 1);
        calc.set_policy(BufferPolicy::Slide);
        assert!(calc.is_empty());
    }
}
