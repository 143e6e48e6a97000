//! Moving averages for the bias fallback.

use ict_core::traits::Indicator;

/// Simple moving average over the last `period` closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// A zero period is treated as one.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// Mean of the last `period` values, or `None` with too little data.
    pub fn latest(&self, data: &[f64]) -> Option<f64> {
        let start = data.len().checked_sub(self.period)?;
        Some(mean(&data[start..]))
    }

    /// The average as of one value earlier.
    pub fn previous(&self, data: &[f64]) -> Option<f64> {
        match data.split_last() {
            Some((_, earlier)) if earlier.len() >= self.period => self.latest(earlier),
            _ => None,
        }
    }
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        data.windows(self.period).map(mean).collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_series() {
        let result = Sma::new(3).calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(result, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let sma = Sma::new(5);
        assert!(sma.calculate(&[1.0, 2.0, 3.0]).is_empty());
        assert!(sma.latest(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_sma_latest_and_previous() {
        let sma = Sma::new(3);
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sma.latest(&data), Some(3.0));
        assert_eq!(sma.previous(&data), Some(2.0));
        assert_eq!(sma.previous(&data[..3]), None);
    }

    #[test]
    fn test_zero_period_is_clamped() {
        assert_eq!(Sma::new(0).period(), 1);
    }
}
