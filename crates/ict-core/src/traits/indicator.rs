//! Indicator trait definitions.

use crate::error::IndicatorError;
use crate::types::Candle;

/// Indicator over a single price series, usually closes.
pub trait Indicator: Send + Sync {
    type Output;

    /// One value per full window of `data`, oldest first.
    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Values needed before the first output.
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        if data.len() < self.period() {
            return Err(IndicatorError::InsufficientData {
                required: self.period(),
                available: data.len(),
            });
        }
        Ok(())
    }
}

/// Indicator computed over whole candles rather than a single price series.
pub trait CandleIndicator: Send + Sync {
    type Output;

    /// Values for a candle sequence ordered by open time.
    fn calculate(&self, candles: &[Candle]) -> Vec<Self::Output>;

    /// Candles needed before any output can appear.
    fn period(&self) -> usize;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WindowMax(usize);

    impl Indicator for WindowMax {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            data.windows(self.0)
                .map(|w| w.iter().copied().fold(f64::MIN, f64::max))
                .collect()
        }

        fn period(&self) -> usize {
            self.0
        }

        fn name(&self) -> &str {
            "window_max"
        }
    }

    struct CandleRange;

    impl CandleIndicator for CandleRange {
        type Output = f64;

        fn calculate(&self, candles: &[Candle]) -> Vec<f64> {
            candles.iter().map(Candle::range).collect()
        }

        fn period(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "candle_range"
        }
    }

    #[test]
    fn test_validate_data_reports_shortfall() {
        let indicator = WindowMax(4);
        assert!(matches!(
            indicator.validate_data(&[1.0, 2.0]),
            Err(IndicatorError::InsufficientData { required: 4, available: 2 })
        ));
        assert!(indicator.validate_data(&[1.0, 2.0, 3.0, 4.0]).is_ok());
        assert_eq!(indicator.calculate(&[1.0, 5.0, 2.0, 3.0, 0.5]), vec![5.0, 5.0]);
    }

    #[test]
    fn test_candle_indicator() {
        let candles = [
            Candle::new(0, 10.0, 12.0, 9.0, 11.0, 1.0),
            Candle::new(60_000, 11.0, 11.5, 10.5, 11.0, 1.0),
        ];
        assert_eq!(CandleRange.calculate(&candles), vec![3.0, 1.0]);
    }
}
