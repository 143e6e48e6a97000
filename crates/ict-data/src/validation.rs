//! Pre-flight checks for a candle series.

use serde::Serialize;
use std::fmt;

use ict_core::types::{Candle, Timeframe};

/// A problem found in a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum SeriesIssue {
    Malformed { index: usize, open_time: i64, reason: String },
    OutOfOrder { index: usize, previous: i64, open_time: i64 },
    Gap { index: usize, expected: i64, open_time: i64 },
}

impl fmt::Display for SeriesIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesIssue::Malformed { index, open_time, reason } => {
                write!(f, "row {} ({}): malformed, {}", index, open_time, reason)
            }
            SeriesIssue::OutOfOrder { index, previous, open_time } => {
                write!(f, "row {}: {} is not after {}", index, open_time, previous)
            }
            SeriesIssue::Gap { index, expected, open_time } => {
                write!(f, "row {}: expected {}, got {}", index, expected, open_time)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesReport {
    pub candles: usize,
    pub issues: Vec<SeriesIssue>,
}

impl SeriesReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn gaps(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, SeriesIssue::Gap { .. }))
            .count()
    }

    /// Issues the engine would reject (everything except gaps).
    pub fn rejections(&self) -> usize {
        self.issues.len() - self.gaps()
    }
}

/// Check a series the way the engine will see it.
///
/// Rejected candles do not advance the reference time, mirroring the
/// engine leaving its state untouched on bad input.
pub fn validate_series(candles: &[Candle], timeframe: Timeframe) -> SeriesReport {
    let interval = timeframe.as_millis() as i64;
    let mut report = SeriesReport {
        candles: candles.len(),
        issues: Vec::new(),
    };
    let mut last: Option<i64> = None;

    for (index, candle) in candles.iter().enumerate() {
        if let Err(reason) = candle.validate() {
            report.issues.push(SeriesIssue::Malformed {
                index,
                open_time: candle.open_time,
                reason,
            });
            continue;
        }
        if let Some(previous) = last {
            if candle.open_time <= previous {
                report.issues.push(SeriesIssue::OutOfOrder {
                    index,
                    previous,
                    open_time: candle.open_time,
                });
                continue;
            }
            let expected = previous + interval;
            if candle.open_time > expected {
                report.issues.push(SeriesIssue::Gap {
                    index,
                    expected,
                    open_time: candle.open_time,
                });
            }
        }
        last = Some(candle.open_time);
    }

    report
}
