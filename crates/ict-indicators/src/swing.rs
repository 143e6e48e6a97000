//! Swing point (pivot) extraction.
//!
//! Candle `i` is a swing high when its high is strictly greater than every
//! high in `[i - radius, i)` and greater than or equal to every high in
//! `(i, i + radius]`, so a plateau resolves to its earliest candle. Swing
//! lows mirror this on the lows. One candle may be both.
//!
//! Points are confirmed with a lag of `radius` candles: the streaming
//! [`SwingDetector`] emits the point for candle `i` when candle `i + radius`
//! arrives.

use std::collections::VecDeque;

use ict_core::traits::CandleIndicator;
use ict_core::types::{Candle, SwingKind, SwingPoint};

/// Classify the candle at `center` within `window`.
///
/// Returns `(is_high, is_low)`.
fn classify(window: &[Candle], center: usize) -> (bool, bool) {
    let pivot = &window[center];
    let (before, rest) = window.split_at(center);
    let after = &rest[1..];

    let is_high = before.iter().all(|c| c.high < pivot.high)
        && after.iter().all(|c| c.high <= pivot.high);
    let is_low =
        before.iter().all(|c| c.low > pivot.low) && after.iter().all(|c| c.low >= pivot.low);

    (is_high, is_low)
}

fn points_at(window: &[Candle], center: usize, index: u64) -> impl Iterator<Item = SwingPoint> {
    let pivot = window[center];
    let (is_high, is_low) = classify(window, center);
    let high = is_high.then(|| SwingPoint::new(index, pivot.open_time, pivot.high, SwingKind::High));
    let low = is_low.then(|| SwingPoint::new(index, pivot.open_time, pivot.low, SwingKind::Low));
    high.into_iter().chain(low)
}

/// Lazily extract swing points from a candle slice.
///
/// `index` on each point is the position in `candles`. Fewer than
/// `2 * radius + 1` candles yields nothing.
pub fn swing_points(candles: &[Candle], radius: usize) -> impl Iterator<Item = SwingPoint> + '_ {
    candles
        .windows(2 * radius + 1)
        .enumerate()
        .flat_map(move |(start, window)| points_at(window, radius, (start + radius) as u64))
}

/// Streaming swing detector over a ring of `2 * radius + 1` candles.
#[derive(Debug, Clone)]
pub struct SwingDetector {
    radius: usize,
    ring: VecDeque<Candle>,
    /// Sequence number of the next candle pushed
    next_index: u64,
}

impl SwingDetector {
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            ring: VecDeque::with_capacity(2 * radius + 1),
            next_index: 0,
        }
    }

    /// Feed the next closed candle.
    ///
    /// Returns the points confirmed by this candle (zero, one, or a high and
    /// a low for the same candle).
    pub fn push(&mut self, candle: Candle) -> Vec<SwingPoint> {
        let span = 2 * self.radius + 1;
        self.ring.push_back(candle);
        if self.ring.len() > span {
            self.ring.pop_front();
        }
        self.next_index += 1;

        if self.ring.len() < span {
            return Vec::new();
        }

        let center_index = self.next_index - 1 - self.radius as u64;
        let window = self.ring.make_contiguous();
        points_at(window, self.radius, center_index).collect()
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn reset(&mut self) {
        self.ring.clear();
        self.next_index = 0;
    }
}

/// Bounded window of confirmed swing points, oldest first.
///
/// Consecutive same-kind points collapse to the more extreme one, so the
/// retained sequence alternates between highs and lows.
#[derive(Debug, Clone)]
pub struct SwingWindow {
    capacity: usize,
    points: VecDeque<SwingPoint>,
}

impl SwingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            points: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Insert a confirmed point. Returns `false` if it was absorbed by a more
    /// extreme point of the same kind.
    pub fn push(&mut self, point: SwingPoint) -> bool {
        if let Some(last) = self.points.back_mut() {
            if last.kind == point.kind {
                if point.kind.is_more_extreme(point.price, last.price) {
                    *last = point;
                    return true;
                }
                return false;
            }
        }

        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        true
    }

    /// The most recent `n` points, oldest first.
    pub fn recent(&self, n: usize) -> Vec<SwingPoint> {
        let skip = self.points.len().saturating_sub(n);
        self.points.iter().skip(skip).copied().collect()
    }

    /// Iterate newest first.
    pub fn iter_newest(&self) -> impl Iterator<Item = &SwingPoint> {
        self.points.iter().rev()
    }

    pub fn latest(&self, kind: SwingKind) -> Option<&SwingPoint> {
        self.iter_newest().find(|p| p.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Batch swing extraction as a [`CandleIndicator`].
#[derive(Debug, Clone)]
pub struct SwingExtractor {
    radius: usize,
}

impl SwingExtractor {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }
}

impl CandleIndicator for SwingExtractor {
    type Output = SwingPoint;

    fn calculate(&self, candles: &[Candle]) -> Vec<SwingPoint> {
        swing_points(candles, self.radius).collect()
    }

    fn period(&self) -> usize {
        2 * self.radius + 1
    }

    fn name(&self) -> &str {
        "Swing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, high: f64, low: f64) -> Candle {
        let mid = (high + low) / 2.0;
        Candle::new(i * 60_000, mid, high, low, mid, 1.0)
    }

    fn series(highs: &[f64]) -> Vec<Candle> {
        highs
            .iter()
            .enumerate()
            .map(|(i, &h)| candle(i as i64, h, h - 1.0))
            .collect()
    }

    #[test]
    fn test_single_peak() {
        let candles = series(&[10.0, 11.0, 12.0, 15.0, 12.0, 11.0, 10.0]);
        let highs: Vec<_> = swing_points(&candles, 2)
            .filter(|p| p.kind == SwingKind::High)
            .collect();

        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 3);
        assert_eq!(highs[0].price, 15.0);
        assert_eq!(highs[0].time, 3 * 60_000);
    }

    #[test]
    fn test_plateau_resolves_to_earliest() {
        let candles = series(&[10.0, 11.0, 15.0, 15.0, 11.0, 10.0, 9.0]);
        let highs: Vec<_> = swing_points(&candles, 2)
            .filter(|p| p.kind == SwingKind::High)
            .collect();

        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 2);
    }

    #[test]
    fn test_too_few_candles_is_empty() {
        let candles = series(&[10.0, 11.0, 12.0, 11.0]);
        assert_eq!(swing_points(&candles, 2).count(), 0);
        assert_eq!(swing_points(&[], 2).count(), 0);
    }

    #[test]
    fn test_candle_can_be_high_and_low() {
        let candles = vec![
            candle(0, 10.0, 9.0),
            candle(1, 20.0, 1.0),
            candle(2, 10.0, 9.0),
        ];
        let points: Vec<_> = swing_points(&candles, 1).collect();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.index == 1));
    }

    #[test]
    fn test_streaming_matches_batch_with_lag() {
        let highs: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i as f64) * 0.45).sin() * 5.0)
            .collect();
        let candles = series(&highs);
        let radius = 3;

        let batch: Vec<_> = swing_points(&candles, radius).collect();

        let mut detector = SwingDetector::new(radius);
        let mut streamed = Vec::new();
        for (i, c) in candles.iter().enumerate() {
            for point in detector.push(*c) {
                // Never confirmed before `radius` candles after the pivot
                assert_eq!(point.index + radius as u64, i as u64);
                streamed.push(point);
            }
        }

        assert_eq!(streamed, batch);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_no_duplicate_high_per_index() {
        let highs: Vec<f64> = (0..40).map(|i| ((i % 7) as f64).min(4.0)).collect();
        let candles = series(&highs);
        let mut seen = std::collections::HashSet::new();
        for p in swing_points(&candles, 2).filter(|p| p.kind == SwingKind::High) {
            assert!(seen.insert(p.index));
        }
    }

    #[test]
    fn test_window_merges_same_kind() {
        let mut window = SwingWindow::new(10);
        window.push(SwingPoint::new(1, 0, 100.0, SwingKind::Low));
        assert!(window.push(SwingPoint::new(3, 0, 99.0, SwingKind::Low)));
        assert!(!window.push(SwingPoint::new(5, 0, 99.5, SwingKind::Low)));

        assert_eq!(window.len(), 1);
        assert_eq!(window.latest(SwingKind::Low).map(|p| p.index), Some(3));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = SwingWindow::new(3);
        for i in 0..6u64 {
            let kind = if i % 2 == 0 { SwingKind::High } else { SwingKind::Low };
            window.push(SwingPoint::new(i, i as i64, 100.0 + i as f64, kind));
        }
        assert_eq!(window.len(), 3);
        let indices: Vec<u64> = window.recent(3).iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![3, 4, 5]);
        assert_eq!(window.recent(2).len(), 2);
    }

    #[test]
    fn test_extractor_indicator() {
        let candles = series(&[10.0, 11.0, 15.0, 11.0, 10.0]);
        let extractor = SwingExtractor::new(2);
        assert_eq!(extractor.period(), 5);
        assert_eq!(extractor.calculate(&candles).len(), 1);
    }
}
