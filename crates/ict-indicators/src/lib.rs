//! Indicators used by the ICT engine.
//!
//! - Swing point extraction: batch iterator, streaming detector, bounded window
//! - Simple moving average for the bias fallback

pub mod moving_average;
pub mod swing;

pub use moving_average::Sma;
pub use swing::{swing_points, SwingDetector, SwingExtractor, SwingWindow};
