//! Candle stream timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timeframe of a candle stream, ordered by duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    #[default]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
}

const MINUTE_MS: u64 = 60_000;

impl Timeframe {
    const ALL: [Timeframe; 8] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Daily,
        Timeframe::Weekly,
    ];

    /// Candle duration in milliseconds.
    pub fn as_millis(&self) -> u64 {
        let minutes = match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Minute30 => 30,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Daily => 1_440,
            Timeframe::Weekly => 10_080,
        };
        minutes * MINUTE_MS
    }

    /// Short label, also used for serde and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == label)
            .ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations() {
        assert_eq!(Timeframe::Minute15.as_millis(), 900_000);
        assert_eq!(Timeframe::Hour4.as_millis(), 4 * 3_600_000);
        assert_eq!(Timeframe::Weekly.as_millis(), 7 * Timeframe::Daily.as_millis());
    }

    #[test]
    fn test_parse_and_display_agree() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.to_string().parse::<Timeframe>(), Ok(tf));
        }
        assert_eq!(" 4H ".parse::<Timeframe>(), Ok(Timeframe::Hour4));
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_ordering_follows_duration() {
        for pair in Timeframe::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].as_millis() < pair[1].as_millis());
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Timeframe::Minute15).unwrap();
        assert_eq!(json, "\"15m\"");
        let parsed: Timeframe = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(parsed, Timeframe::Hour4);
    }
}
