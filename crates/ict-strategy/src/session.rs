//! Trading session windows.
//!
//! New setups can be restricted to local-time windows of a trading venue.
//! The default windows are the New York kill zones, 07:00-10:00 and
//! 14:00-16:00 America/New_York, both ends inclusive.

use chrono::{DateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use ict_core::error::EngineError;
use ict_core::traits::ComponentConfig;

/// One local-time window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    fn hours(start: u32, end: u32) -> Option<Self> {
        Some(Self::new(
            NaiveTime::from_hms_opt(start, 0, 0)?,
            NaiveTime::from_hms_opt(end, 0, 0)?,
        ))
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Local-time windows in which new setups may be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFilter {
    /// IANA timezone the windows are expressed in
    pub timezone: Tz,
    pub windows: Vec<SessionWindow>,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self::ny_kill_zones()
    }
}

impl SessionFilter {
    /// New York AM and PM kill zones.
    pub fn ny_kill_zones() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            windows: [(7, 10), (14, 16)]
                .into_iter()
                .filter_map(|(start, end)| SessionWindow::hours(start, end))
                .collect(),
        }
    }

    /// Whether the Unix millisecond timestamp falls inside any window.
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        let Some(utc) = DateTime::from_timestamp_millis(timestamp_ms) else {
            return false;
        };
        let local = utc.with_timezone(&self.timezone);
        // Second precision is enough for candle open times
        let Some(time) = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second()) else {
            return false;
        };
        self.windows.iter().any(|w| w.contains(time))
    }
}

impl ComponentConfig for SessionFilter {
    fn validate(&self) -> Result<(), EngineError> {
        if self.windows.is_empty() {
            return Err(EngineError::InvalidConfig(
                "session_filter needs at least one window".into(),
            ));
        }
        if let Some(w) = self.windows.iter().find(|w| w.start > w.end) {
            return Err(EngineError::InvalidConfig(format!(
                "session window {}-{} ends before it starts",
                w.start, w.end
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn millis(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn test_ny_kill_zones_in_winter() {
        let filter = SessionFilter::ny_kill_zones();
        // EST is UTC-5
        assert!(filter.contains(millis(2024, 1, 15, 12, 0)));
        assert!(filter.contains(millis(2024, 1, 15, 15, 0)));
        assert!(filter.contains(millis(2024, 1, 15, 19, 30)));
        assert!(!filter.contains(millis(2024, 1, 15, 15, 1)));
        assert!(!filter.contains(millis(2024, 1, 15, 17, 0)));
        assert!(!filter.contains(millis(2024, 1, 15, 2, 0)));
    }

    #[test]
    fn test_ny_kill_zones_follow_daylight_saving() {
        let filter = SessionFilter::ny_kill_zones();
        // EDT is UTC-4, so 11:00 UTC is 07:00 local
        assert!(filter.contains(millis(2024, 7, 15, 11, 0)));
        assert!(!filter.contains(millis(2024, 1, 15, 11, 0)));
    }

    #[test]
    fn test_validation() {
        assert!(SessionFilter::default().validate().is_ok());

        let empty = SessionFilter {
            windows: Vec::new(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let inverted = SessionFilter {
            windows: vec![SessionWindow::new(
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            )],
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_deserialize_named_timezone() {
        let filter: SessionFilter = serde_json::from_str(
            r#"{"timezone": "Europe/London", "windows": [{"start": "08:00:00", "end": "11:00:00"}]}"#,
        )
        .unwrap();
        assert_eq!(filter.timezone, chrono_tz::Europe::London);
        assert!(filter.contains(millis(2024, 1, 15, 9, 0)));
    }
}
