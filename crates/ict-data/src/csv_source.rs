//! CSV candle source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ict_core::error::DataError;
use ict_core::traits::CandleFeed;
use ict_core::types::{Candle, Timeframe};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "timestamp",
        alias = "Timestamp",
        alias = "open_time",
        alias = "time"
    )]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Load candles from a CSV file in file order.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>, DataError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(format!("{}: {}", path.display(), e)))?;

    let mut candles = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let record: CsvRecord = result
            .map_err(|e| DataError::ParseError(format!("{} row {}: {}", path.display(), line + 1, e)))?;
        let open_time = parse_timestamp(&record.date)?;
        candles.push(Candle::new(
            open_time,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    debug!(path = %path.display(), candles = candles.len(), "CSV loaded");
    Ok(candles)
}

/// Parse a timestamp into Unix milliseconds.
///
/// Accepts RFC 3339, common date and datetime layouts, and Unix seconds or
/// milliseconds.
pub fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.timestamp_millis());
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = date_str.parse::<i64>() {
        // Assume milliseconds if > 10 digits
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

/// Candle feed backed by one CSV file per instrument and timeframe.
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    files: HashMap<(String, Timeframe), PathBuf>,
    replay_delay: Option<Duration>,
    channel_capacity: usize,
}

impl CsvCandleSource {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            replay_delay: None,
            channel_capacity: 256,
        }
    }

    /// Register the file for `instrument` on `timeframe`.
    pub fn with_file(
        mut self,
        instrument: impl Into<String>,
        timeframe: Timeframe,
        path: impl Into<PathBuf>,
    ) -> Result<Self, DataError> {
        self.register(instrument, timeframe, path)?;
        Ok(self)
    }

    pub fn register(
        &mut self,
        instrument: impl Into<String>,
        timeframe: Timeframe,
        path: impl Into<PathBuf>,
    ) -> Result<(), DataError> {
        let path = path.into();
        if !path.exists() {
            return Err(DataError::Internal(format!("{} does not exist", path.display())));
        }
        self.files.insert((instrument.into(), timeframe), path);
        Ok(())
    }

    /// Pause between candles when replaying a subscription.
    pub fn with_replay_delay(mut self, delay: Duration) -> Self {
        self.replay_delay = Some(delay);
        self
    }

    pub fn instruments(&self) -> Vec<String> {
        let mut instruments: Vec<String> = self.files.keys().map(|(i, _)| i.clone()).collect();
        instruments.sort();
        instruments.dedup();
        instruments
    }

    /// All candles for `instrument` on `timeframe`, sorted by open time.
    pub fn load(&self, instrument: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        let path = self
            .files
            .get(&(instrument.to_string(), timeframe))
            .ok_or_else(|| DataError::InstrumentNotFound(format!("{} {}", instrument, timeframe)))?;
        let mut candles = load_csv(path)?;
        candles.sort_by_key(|c| c.open_time);
        Ok(candles)
    }
}

impl Default for CsvCandleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleFeed for CsvCandleSource {
    async fn history(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        let (start, end) = (start.timestamp_millis(), end.timestamp_millis());
        let candles: Vec<Candle> = self
            .load(instrument, timeframe)?
            .into_iter()
            .filter(|c| c.open_time >= start && c.open_time <= end)
            .collect();
        if candles.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(candles)
    }

    async fn subscribe(
        &self,
        instruments: &[String],
        timeframe: Timeframe,
    ) -> Result<mpsc::Receiver<(String, Candle)>, DataError> {
        let mut stream = Vec::new();
        for instrument in instruments {
            for candle in self.load(instrument, timeframe)? {
                stream.push((instrument.clone(), candle));
            }
        }
        // Interleave instruments by time, keeping per-instrument order
        stream.sort_by_key(|(_, c)| c.open_time);

        let (tx, rx) = mpsc::channel(self.channel_capacity.max(1));
        let delay = self.replay_delay;
        let total = stream.len();
        info!(%timeframe, instruments = instruments.len(), candles = total, "CSV replay started");

        tokio::spawn(async move {
            for item in stream {
                if tx.send(item).await.is_err() {
                    warn!(%timeframe, "CSV replay receiver dropped");
                    return;
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
            debug!(%timeframe, candles = total, "CSV replay finished");
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ict-data-{}-{}.csv", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), 1_705_276_800_000);
        assert_eq!(
            parse_timestamp("2024-01-15 10:30:00").unwrap(),
            1_705_276_800_000 + (10 * 60 + 30) * 60_000
        );
        assert_eq!(parse_timestamp("2024-01-15T00:00:00Z").unwrap(), 1_705_276_800_000);
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000);
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_csv_with_aliases() {
        let path = write_csv(
            "aliases",
            "Timestamp,Open,High,Low,Close,Volume\n\
             2024-01-01 00:15:00,101,102,100,101.5,10\n\
             2024-01-01 00:00:00,100,101,99,100.5,12\n",
        );
        let candles = load_csv(&path).unwrap();
        assert_eq!(candles.len(), 2);
        // File order is preserved
        assert!(candles[0].open_time > candles[1].open_time);
        assert_eq!(candles[1].volume, 12.0);
    }

    #[tokio::test]
    async fn test_history_filters_and_sorts() {
        let path = write_csv(
            "history",
            "date,open,high,low,close\n\
             1704067200,100,101,99,100\n\
             1704068100,100,102,99,101\n\
             1704069000,101,103,100,102\n",
        );
        let source = CsvCandleSource::new()
            .with_file("BTCUSDT", Timeframe::Minute15, &path)
            .unwrap();

        let start = DateTime::from_timestamp(1_704_068_100, 0).unwrap();
        let end = DateTime::from_timestamp(1_704_069_000, 0).unwrap();
        let candles = source
            .history("BTCUSDT", Timeframe::Minute15, start, end)
            .await
            .unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 101.0);

        assert!(matches!(
            source.history("ETHUSDT", Timeframe::Minute15, start, end).await,
            Err(DataError::InstrumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_replays_in_time_order() {
        let btc = write_csv("sub-btc", "date,open,high,low,close\n0,1,2,0.5,1.5\n900,1,2,0.5,1.5\n");
        let eth = write_csv("sub-eth", "date,open,high,low,close\n450,1,2,0.5,1.5\n");
        let source = CsvCandleSource::new()
            .with_file("BTCUSDT", Timeframe::Minute15, &btc)
            .unwrap()
            .with_file("ETHUSDT", Timeframe::Minute15, &eth)
            .unwrap();

        let mut rx = source
            .subscribe(&["BTCUSDT".to_string(), "ETHUSDT".to_string()], Timeframe::Minute15)
            .await
            .unwrap();
        let mut received = Vec::new();
        while let Some((instrument, candle)) = rx.recv().await {
            received.push((instrument, candle.open_time));
        }
        assert_eq!(
            received,
            vec![
                ("BTCUSDT".to_string(), 0),
                ("ETHUSDT".to_string(), 450_000),
                ("BTCUSDT".to_string(), 900_000),
            ]
        );
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(CsvCandleSource::new()
            .with_file("BTCUSDT", Timeframe::Hour1, "/nonexistent/ict.csv")
            .is_err());
    }
}
