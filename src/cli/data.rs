//! Locating CSV files for instruments.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ict_core::types::Timeframe;
use ict_data::{validate_series, CsvCandleSource};

/// Find the CSV file for `instrument` on `timeframe` under `dir`.
///
/// Accepts `BTCUSDT_15m.csv`, `btcusdt_15m.csv`, `BTCUSDT-15m.csv` and
/// `BTCUSDT/15m.csv`.
pub fn find_csv(dir: &Path, instrument: &str, timeframe: Timeframe) -> Result<PathBuf> {
    let lower = instrument.to_lowercase();
    let candidates = [
        dir.join(format!("{}_{}.csv", instrument, timeframe)),
        dir.join(format!("{}_{}.csv", lower, timeframe)),
        dir.join(format!("{}-{}.csv", instrument, timeframe)),
        dir.join(instrument).join(format!("{}.csv", timeframe)),
    ];
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .with_context(|| {
            format!(
                "No {} data for {} in '{}' (expected e.g. {}_{}.csv)",
                timeframe,
                instrument,
                dir.display(),
                instrument,
                timeframe
            )
        })
}

/// Register both timeframes of every instrument with a CSV source.
pub fn csv_source(
    dir: &Path,
    instruments: &[String],
    timeframes: [Timeframe; 2],
) -> Result<CsvCandleSource> {
    if !dir.is_dir() {
        bail!(
            "Data path '{}' is not a directory. Provide a directory of CSV files (e.g. --data ./data)",
            dir.display()
        );
    }

    let mut source = CsvCandleSource::new();
    for instrument in instruments {
        for timeframe in timeframes {
            let path = find_csv(dir, instrument, timeframe)?;
            source.register(instrument.clone(), timeframe, path)?;
        }
    }
    info!(instruments = instruments.len(), "Data files located");
    Ok(source)
}

/// Log series problems the engine would reject or report as gaps.
pub fn preflight(source: &CsvCandleSource, instrument: &str, timeframe: Timeframe) -> Result<()> {
    let candles = source.load(instrument, timeframe)?;
    let report = validate_series(&candles, timeframe);
    if !report.is_clean() {
        warn!(
            instrument,
            %timeframe,
            candles = report.candles,
            gaps = report.gaps(),
            rejections = report.rejections(),
            "Series has issues"
        );
        for issue in report.issues.iter().take(5) {
            warn!(instrument, %timeframe, %issue, "Series issue");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_csv_variants() {
        let dir = std::env::temp_dir().join(format!("ict-cli-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("ETHUSDT")).unwrap();
        std::fs::write(dir.join("btcusdt_4h.csv"), "date,open,high,low,close\n").unwrap();
        std::fs::write(dir.join("ETHUSDT").join("15m.csv"), "date,open,high,low,close\n").unwrap();

        assert!(find_csv(&dir, "BTCUSDT", Timeframe::Hour4).is_ok());
        assert!(find_csv(&dir, "ETHUSDT", Timeframe::Minute15).is_ok());
        assert!(find_csv(&dir, "BTCUSDT", Timeframe::Minute15).is_err());
    }
}
