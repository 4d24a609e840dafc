//! Filesystem cache for pipeline artifacts. Every save is an explicit step
//! separate from the transforms, writing timestamped CSVs under a
//! ticker-scoped directory; `load_latest` resolves the newest matching file
//! by modification time. Concurrent writers targeting the same ticker and
//! date race last-writer-wins; no locking is provided.

use crate::config::DataLayout;
use crate::error::{DataError, Result};
use crate::features::FeatureTable;
use crate::models::{normalize_ticker, Candle, Period, PriceSeries};
use crate::normalize::MinMaxScaler;
use chrono::{DateTime, Utc};
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Kind of cached artifact, selecting directory and filename pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Raw,
    Processed,
    Normalized,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Raw => "raw",
            DataKind::Processed => "processed",
            DataKind::Normalized => "normalized",
        }
    }

    fn dir(&self, layout: &DataLayout) -> PathBuf {
        match self {
            DataKind::Raw => layout.raw_dir(),
            DataKind::Processed => layout.processed_dir(),
            DataKind::Normalized => layout.normalized_dir(),
        }
    }

    fn file_prefix(&self, ticker: &str) -> String {
        match self {
            DataKind::Raw => format!("{}_", ticker),
            DataKind::Processed | DataKind::Normalized => format!("{}_features_", ticker),
        }
    }
}

fn date_stamp() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn ticker_dir(kind: DataKind, ticker: &str, layout: &DataLayout) -> PathBuf {
    kind.dir(layout).join(ticker)
}

/// Writes a raw price series as `<TICKER>_<period>_<date>.csv`.
pub fn save_raw(series: &PriceSeries, period: Period, layout: &DataLayout) -> Result<PathBuf> {
    let dir = ticker_dir(DataKind::Raw, series.ticker(), layout);
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(format!(
        "{}_{}_{}.csv",
        series.ticker(),
        period.as_str(),
        date_stamp()
    ));
    let mut writer = BufWriter::new(File::create(&path)?);
    writeln!(writer, "date,open,high,low,close,volume")?;
    for candle in series.candles() {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            candle.date.to_rfc3339(),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        )?;
    }
    writer.flush()?;

    info!(
        "Saved {} raw rows for {} to {}",
        series.len(),
        series.ticker(),
        path.display()
    );
    Ok(path)
}

fn write_table(table: &FeatureTable, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let header: Vec<&str> = table.column_names().collect();
    writeln!(writer, "date,{}", header.join(","))?;
    for row in 0..table.len() {
        let cells: Vec<String> = table
            .columns()
            .iter()
            .map(|column| column.values[row].to_string())
            .collect();
        writeln!(
            writer,
            "{},{}",
            table.dates()[row].to_rfc3339(),
            cells.join(",")
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a feature table as `<TICKER>_features_<date>.csv` under the
/// processed directory.
pub fn save_features(table: &FeatureTable, ticker: &str, layout: &DataLayout) -> Result<PathBuf> {
    let ticker = normalize_ticker(ticker)?;
    let dir = ticker_dir(DataKind::Processed, &ticker, layout);
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{}_features_{}.csv", ticker, date_stamp()));
    write_table(table, &path)?;

    info!(
        "Saved feature set for {} ({} rows, {} columns) to {}",
        ticker,
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(path)
}

/// Writes a normalized feature table plus its fitted scaler side by side
/// under the normalized directory. Persisting the scaler is what makes the
/// transform reusable on held-out data.
pub fn save_normalized(
    table: &FeatureTable,
    scaler: &MinMaxScaler,
    ticker: &str,
    layout: &DataLayout,
) -> Result<(PathBuf, PathBuf)> {
    let ticker = normalize_ticker(ticker)?;
    let dir = ticker_dir(DataKind::Normalized, &ticker, layout);
    std::fs::create_dir_all(&dir)?;

    let stamp = date_stamp();
    let table_path = dir.join(format!("{}_features_{}.csv", ticker, stamp));
    write_table(table, &table_path)?;

    let scaler_path = dir.join(format!("{}_scaler_{}.json", ticker, stamp));
    let json = serde_json::to_string_pretty(scaler)
        .map_err(|e| DataError::Parse(format!("scaler encode failed: {}", e)))?;
    std::fs::write(&scaler_path, json)?;

    info!(
        "Saved normalized feature set for {} to {} (scaler: {})",
        ticker,
        table_path.display(),
        scaler_path.display()
    );
    Ok((table_path, scaler_path))
}

/// Newest file in `dir` matching `prefix`/`suffix`, by modification time.
fn latest_file(dir: &Path, prefix: &str, suffix: &str) -> Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) || !name.ends_with(suffix) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest
            .as_ref()
            .map(|(time, _)| modified > *time)
            .unwrap_or(true)
        {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

fn resolve_latest(ticker: &str, kind: DataKind, layout: &DataLayout) -> Result<PathBuf> {
    let dir = ticker_dir(kind, ticker, layout);
    latest_file(&dir, &kind.file_prefix(ticker), ".csv")?.ok_or_else(|| DataError::NotFound {
        ticker: ticker.to_string(),
        kind: kind.as_str().to_string(),
    })
}

fn parse_date(raw: &str, path: &Path) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| DataError::Parse(format!("bad date '{}' in {}", raw, path.display())))
}

fn parse_value(raw: &str, path: &Path) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| DataError::Parse(format!("bad number '{}' in {}", raw, path.display())))
}

/// Loads the newest cached raw series for a ticker.
pub fn load_latest_series(ticker: &str, layout: &DataLayout) -> Result<PriceSeries> {
    let ticker = normalize_ticker(ticker)?;
    let path = resolve_latest(&ticker, DataKind::Raw, layout)?;
    read_series_csv(&ticker, &path)
}

fn read_series_csv(ticker: &str, path: &Path) -> Result<PriceSeries> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| DataError::Parse(format!("empty file {}", path.display())))?;
    if header.trim() != "date,open,high,low,close,volume" {
        return Err(DataError::Parse(format!(
            "unexpected header in {}",
            path.display()
        )));
    }

    let mut candles = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 6 {
            return Err(DataError::Parse(format!(
                "expected 6 fields, got {} in {}",
                fields.len(),
                path.display()
            )));
        }
        candles.push(Candle {
            date: parse_date(fields[0], path)?,
            open: parse_value(fields[1], path)?,
            high: parse_value(fields[2], path)?,
            low: parse_value(fields[3], path)?,
            close: parse_value(fields[4], path)?,
            volume: parse_value(fields[5], path)?,
        });
    }

    PriceSeries::new(ticker, candles)
}

/// Loads the newest cached feature table of the given kind for a ticker.
pub fn load_latest_features(
    ticker: &str,
    kind: DataKind,
    layout: &DataLayout,
) -> Result<FeatureTable> {
    if kind == DataKind::Raw {
        return Err(DataError::InvalidArgument(
            "raw data loads as a price series, not a feature table".to_string(),
        ));
    }
    let ticker = normalize_ticker(ticker)?;
    let path = resolve_latest(&ticker, kind, layout)?;
    read_table_csv(&path)
}

fn read_table_csv(path: &Path) -> Result<FeatureTable> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| DataError::Parse(format!("empty file {}", path.display())))?;

    let mut names = header.trim().split(',');
    if names.next() != Some("date") {
        return Err(DataError::Parse(format!(
            "missing date column in {}",
            path.display()
        )));
    }
    let names: Vec<String> = names.map(|name| name.to_string()).collect();
    if names.is_empty() {
        return Err(DataError::Parse(format!(
            "no feature columns in {}",
            path.display()
        )));
    }

    let mut dates = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != names.len() + 1 {
            return Err(DataError::Parse(format!(
                "expected {} fields, got {} in {}",
                names.len() + 1,
                fields.len(),
                path.display()
            )));
        }
        dates.push(parse_date(fields[0], path)?);
        for (column, raw) in columns.iter_mut().zip(&fields[1..]) {
            column.push(parse_value(raw, path)?);
        }
    }

    let mut table = FeatureTable::new(dates);
    for (name, values) in names.into_iter().zip(columns) {
        table.push_column(name, values)?;
    }
    Ok(table)
}

/// Loads a fitted scaler previously written by `save_normalized`.
pub fn load_scaler(path: &Path) -> Result<MinMaxScaler> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| DataError::Parse(format!("scaler decode failed for {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn sample_series(len: usize) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let candles = (0..len)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle {
                    date: base + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0 + i as f64 * 10.0,
                }
            })
            .collect();
        PriceSeries::new("TEST", candles).unwrap()
    }

    #[test]
    fn raw_series_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure().unwrap();

        let series = sample_series(20);
        let path = save_raw(&series, Period::Year1, &layout).unwrap();
        assert!(path.exists());

        let loaded = load_latest_series("TEST", &layout).unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn latest_file_prefers_newest_mtime() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure().unwrap();

        let older = sample_series(5);
        save_raw(&older, Period::Year1, &layout).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(25));
        let newer = sample_series(9);
        save_raw(&newer, Period::Year2, &layout).unwrap();

        let loaded = load_latest_series("TEST", &layout).unwrap();
        assert_eq!(loaded.len(), 9);
    }

    #[test]
    fn missing_cache_is_not_found() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure().unwrap();

        let result = load_latest_series("ZZZZ", &layout);
        assert!(matches!(result, Err(DataError::NotFound { .. })));

        let features = load_latest_features("ZZZZ", DataKind::Processed, &layout);
        assert!(matches!(features, Err(DataError::NotFound { .. })));
    }

    #[test]
    fn feature_table_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure().unwrap();

        let series = sample_series(6);
        let mut table = FeatureTable::from_series(&series);
        table
            .push_column("ema_3", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();

        save_features(&table, "TEST", &layout).unwrap();
        let loaded = load_latest_features("TEST", DataKind::Processed, &layout).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn scaler_round_trips_through_json() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure().unwrap();

        let series = sample_series(6);
        let table = FeatureTable::from_series(&series);
        let (normalized, scaler) =
            crate::normalize::normalize_features(&table, &[]).unwrap();

        let (_, scaler_path) = save_normalized(&normalized, &scaler, "TEST", &layout).unwrap();
        let loaded = load_scaler(&scaler_path).unwrap();
        assert_eq!(loaded, scaler);
    }
}
