use crate::config::FeatureParams;
use crate::error::{DataError, Result};
use crate::indicators;
use crate::models::PriceSeries;
use chrono::{DateTime, Utc};

/// Named numeric column aligned to the table's date index.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Date-indexed table of named `f64` columns: the OHLCV base plus every
/// derived feature. Column names are unique; appending a duplicate is an
/// error so indicator and statistics namespaces cannot collide silently.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    dates: Vec<DateTime<Utc>>,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    pub fn new(dates: Vec<DateTime<Utc>>) -> Self {
        Self {
            dates,
            columns: Vec::new(),
        }
    }

    /// Seeds a table with the five OHLCV base columns of a price series.
    pub fn from_series(series: &PriceSeries) -> Self {
        let mut table = Self::new(series.dates());
        for (name, values) in [
            ("open", series.opens()),
            ("high", series.highs()),
            ("low", series.lows()),
            ("close", series.closes()),
            ("volume", series.volumes()),
        ] {
            table.columns.push(FeatureColumn {
                name: name.to_string(),
                values,
            });
        }
        table
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[DateTime<Utc>] {
        &self.dates
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn push_column<S: Into<String>>(&mut self, name: S, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(DataError::InvalidData(format!(
                "duplicate column '{}'",
                name
            )));
        }
        if values.len() != self.dates.len() {
            return Err(DataError::InvalidData(format!(
                "column '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.dates.len()
            )));
        }
        self.columns.push(FeatureColumn { name, values });
        Ok(())
    }

    fn required_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| DataError::InvalidData(format!("missing column '{}'", name)))
    }

    /// Returns a new table keeping only rows where every column is defined.
    /// Removes the union of all warm-up periods in one pass.
    pub fn drop_incomplete_rows(&self) -> FeatureTable {
        let keep: Vec<usize> = (0..self.dates.len())
            .filter(|&row| self.columns.iter().all(|c| c.values[row].is_finite()))
            .collect();

        FeatureTable {
            dates: keep.iter().map(|&row| self.dates[row]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn {
                    name: c.name.clone(),
                    values: keep.iter().map(|&row| c.values[row]).collect(),
                })
                .collect(),
        }
    }
}

/// Computes the technical indicator basket over a price series, appended to
/// the OHLCV base columns. Warm-up rows stay NaN.
pub fn compute_indicators(series: &PriceSeries, params: &FeatureParams) -> Result<FeatureTable> {
    let mut table = FeatureTable::from_series(series);

    let highs = series.highs();
    let lows = series.lows();
    let closes = series.closes();
    let volumes = series.volumes();

    for &window in &params.ma_windows {
        table.push_column(format!("ema_{}", window), indicators::ema(&closes, window))?;
    }

    let bands = indicators::bollinger(&closes, params.bollinger_window, params.bollinger_std);
    table.push_column("bb_lower", bands.lower)?;
    table.push_column("bb_mid", bands.mid)?;
    table.push_column("bb_upper", bands.upper)?;
    table.push_column("bb_bandwidth", bands.bandwidth)?;
    table.push_column("bb_percent", bands.percent)?;

    table.push_column(
        format!("rsi_{}", params.rsi_window),
        indicators::rsi(&closes, params.rsi_window),
    )?;

    let (macd_line, macd_signal, macd_hist) = indicators::macd(
        &closes,
        params.macd_fast,
        params.macd_slow,
        params.macd_signal,
    );
    table.push_column("macd", macd_line)?;
    table.push_column("macd_signal", macd_signal)?;
    table.push_column("macd_hist", macd_hist)?;

    table.push_column(
        "atr",
        indicators::atr(&highs, &lows, &closes, params.atr_window),
    )?;
    table.push_column(
        "cci",
        indicators::cci(&highs, &lows, &closes, params.cci_window),
    )?;
    table.push_column("roc", indicators::roc(&closes, params.roc_window))?;
    table.push_column("obv", indicators::obv(&closes, &volumes))?;

    Ok(table)
}

fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        if values[i - 1] != 0.0 {
            out[i] = (values[i] - values[i - 1]) / values[i - 1];
        }
    }
    out
}

/// Appends return and risk statistics derived from the base columns:
/// simple/log daily returns, compounded cumulative returns, rolling
/// volatility of log returns, volume change and the normalized high-low
/// range.
pub fn append_return_stats(table: &mut FeatureTable, params: &FeatureParams) -> Result<()> {
    let closes = table.required_column("close")?.to_vec();
    let highs = table.required_column("high")?.to_vec();
    let lows = table.required_column("low")?.to_vec();
    let volumes = table.required_column("volume")?.to_vec();

    let daily_return = pct_change(&closes);
    let daily_log_return: Vec<f64> = daily_return.iter().map(|r| r.ln_1p()).collect();

    // Compounded products skip the undefined head the way a cumulative
    // product over a NaN-leading series does.
    let mut cum_return = vec![f64::NAN; closes.len()];
    let mut acc = 1.0;
    for (i, r) in daily_return.iter().enumerate() {
        if r.is_finite() {
            acc *= 1.0 + r;
            cum_return[i] = acc - 1.0;
        }
    }

    let mut cum_log_return = vec![f64::NAN; closes.len()];
    let mut log_sum = 0.0;
    for (i, r) in daily_log_return.iter().enumerate() {
        if r.is_finite() {
            log_sum += r;
            cum_log_return[i] = log_sum.exp() - 1.0;
        }
    }

    table.push_column("daily_return", daily_return)?;
    table.push_column("daily_log_return", daily_log_return.clone())?;
    table.push_column("cum_return", cum_return)?;
    table.push_column("cum_log_return", cum_log_return)?;

    for &window in &params.vol_windows {
        table.push_column(
            format!("volatility_{}", window),
            indicators::rolling_std(&daily_log_return, window),
        )?;
    }

    table.push_column("volume_change", pct_change(&volumes))?;

    let high_low_range: Vec<f64> = highs
        .iter()
        .zip(&lows)
        .zip(&closes)
        .map(|((high, low), close)| (high - low) / close)
        .collect();
    table.push_column("high_low_range", high_low_range)?;

    Ok(())
}

/// Full feature pipeline: indicator basket, then return statistics, then a
/// single pass dropping every row with an undefined value. The surviving
/// range starts at the largest warm-up requirement across all columns.
pub fn build_features(series: &PriceSeries, params: &FeatureParams) -> Result<FeatureTable> {
    let mut table = compute_indicators(series, params)?;
    append_return_stats(&mut table, params)?;
    Ok(table.drop_incomplete_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn constant_series(len: usize, price: f64) -> PriceSeries {
        let base = Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap();
        let candles = (0..len)
            .map(|i| Candle {
                date: base + Duration::days(i as i64),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 1_000.0,
            })
            .collect();
        PriceSeries::new("FLAT", candles).unwrap()
    }

    #[test]
    fn constant_price_returns_are_zero() {
        let series = constant_series(40, 100.0);
        let mut table = FeatureTable::from_series(&series);
        append_return_stats(&mut table, &FeatureParams::default()).unwrap();

        let daily = table.column("daily_return").unwrap();
        let log = table.column("daily_log_return").unwrap();
        let cum = table.column("cum_return").unwrap();
        let cum_log = table.column("cum_log_return").unwrap();
        assert!(daily[0].is_nan());
        for i in 1..series.len() {
            assert_eq!(daily[i], 0.0);
            assert_eq!(log[i], 0.0);
            assert!(cum[i].abs() < 1e-12);
            assert!(cum_log[i].abs() < 1e-12);
        }
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let series = constant_series(5, 10.0);
        let mut table = FeatureTable::from_series(&series);
        let err = table.push_column("close", vec![0.0; 5]);
        assert!(matches!(err, Err(DataError::InvalidData(_))));
    }

    #[test]
    fn column_length_must_match_index() {
        let series = constant_series(5, 10.0);
        let mut table = FeatureTable::from_series(&series);
        let err = table.push_column("short", vec![0.0; 3]);
        assert!(matches!(err, Err(DataError::InvalidData(_))));
    }

    #[test]
    fn drop_incomplete_rows_removes_warmups() {
        let series = constant_series(10, 10.0);
        let mut table = FeatureTable::from_series(&series);
        let mut partial = vec![f64::NAN; 10];
        for value in partial.iter_mut().skip(4) {
            *value = 1.0;
        }
        table.push_column("partial", partial).unwrap();

        let dropped = table.drop_incomplete_rows();
        assert_eq!(dropped.len(), 6);
        assert_eq!(dropped.dates()[0], table.dates()[4]);
        assert!(dropped
            .column("partial")
            .unwrap()
            .iter()
            .all(|v| v.is_finite()));
    }

    #[test]
    fn high_low_range_uses_close() {
        let base = Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap();
        let candles = vec![
            Candle {
                date: base,
                open: 10.0,
                high: 12.0,
                low: 8.0,
                close: 10.0,
                volume: 500.0,
            },
            Candle {
                date: base + Duration::days(1),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 750.0,
            },
        ];
        let series = PriceSeries::new("RANGE", candles).unwrap();
        let mut table = FeatureTable::from_series(&series);
        append_return_stats(&mut table, &FeatureParams::default()).unwrap();

        let range = table.column("high_low_range").unwrap();
        assert!((range[0] - 0.4).abs() < 1e-12);
        assert!((range[1] - 0.2).abs() < 1e-12);

        let volume_change = table.column("volume_change").unwrap();
        assert!(volume_change[0].is_nan());
        assert!((volume_change[1] - 0.5).abs() < 1e-12);
    }
}
