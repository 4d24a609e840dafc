use crate::models::{Interval, Period};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_TICKERS: &str = "AAPL,MSFT,AMZN,GOOGL,META";
const DEFAULT_PERIOD: &str = "10y";
const DEFAULT_INTERVAL: &str = "1d";
const DEFAULT_MA_WINDOWS: &str = "5,10,20,50,200";
const DEFAULT_VOL_WINDOWS: &str = "10,20,30";
const DEFAULT_DATA_DIR: &str = "data";

/// Lookback parameters for the feature pipeline.
#[derive(Debug, Clone)]
pub struct FeatureParams {
    pub ma_windows: Vec<usize>,
    pub vol_windows: Vec<usize>,
    pub bollinger_window: usize,
    pub bollinger_std: f64,
    pub rsi_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_window: usize,
    pub cci_window: usize,
    pub roc_window: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            ma_windows: vec![5, 10, 20, 50, 200],
            vol_windows: vec![10, 20, 30],
            bollinger_window: 20,
            bollinger_std: 2.0,
            rsi_window: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_window: 14,
            cci_window: 20,
            roc_window: 10,
        }
    }
}

/// On-disk layout for cached artifacts. Construction never touches the
/// filesystem; callers run `ensure` once at startup.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn normalized_dir(&self) -> PathBuf {
        self.root.join("normalized")
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [self.raw_dir(), self.processed_dir(), self.normalized_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Main configuration struct, constructed once at process start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tickers: Vec<String>,
    pub period: Period,
    pub interval: Interval,
    pub features: FeatureParams,
    pub layout: DataLayout,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let settings: HashMap<String, String> = std::env::vars().collect();
        Self::from_settings_map(&settings)
    }

    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let tickers = parse_ticker_list(setting_or(settings, "TICKERS", DEFAULT_TICKERS))?;
        let period = Period::from_str(setting_or(settings, "PERIOD", DEFAULT_PERIOD))?;
        let interval = Interval::from_str(setting_or(settings, "INTERVAL", DEFAULT_INTERVAL))?;

        let defaults = FeatureParams::default();
        let features = FeatureParams {
            ma_windows: setting_usize_list(settings, "MA_WINDOWS", DEFAULT_MA_WINDOWS)?,
            vol_windows: setting_usize_list(settings, "VOL_WINDOWS", DEFAULT_VOL_WINDOWS)?,
            bollinger_window: setting_usize(settings, "BOLLINGER_WINDOW", defaults.bollinger_window)?,
            bollinger_std: setting_f64(settings, "BOLLINGER_STD", defaults.bollinger_std)?,
            rsi_window: setting_usize(settings, "RSI_WINDOW", defaults.rsi_window)?,
            macd_fast: setting_usize(settings, "MACD_FAST", defaults.macd_fast)?,
            macd_slow: setting_usize(settings, "MACD_SLOW", defaults.macd_slow)?,
            macd_signal: setting_usize(settings, "MACD_SIGNAL", defaults.macd_signal)?,
            atr_window: setting_usize(settings, "ATR_WINDOW", defaults.atr_window)?,
            cci_window: setting_usize(settings, "CCI_WINDOW", defaults.cci_window)?,
            roc_window: setting_usize(settings, "ROC_WINDOW", defaults.roc_window)?,
        };

        if features.macd_fast >= features.macd_slow {
            return Err(anyhow!(
                "MACD_FAST ({}) must be < MACD_SLOW ({})",
                features.macd_fast,
                features.macd_slow
            ));
        }

        let layout = DataLayout::new(setting_or(settings, "DATA_DIR", DEFAULT_DATA_DIR));

        Ok(Self {
            tickers,
            period,
            interval,
            features,
            layout,
        })
    }
}

fn setting_or<'a>(settings: &'a HashMap<String, String>, key: &str, default: &'a str) -> &'a str {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
}

fn setting_usize(settings: &HashMap<String, String>, key: &str, default: usize) -> Result<usize> {
    let raw = match settings.get(key).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(default),
    };
    let value = raw
        .parse::<usize>()
        .map_err(|_| anyhow!("Setting {} must be an integer (value: {})", key, raw))?;
    if value == 0 {
        return Err(anyhow!("Setting {} must be >= 1 (value: {})", key, raw));
    }
    Ok(value)
}

fn setting_f64(settings: &HashMap<String, String>, key: &str, default: f64) -> Result<f64> {
    let raw = match settings.get(key).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(default),
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| anyhow!("Setting {} must be a number (value: {})", key, raw))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(anyhow!("Setting {} must be > 0 (value: {})", key, raw));
    }
    Ok(value)
}

fn setting_usize_list(
    settings: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Vec<usize>> {
    let raw = setting_or(settings, key, default);
    let mut values = Vec::new();

    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let entry = part.trim();
        if entry.is_empty() {
            continue;
        }
        let value = entry
            .parse::<usize>()
            .map_err(|_| anyhow!("Setting {} must be a list of integers (value: {})", key, raw))?;
        if value == 0 {
            return Err(anyhow!(
                "Setting {} must contain only windows >= 1 (value: {})",
                key,
                raw
            ));
        }
        values.push(value);
    }

    if values.is_empty() {
        return Err(anyhow!(
            "Setting {} must contain at least one window (value: {})",
            key,
            raw
        ));
    }

    Ok(values)
}

fn parse_ticker_list(raw: &str) -> Result<Vec<String>> {
    let mut tickers = Vec::new();
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let entry = part.trim();
        if entry.is_empty() {
            continue;
        }
        tickers.push(crate::models::normalize_ticker(entry)?);
    }
    if tickers.is_empty() {
        return Err(anyhow!("TICKERS must contain at least one symbol"));
    }
    Ok(tickers)
}
