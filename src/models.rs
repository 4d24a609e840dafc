use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Single OHLCV bar. Schema invariants are checked once at construction so
/// indicator math never has to re-validate column values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !value.is_finite() {
                return Err(DataError::InvalidData(format!(
                    "non-finite {} at {}",
                    name,
                    self.date.format("%Y-%m-%d")
                )));
            }
        }
        if self.volume < 0.0 {
            return Err(DataError::InvalidData(format!(
                "negative volume at {}",
                self.date.format("%Y-%m-%d")
            )));
        }
        if self.high < self.low
            || self.high < self.open
            || self.high < self.close
            || self.low > self.open
            || self.low > self.close
        {
            return Err(DataError::InvalidData(format!(
                "inconsistent OHLC range at {}",
                self.date.format("%Y-%m-%d")
            )));
        }
        Ok(())
    }
}

/// Date-ascending, duplicate-free OHLCV history for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new<S: Into<String>>(ticker: S, mut candles: Vec<Candle>) -> Result<Self> {
        let ticker = normalize_ticker(&ticker.into())?;
        if candles.is_empty() {
            return Err(DataError::NoData(ticker));
        }
        candles.sort_by(|a, b| a.date.cmp(&b.date));
        for pair in candles.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(DataError::InvalidData(format!(
                    "duplicate date {} for {}",
                    pair[0].date.format("%Y-%m-%d"),
                    ticker
                )));
            }
        }
        for candle in &candles {
            candle.validate()?;
        }
        Ok(Self { ticker, candles })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn dates(&self) -> Vec<DateTime<Utc>> {
        self.candles.iter().map(|c| c.date).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }
}

/// Normalizes a ticker symbol by trimming whitespace and uppercasing.
pub fn normalize_ticker(value: &str) -> Result<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(DataError::InvalidArgument(
            "ticker must be a non-empty string".to_string(),
        ));
    }
    Ok(normalized)
}

/// Supported bar intervals for the remote chart API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Min1,
    Min2,
    Min5,
    Min15,
    Min30,
    Min60,
    Min90,
    Hour1,
    Day1,
    Day5,
    Week1,
    Month1,
    Month3,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min2 => "2m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Min60 => "60m",
            Interval::Min90 => "90m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Day5 => "5d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
            Interval::Month3 => "3mo",
        }
    }

    pub const fn all() -> &'static [Interval] {
        &[
            Interval::Min1,
            Interval::Min2,
            Interval::Min5,
            Interval::Min15,
            Interval::Min30,
            Interval::Min60,
            Interval::Min90,
            Interval::Hour1,
            Interval::Day1,
            Interval::Day5,
            Interval::Week1,
            Interval::Month1,
            Interval::Month3,
        ]
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Interval::all()
            .iter()
            .find(|interval| interval.as_str() == lower)
            .copied()
            .ok_or_else(|| DataError::InvalidArgument(format!("unsupported interval '{}'", s)))
    }
}

/// Supported history ranges for the remote chart API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Day1,
    Day5,
    Month1,
    Month3,
    Month6,
    Year1,
    Year2,
    Year5,
    Year10,
    Ytd,
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day1 => "1d",
            Period::Day5 => "5d",
            Period::Month1 => "1mo",
            Period::Month3 => "3mo",
            Period::Month6 => "6mo",
            Period::Year1 => "1y",
            Period::Year2 => "2y",
            Period::Year5 => "5y",
            Period::Year10 => "10y",
            Period::Ytd => "ytd",
            Period::Max => "max",
        }
    }

    pub const fn all() -> &'static [Period] {
        &[
            Period::Day1,
            Period::Day5,
            Period::Month1,
            Period::Month3,
            Period::Month6,
            Period::Year1,
            Period::Year2,
            Period::Year5,
            Period::Year10,
            Period::Ytd,
            Period::Max,
        ]
    }
}

impl FromStr for Period {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Period::all()
            .iter()
            .find(|period| period.as_str() == lower)
            .copied()
            .ok_or_else(|| DataError::InvalidArgument(format!("unsupported period '{}'", s)))
    }
}

/// Round-trip trade closed by the backtester.
#[derive(Debug, Clone, Serialize)]
pub struct ClosedTrade {
    pub ticker: String,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_date: DateTime<Utc>,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
}

/// Portfolio value at the end of one candle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EquityPoint {
    pub date: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub total_trades: i32,
    pub winning_trades: i32,
    pub losing_trades: i32,
    pub win_rate: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub cagr: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub avg_trade_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DrawdownInfo {
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
}
