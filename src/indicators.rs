//! Indicator math over plain `f64` slices. Every function returns a vector
//! the same length as its input with `NAN` in warm-up positions; callers are
//! responsible for dropping incomplete rows. Inputs may carry a contiguous
//! NaN head (e.g. a derived return series); the defined suffix is used.

use statrs::statistics::Statistics;

fn first_finite(values: &[f64]) -> usize {
    values
        .iter()
        .position(|v| v.is_finite())
        .unwrap_or(values.len())
}

fn rolling_map<F>(values: &[f64], period: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let start = first_finite(values);
    let defined = &values[start..];
    if defined.len() < period {
        return out;
    }
    for i in (period - 1)..defined.len() {
        out[start + i] = f(&defined[i + 1 - period..=i]);
    }
    out
}

/// Simple moving average.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    rolling_map(values, period, |window| {
        window.iter().sum::<f64>() / window.len() as f64
    })
}

/// Trailing sample standard deviation (ddof = 1).
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    rolling_map(values, period, |window| window.iter().std_dev())
}

fn smoothed_ma(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let start = first_finite(values);
    let defined = &values[start..];
    if defined.len() < period {
        return out;
    }

    // Seed with the SMA of the first full window, then smooth recursively.
    let seed: f64 = defined[..period].iter().sum::<f64>() / period as f64;
    out[start + period - 1] = seed;
    for i in period..defined.len() {
        let prev = out[start + i - 1];
        out[start + i] = defined[i] * alpha + prev * (1.0 - alpha);
    }
    out
}

/// Exponential moving average with alpha = 2 / (period + 1). A period of 1
/// reproduces the input series.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    smoothed_ma(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder moving average (RMA) with alpha = 1 / period.
pub fn wilder_ma(values: &[f64], period: usize) -> Vec<f64> {
    smoothed_ma(values, period, 1.0 / period as f64)
}

/// Relative strength index with Wilder smoothing.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        gains[i] = delta.max(0.0);
        losses[i] = (-delta).max(0.0);
    }

    let avg_gain = wilder_ma(&gains, period);
    let avg_loss = wilder_ma(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(gain, loss)| 100.0 * gain / (gain + loss))
        .collect()
}

/// MACD line, signal line and histogram. The signal line is the EMA of the
/// defined suffix of the MACD line, so its first value lands at index
/// `slow + signal - 2`.
pub fn macd(
    closes: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = ema(closes, fast_period);
    let slow_ema = ema(closes, slow_period);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(fast, slow)| fast - slow)
        .collect();

    let signal_line = ema(&macd_line, signal_period);

    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(line, signal)| line - signal)
        .collect();

    (macd_line, signal_line, histogram)
}

pub struct BollingerBands {
    pub lower: Vec<f64>,
    pub mid: Vec<f64>,
    pub upper: Vec<f64>,
    pub bandwidth: Vec<f64>,
    pub percent: Vec<f64>,
}

/// Bollinger bands around an SMA mid-band, plus bandwidth and %B.
pub fn bollinger(closes: &[f64], period: usize, std_mult: f64) -> BollingerBands {
    let mid = sma(closes, period);
    let std = rolling_std(closes, period);

    let n = closes.len();
    let mut lower = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];
    let mut bandwidth = vec![f64::NAN; n];
    let mut percent = vec![f64::NAN; n];
    for i in 0..n {
        if mid[i].is_finite() && std[i].is_finite() {
            lower[i] = mid[i] - std_mult * std[i];
            upper[i] = mid[i] + std_mult * std[i];
            bandwidth[i] = 100.0 * (upper[i] - lower[i]) / mid[i];
            percent[i] = (closes[i] - lower[i]) / (upper[i] - lower[i]);
        }
    }

    BollingerBands {
        lower,
        mid,
        upper,
        bandwidth,
        percent,
    }
}

fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let n = closes.len();
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        tr[i] = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
    }
    tr
}

/// Average true range, Wilder-smoothed.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    wilder_ma(&true_range(highs, lows, closes), period)
}

/// Commodity channel index over the typical price.
pub fn cci(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let typical: Vec<f64> = highs
        .iter()
        .zip(lows)
        .zip(closes)
        .map(|((high, low), close)| (high + low + close) / 3.0)
        .collect();

    let mean_tp = sma(&typical, period);
    let mean_dev = rolling_map(&typical, period, |window| {
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        window.iter().map(|v| (v - mean).abs()).sum::<f64>() / window.len() as f64
    });

    typical
        .iter()
        .zip(&mean_tp)
        .zip(&mean_dev)
        .map(|((tp, mean), dev)| (tp - mean) / (0.015 * dev))
        .collect()
}

/// Rate of change: percent move over `period` rows.
pub fn roc(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 {
        return out;
    }
    for i in period..n {
        out[i] = 100.0 * (closes[i] - closes[i - period]) / closes[i - period];
    }
    out
}

/// On-balance volume: cumulative volume signed by the close-to-close move.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let mut obv_values = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        if closes[i] > closes[i - 1] {
            obv_values[i] = obv_values[i - 1] + volumes[i];
        } else if closes[i] < closes[i - 1] {
            obv_values[i] = obv_values[i - 1] - volumes[i];
        } else {
            obv_values[i] = obv_values[i - 1];
        }
    }
    obv_values
}
