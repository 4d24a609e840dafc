use chrono::{Duration, TimeZone, Utc};
use quantkit::backtester::{run_crossover_backtest, CrossoverParams};
use quantkit::config::{DataLayout, FeatureParams};
use quantkit::features::build_features;
use quantkit::models::{Candle, PriceSeries};
use quantkit::normalize::normalize_features;
use quantkit::store::{self, DataKind};
use tempfile::tempdir;

const TOTAL_DAYS: usize = 250;

/// Deterministic wavy OHLCV series long enough to clear every warm-up
/// window in the default parameter set.
fn synthetic_series(days: usize) -> PriceSeries {
    let base = Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap();
    let mut candles = Vec::with_capacity(days);
    for day in 0..days {
        let day_f = day as f64;
        let fast_wave = (day_f / 6.0).sin();
        let slow_wave = (day_f / 35.0).cos();
        let close = 120.0 + day_f * 0.15 + 9.5 * slow_wave + 2.4 * fast_wave;
        let intraday_range = 1.2 + fast_wave.abs() * 2.6;
        let open = close - fast_wave * intraday_range * 0.45;
        let high = open.max(close) + intraday_range * 0.55;
        let low = open.min(close) - intraday_range * 0.55;
        let volume = 750_000.0 + 260_000.0 * fast_wave.abs() + day_f * 150.0;

        candles.push(Candle {
            date: base + Duration::days(day as i64),
            open,
            high,
            low,
            close,
            volume,
        });
    }
    PriceSeries::new("SYN", candles).unwrap()
}

#[test]
fn feature_table_starts_after_largest_warmup() {
    let series = synthetic_series(TOTAL_DAYS);
    let params = FeatureParams::default();
    let table = build_features(&series, &params).unwrap();

    // The EMA-200 warm-up dominates every other window (MACD needs 33 rows,
    // volatility_30 needs 30), so the first surviving row is source row 199.
    assert_eq!(table.len(), TOTAL_DAYS - 199);
    assert_eq!(table.dates()[0], series.dates()[199]);

    let expected_columns = [
        "open",
        "high",
        "low",
        "close",
        "volume",
        "ema_5",
        "ema_10",
        "ema_20",
        "ema_50",
        "ema_200",
        "bb_lower",
        "bb_mid",
        "bb_upper",
        "bb_bandwidth",
        "bb_percent",
        "rsi_14",
        "macd",
        "macd_signal",
        "macd_hist",
        "atr",
        "cci",
        "roc",
        "obv",
        "daily_return",
        "daily_log_return",
        "cum_return",
        "cum_log_return",
        "volatility_10",
        "volatility_20",
        "volatility_30",
        "volume_change",
        "high_low_range",
    ];
    for name in expected_columns {
        assert!(table.has_column(name), "missing column {}", name);
    }
    assert_eq!(table.columns().len(), expected_columns.len());

    for column in table.columns() {
        assert!(
            column.values.iter().all(|v| v.is_finite()),
            "column {} still has undefined values",
            column.name
        );
    }
}

#[test]
fn normalization_round_trips_with_persisted_scaler() {
    let series = synthetic_series(TOTAL_DAYS);
    let table = build_features(&series, &FeatureParams::default()).unwrap();

    let exclude = vec!["close".to_string()];
    let (normalized, scaler) = normalize_features(&table, &exclude).unwrap();

    for scale in scaler.scales() {
        let values = normalized.column(&scale.column).unwrap();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(min.abs() < 1e-9, "{} min was {}", scale.column, min);
        assert!((max - 1.0).abs() < 1e-9, "{} max was {}", scale.column, max);
    }

    let original_close = table.column("close").unwrap();
    let untouched_close = normalized.column("close").unwrap();
    for (a, b) in original_close.iter().zip(untouched_close) {
        assert_eq!(a.to_bits(), b.to_bits());
    }

    // The scaler survives serialization and still inverts the transform.
    let encoded = serde_json::to_string(&scaler).unwrap();
    let decoded: quantkit::normalize::MinMaxScaler = serde_json::from_str(&encoded).unwrap();
    let restored = decoded.inverse_transform(&normalized).unwrap();
    for column in table.columns() {
        let original = table.column(&column.name).unwrap();
        let recovered = restored.column(&column.name).unwrap();
        for (a, b) in original.iter().zip(recovered) {
            assert!((a - b).abs() < 1e-9, "column {} drifted", column.name);
        }
    }
}

#[test]
fn cached_artifacts_round_trip_on_disk() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.ensure().unwrap();

    let series = synthetic_series(TOTAL_DAYS);
    store::save_raw(&series, quantkit::models::Period::Year1, &layout).unwrap();
    let loaded_series = store::load_latest_series("SYN", &layout).unwrap();
    assert_eq!(loaded_series, series);

    let table = build_features(&series, &FeatureParams::default()).unwrap();
    store::save_features(&table, "SYN", &layout).unwrap();
    let loaded_table = store::load_latest_features("SYN", DataKind::Processed, &layout).unwrap();
    assert_eq!(loaded_table, table);

    let (normalized, scaler) = normalize_features(&table, &[]).unwrap();
    let (_, scaler_path) = store::save_normalized(&normalized, &scaler, "SYN", &layout).unwrap();
    let loaded_normalized =
        store::load_latest_features("SYN", DataKind::Normalized, &layout).unwrap();
    assert_eq!(loaded_normalized, normalized);
    assert_eq!(store::load_scaler(&scaler_path).unwrap(), scaler);
}

#[test]
fn crossover_backtest_runs_on_synthetic_data() {
    let series = synthetic_series(TOTAL_DAYS);
    let params = CrossoverParams {
        fast: 10,
        slow: 40,
        initial_capital: 100_000.0,
    };
    let report = run_crossover_backtest(&series, &params).unwrap();

    assert_eq!(report.equity.len(), series.len());
    assert!(!report.trades.is_empty(), "wavy series should cross");
    assert_eq!(
        report.performance.total_trades as usize,
        report.trades.len()
    );
    let final_equity = report.equity.last().unwrap().equity;
    assert!(final_equity.is_finite() && final_equity > 0.0);
    assert!(report.performance.max_drawdown_pct >= 0.0);
    assert!(report.performance.win_rate >= 0.0 && report.performance.win_rate <= 1.0);
}
