use crate::backtester::{run_crossover_backtest, CrossoverParams};
use crate::config::AppConfig;
use crate::store;
use anyhow::Result;
use log::info;

/// Runs the sample EMA-crossover backtest on the latest cached raw data for
/// one ticker and logs the performance summary.
pub async fn run(config: &AppConfig, ticker: &str, params: CrossoverParams) -> Result<()> {
    let series = store::load_latest_series(ticker, &config.layout)?;
    info!(
        "Backtesting {} over {} candles (EMA {} / {})",
        series.ticker(),
        series.len(),
        params.fast,
        params.slow
    );

    let report = run_crossover_backtest(&series, &params)?;
    let perf = &report.performance;

    info!(
        "Trades: {} (win rate {:.1}%)",
        perf.total_trades,
        perf.win_rate * 100.0
    );
    info!(
        "Return: {:.2} ({:.2}%), CAGR {:.2}%",
        perf.total_return,
        perf.total_return_pct,
        perf.cagr * 100.0
    );
    info!(
        "Sharpe {:.3}, max drawdown {:.2} ({:.2}%)",
        perf.sharpe_ratio, perf.max_drawdown, perf.max_drawdown_pct
    );
    if perf.total_trades > 0 {
        info!(
            "Avg trade {:.2}, best {:.2}, worst {:.2}",
            perf.avg_trade_pnl, perf.best_trade, perf.worst_trade
        );
    }

    Ok(())
}
