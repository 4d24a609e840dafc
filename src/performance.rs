use crate::models::{ClosedTrade, DrawdownInfo, EquityPoint, PerformanceSummary};
use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const RISK_FREE_RATE: f64 = 0.02;

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    pub fn calculate_performance(
        trades: &[ClosedTrade],
        initial_capital: f64,
        final_value: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        equity: &[EquityPoint],
    ) -> PerformanceSummary {
        let total_trades = trades.len() as i32;

        let trade_pnls: Vec<f64> = trades.iter().map(|t| t.pnl).collect();
        let winning_trades = trade_pnls.iter().filter(|pnl| **pnl > 0.0).count() as i32;
        let losing_trades = trade_pnls.iter().filter(|pnl| **pnl < 0.0).count() as i32;
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let total_return = final_value - initial_capital;
        let total_return_pct = if initial_capital > 0.0 {
            total_return / initial_capital * 100.0
        } else {
            0.0
        };

        let avg_trade_pnl = if trade_pnls.is_empty() {
            0.0
        } else {
            trade_pnls.iter().sum::<f64>() / trade_pnls.len() as f64
        };
        let best_trade = trade_pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let best_trade = if best_trade.is_finite() { best_trade } else { 0.0 };
        let worst_trade = trade_pnls.iter().copied().fold(f64::INFINITY, f64::min);
        let worst_trade = if worst_trade.is_finite() {
            worst_trade
        } else {
            0.0
        };

        let cagr = Self::calculate_cagr(initial_capital, final_value, start_date, end_date);
        let sharpe_ratio = Self::calculate_sharpe_ratio(equity);
        let drawdown = Self::calculate_max_drawdown(equity);

        PerformanceSummary {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_return,
            total_return_pct,
            cagr,
            sharpe_ratio,
            max_drawdown: drawdown.max_drawdown,
            max_drawdown_pct: drawdown.max_drawdown_pct,
            avg_trade_pnl,
            best_trade,
            worst_trade,
        }
    }

    pub fn calculate_cagr(
        initial_capital: f64,
        final_value: f64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> f64 {
        if initial_capital <= 0.0 || !final_value.is_finite() || end_date <= start_date {
            return 0.0;
        }

        let years =
            (end_date - start_date).num_seconds() as f64 / (365.25 * 24.0 * 60.0 * 60.0);
        if years <= 0.0 {
            return 0.0;
        }

        let total_return_ratio = final_value / initial_capital;
        if total_return_ratio <= 0.0 {
            return 0.0;
        }

        total_return_ratio.powf(1.0 / years) - 1.0
    }

    pub fn calculate_sharpe_ratio(equity: &[EquityPoint]) -> f64 {
        if equity.len() < 2 {
            return 0.0;
        }

        let returns: Vec<f64> = equity
            .windows(2)
            .map(|window| {
                let prev = window[0].equity;
                let curr = window[1].equity;
                if prev > 0.0 {
                    (curr - prev) / prev
                } else {
                    0.0
                }
            })
            .collect();

        let mean_return = returns.clone().mean();
        let std_dev = returns.std_dev();
        if std_dev == 0.0 || !std_dev.is_finite() {
            return 0.0;
        }

        let annualized_return = mean_return * TRADING_DAYS_PER_YEAR;
        let annualized_volatility = std_dev * TRADING_DAYS_PER_YEAR.sqrt();
        (annualized_return - RISK_FREE_RATE) / annualized_volatility
    }

    pub fn calculate_max_drawdown(equity: &[EquityPoint]) -> DrawdownInfo {
        let mut peak = f64::NEG_INFINITY;
        let mut max_drawdown = 0.0;
        let mut max_drawdown_pct = 0.0;

        for point in equity {
            if point.equity > peak {
                peak = point.equity;
            }
            let drawdown = peak - point.equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
                max_drawdown_pct = if peak > 0.0 {
                    drawdown / peak * 100.0
                } else {
                    0.0
                };
            }
        }

        DrawdownInfo {
            max_drawdown,
            max_drawdown_pct,
        }
    }
}
