//! Performance accounting over the trade log and equity samples.

use serde::Serialize;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::indicator::volatility::{TRADING_DAYS_PER_YEAR, pct_returns, sample_stddev};
use super::portfolio::Portfolio;
use super::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades with profit <= 0.
    pub losing_trades: usize,
    /// Percent.
    pub win_rate: f64,
    /// +inf when there are gains and no losses.
    pub profit_factor: f64,
    /// Percent of running peak.
    pub max_drawdown: f64,
    pub final_balance: f64,
    /// Percent of initial capital.
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

impl BacktestResult {
    pub fn compute(portfolio: &Portfolio, risk_free_rate: f64) -> Self {
        let trades = &portfolio.trades;
        let equity: Vec<f64> = portfolio.equity_curve.iter().map(|s| s.equity).collect();
        let initial_capital = portfolio.initial_capital;

        let winning_trades = trades.iter().filter(|t| t.is_win()).count();
        let total_trades = trades.len();
        let losing_trades = total_trades - winning_trades;

        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let final_balance = equity.last().copied().unwrap_or(initial_capital);
        let total_return = if initial_capital > 0.0 {
            (final_balance - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        BacktestResult {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor: profit_factor(trades),
            max_drawdown: max_drawdown(&equity) * 100.0,
            final_balance,
            total_return,
            sharpe_ratio: sharpe_ratio(&equity, risk_free_rate),
            trades: trades.clone(),
            equity_curve: equity,
        }
    }
}

pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.profit > 0.0).map(|t| t.profit).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.profit < 0.0)
        .map(|t| t.profit.abs())
        .sum();

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Largest fractional decline from the running peak, peak seeded with the
/// first sample. Capped at 1.0 (everything lost).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd.min(1.0)
}

/// sqrt(252) * (mean(r) - rate) / sample_stddev(r) over bar-to-bar equity
/// returns; 0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity: &[f64], risk_free_rate: f64) -> f64 {
    let returns = pct_returns(equity);
    let Some(stddev) = sample_stddev(&returns) else {
        return 0.0;
    };
    if stddev == 0.0 || !stddev.is_finite() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    TRADING_DAYS_PER_YEAR.sqrt() * (mean - risk_free_rate) / stddev
}

/// Per-trade statistics beyond the headline result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeBreakdown {
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_duration_hours: f64,
    pub daily_profit: BTreeMap<NaiveDate, f64>,
}

impl TradeBreakdown {
    pub fn compute(trades: &[Trade]) -> Self {
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_win()).map(|t| t.profit).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| !t.is_win()).map(|t| t.profit).collect();
        let mean = |v: &[f64]| {
            if v.is_empty() {
                0.0
            } else {
                v.iter().sum::<f64>() / v.len() as f64
            }
        };

        let mut daily_profit = BTreeMap::new();
        for trade in trades {
            *daily_profit.entry(trade.exit_time.date()).or_insert(0.0) += trade.profit;
        }

        TradeBreakdown {
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            avg_duration_hours: mean(&trades.iter().map(Trade::duration_hours).collect::<Vec<_>>()),
            daily_profit,
        }
    }
}
