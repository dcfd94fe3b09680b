//! Backtest driver: one bar at a time, position update, then signal, then
//! entry, then the equity sample.
//!
//! All run state (balance, the open position, the trade log, per-strategy
//! counters) lives in locals, so independent runs can go in parallel.

use rayon::prelude::*;
use tracing::info;

use super::error::IctraderError;
use super::execution::{EntryResult, open_position, update_position};
use super::metrics::BacktestResult;
use super::ohlcv::{Bar, validate_bars};
use super::portfolio::Portfolio;
use super::position::TieBreak;
use super::selector::{SelectorConfig, SelectorState, select};
use super::strategy::{Strategy, StrategyState};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    pub tie_break: TieBreak,
    /// Caps the analysis window at this many trailing bars.
    pub lookback: Option<usize>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            risk_free_rate: 0.02,
            tie_break: TieBreak::default(),
            lookback: None,
        }
    }
}

fn window(bars: &[Bar], index: usize, lookback: Option<usize>) -> &[Bar] {
    let end = index + 1;
    let start = lookback.map_or(0, |n| end.saturating_sub(n));
    &bars[start..end]
}

/// Runs one strategy over `bars`.
///
/// A zero-trade run still yields a zero-filled result. Only malformed bars and
/// signals that break the contract are errors.
pub fn run_backtest(
    bars: &[Bar],
    strategy: &dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, IctraderError> {
    validate_bars(bars)?;
    info!(strategy = strategy.name(), bars = bars.len(), "backtest started");

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut state = StrategyState::default();

    for (i, bar) in bars.iter().enumerate() {
        update_position(&mut portfolio, bar, config.tie_break);

        if let Some(signal) = strategy.analyze(window(bars, i, config.lookback), &mut state) {
            signal.validate(strategy.name(), bar.timestamp)?;
            open_position(&mut portfolio, &signal, strategy);
        }

        portfolio.record_equity(bar.timestamp, bar.close);
    }

    let result = BacktestResult::compute(&portfolio, config.risk_free_rate);
    info!(
        strategy = strategy.name(),
        trades = result.total_trades,
        final_balance = result.final_balance,
        "backtest finished"
    );
    Ok(result)
}

/// Runs several strategies through the selector against one shared account.
///
/// The selector sees every bar so per-strategy counters keep ticking; its
/// pick is only acted on while flat, and the trade throttle starts from the
/// bar that actually opened a position.
pub fn run_selected<S: Strategy>(
    bars: &[Bar],
    strategies: &[S],
    selector: &SelectorConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, IctraderError> {
    validate_bars(bars)?;
    info!(
        strategies = strategies.len(),
        bars = bars.len(),
        "selector backtest started"
    );

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut state = SelectorState::new(strategies.len());

    for (i, bar) in bars.iter().enumerate() {
        update_position(&mut portfolio, bar, config.tie_break);

        let picked = select(strategies, window(bars, i, config.lookback), selector, &mut state);
        if let Some(selection) = picked {
            let strategy = &strategies[selection.strategy_index];
            selection.signal.validate(strategy.name(), bar.timestamp)?;
            if let EntryResult::Entered { .. } =
                open_position(&mut portfolio, &selection.signal, strategy)
            {
                state.record_trade(bar.timestamp);
            }
        }

        portfolio.record_equity(bar.timestamp, bar.close);
    }

    let result = BacktestResult::compute(&portfolio, config.risk_free_rate);
    info!(
        trades = result.total_trades,
        final_balance = result.final_balance,
        "selector backtest finished"
    );
    Ok(result)
}

/// Independent single-strategy runs over the same bars, in parallel. Results
/// come back in strategy order.
pub fn run_many<S: Strategy>(
    bars: &[Bar],
    strategies: &[S],
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, IctraderError>> {
    strategies
        .par_iter()
        .map(|strategy| run_backtest(bars, strategy, config))
        .collect()
}
