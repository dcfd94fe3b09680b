//! Multi-strategy signal scoring and selection.
//!
//! Score factors (max 100):
//! - daily bias agrees with the signal direction: 30
//! - risk:reward >= 2.0: 20, >= 1.5: 15
//! - nearest recent swing extreme on the signal's side within the risk
//!   distance of price: 20
//! - an active fair-value gap of matching direction contains price: 15
//! - an order block of matching direction contains price: 15

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use super::ohlcv::Bar;
use super::pattern::{fair_value_gaps, is_gap_active, liquidity_levels, order_blocks};
use super::regime::daily_bias;
use super::signal::Signal;
use super::strategy::{Strategy, StrategyState};

pub const BIAS_POINTS: f64 = 30.0;
pub const RR_HIGH_POINTS: f64 = 20.0;
pub const RR_MID_POINTS: f64 = 15.0;
pub const LIQUIDITY_POINTS: f64 = 20.0;
pub const FVG_POINTS: f64 = 15.0;
pub const ORDER_BLOCK_POINTS: f64 = 15.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorConfig {
    pub min_trade_interval: Duration,
    pub min_score: f64,
    pub min_risk_reward: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            min_trade_interval: Duration::hours(4),
            min_score: 1.0,
            min_risk_reward: 0.0,
        }
    }
}

/// Per-run selector state: the global throttle plus one state per strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorState {
    pub last_trade_at: Option<NaiveDateTime>,
    pub strategies: Vec<StrategyState>,
}

impl SelectorState {
    pub fn new(strategy_count: usize) -> Self {
        SelectorState {
            last_trade_at: None,
            strategies: vec![StrategyState::default(); strategy_count],
        }
    }

    /// Starts the throttle; call when a selection is acted on.
    pub fn record_trade(&mut self, at: NaiveDateTime) {
        self.last_trade_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub strategy_index: usize,
    pub signal: Signal,
    pub score: f64,
}

pub fn score_signal(signal: &Signal, window: &[Bar]) -> f64 {
    let Some(bar) = window.last() else {
        return 0.0;
    };
    let direction = signal.action.direction();
    let price = bar.close;
    let mut score = 0.0;

    if daily_bias(window).direction() == Some(direction) {
        score += BIAS_POINTS;
    }

    let rr = signal.risk_reward();
    if rr >= 2.0 {
        score += RR_HIGH_POINTS;
    } else if rr >= 1.5 {
        score += RR_MID_POINTS;
    }

    if let Some(level) = liquidity_levels(window).nearest(direction, price) {
        if (price - level).abs() < signal.risk() {
            score += LIQUIDITY_POINTS;
        }
    }

    if fair_value_gaps(window)
        .iter()
        .any(|g| g.direction == direction && g.contains(price) && is_gap_active(g, window))
    {
        score += FVG_POINTS;
    }

    if order_blocks(window)
        .iter()
        .any(|ob| ob.direction == direction && ob.contains(price))
    {
        score += ORDER_BLOCK_POINTS;
    }

    score
}

/// Runs every strategy on the window and returns the best qualifying signal.
/// Signals under `min_score` or `min_risk_reward` never compete.
///
/// Nothing is analysed while the throttle is running. Ties go to the
/// earliest registered strategy.
pub fn select<S: Strategy>(
    strategies: &[S],
    window: &[Bar],
    config: &SelectorConfig,
    state: &mut SelectorState,
) -> Option<Selection> {
    let bar = window.last()?;
    if let Some(last) = state.last_trade_at {
        if bar.timestamp - last < config.min_trade_interval {
            return None;
        }
    }
    if state.strategies.len() < strategies.len() {
        state
            .strategies
            .resize(strategies.len(), StrategyState::default());
    }

    let mut best: Option<Selection> = None;
    for (index, strategy) in strategies.iter().enumerate() {
        let Some(signal) = strategy.analyze(window, &mut state.strategies[index]) else {
            continue;
        };
        let score = score_signal(&signal, window);
        debug!(strategy = strategy.name(), score, "scored signal");
        if score < config.min_score || signal.risk_reward() < config.min_risk_reward {
            continue;
        }
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Selection {
                strategy_index: index,
                signal,
                score,
            });
        }
    }

    best
}
