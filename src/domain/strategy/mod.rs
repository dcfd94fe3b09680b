//! Strategy engine: one `Strategy` capability, five tagged variants.
//!
//! Variants only propose candidate signals. The shared engine in
//! [`TradingStrategy::analyze`] applies warmup, the per-day counter, the
//! minimum interval, the volatility circuit breaker and the score / R:R
//! minimums, then records the emission in the caller-owned [`StrategyState`].

pub mod amd;
pub mod ict;
pub mod ict_combined;
pub mod liquidity;
pub mod ma_crossover;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;
use tracing::debug;

use super::indicator::volatility::calculate_volatility;
use super::ohlcv::Bar;
use super::signal::Signal;

pub use amd::{AmdParams, AmdState};
pub use ict::{IctParams, Session};
pub use ict_combined::IctCombinedParams;
pub use liquidity::LiquidityParams;
pub use ma_crossover::MaCrossoverParams;

/// Capability every strategy exposes to the selector and backtest driver.
///
/// `analyze` may only mutate the `StrategyState` it is handed, so two runs of
/// the same configuration never interfere.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Bars needed before `analyze` can produce anything.
    fn min_bars(&self) -> usize;

    fn analyze(&self, window: &[Bar], state: &mut StrategyState) -> Option<Signal>;

    /// Units to trade for a stop `risk_distance` away, or `None` when the
    /// sizing is degenerate.
    fn size_position(&self, balance: f64, risk_distance: f64) -> Option<f64>;
}

/// Per-run mutable strategy state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyState {
    pub current_day: Option<NaiveDate>,
    pub signals_today: u32,
    pub last_signal_at: Option<NaiveDateTime>,
    pub amd: AmdState,
}

impl StrategyState {
    fn roll_day(&mut self, day: NaiveDate) {
        if self.current_day != Some(day) {
            self.current_day = Some(day);
            self.signals_today = 0;
        }
    }

    fn record(&mut self, at: NaiveDateTime) {
        self.signals_today += 1;
        self.last_signal_at = Some(at);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingRule {
    /// Stop distance is already in account currency per unit.
    PriceUnits,
    /// Stop distance converted to pips, each worth `pip_value` per lot.
    Pips { pip_size: f64, pip_value: f64 },
}

impl SizingRule {
    /// `balance * risk_percentage / 100` divided by the stop distance in this
    /// rule's units, rounded to 0.01.
    pub fn size(&self, balance: f64, risk_percentage: f64, risk_distance: f64) -> Option<f64> {
        let risk_amount = balance * risk_percentage / 100.0;
        let denominator = match *self {
            SizingRule::PriceUnits => risk_distance,
            SizingRule::Pips {
                pip_size,
                pip_value,
            } => {
                if pip_size <= 0.0 {
                    return None;
                }
                risk_distance / pip_size * pip_value
            }
        };
        if !denominator.is_finite() || denominator <= 0.0 {
            return None;
        }
        let size = (risk_amount / denominator * 100.0).round() / 100.0;
        (size.is_finite() && size > 0.0).then_some(size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub risk_percentage: f64,
    pub sizing: SizingRule,
    pub max_signals_per_day: Option<u32>,
    pub min_signal_interval: Option<Duration>,
    pub min_risk_reward: f64,
    pub min_score: f64,
    pub volatility_ceiling: Option<f64>,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            risk_percentage: 1.0,
            sizing: SizingRule::PriceUnits,
            max_signals_per_day: None,
            min_signal_interval: None,
            min_risk_reward: 0.0,
            min_score: 0.0,
            volatility_ceiling: None,
        }
    }
}

impl StrategyParams {
    /// Engine defaults for a variant. `ict_combined` ships with its own
    /// filters; the others start unfiltered.
    pub fn for_variant(variant: &StrategyVariant) -> Self {
        match variant {
            StrategyVariant::IctCombined(_) => StrategyParams {
                max_signals_per_day: Some(8),
                min_risk_reward: 1.5,
                min_score: 65.0,
                volatility_ceiling: Some(0.30),
                ..StrategyParams::default()
            },
            _ => StrategyParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyVariant {
    MaCrossover(MaCrossoverParams),
    Ict(IctParams),
    Liquidity(LiquidityParams),
    Amd(AmdParams),
    IctCombined(IctCombinedParams),
}

impl StrategyVariant {
    /// Config name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyVariant::MaCrossover(_) => "ma_crossover",
            StrategyVariant::Ict(_) => "ict",
            StrategyVariant::Liquidity(_) => "liquidity",
            StrategyVariant::Amd(_) => "amd",
            StrategyVariant::IctCombined(_) => "ict_combined",
        }
    }

    pub fn min_bars(&self) -> usize {
        match self {
            StrategyVariant::MaCrossover(p) => p.min_bars(),
            StrategyVariant::Ict(p) => p.min_bars(),
            StrategyVariant::Liquidity(p) => p.min_bars(),
            StrategyVariant::Amd(p) => p.min_bars(),
            StrategyVariant::IctCombined(p) => p.min_bars(),
        }
    }

    fn candidates(&self, window: &[Bar], state: &mut StrategyState) -> Vec<Signal> {
        match self {
            StrategyVariant::MaCrossover(p) => p.candidates(window),
            StrategyVariant::Ict(p) => p.candidates(window),
            StrategyVariant::Liquidity(p) => p.candidates(window),
            StrategyVariant::Amd(p) => p.candidates(window, &mut state.amd),
            StrategyVariant::IctCombined(p) => p.candidates(window),
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingStrategy {
    pub name: String,
    pub params: StrategyParams,
    pub variant: StrategyVariant,
}

impl TradingStrategy {
    pub fn new(name: impl Into<String>, variant: StrategyVariant) -> Self {
        TradingStrategy {
            name: name.into(),
            params: StrategyParams::for_variant(&variant),
            variant,
        }
    }

    pub fn with_params(mut self, params: StrategyParams) -> Self {
        self.params = params;
        self
    }

    /// A candidate with no positive price or no stop distance is not an
    /// opportunity.
    fn qualifies(&self, signal: &Signal) -> bool {
        signal.price > 0.0
            && signal.risk() > 0.0
            && signal.score >= self.params.min_score
            && signal.risk_reward() >= self.params.min_risk_reward
    }
}

impl Strategy for TradingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        self.variant.min_bars()
    }

    fn analyze(&self, window: &[Bar], state: &mut StrategyState) -> Option<Signal> {
        let bar = window.last()?;
        if window.len() < self.min_bars() {
            return None;
        }

        state.roll_day(bar.date());
        if let Some(max) = self.params.max_signals_per_day {
            if state.signals_today >= max {
                return None;
            }
        }
        if let (Some(min), Some(last)) = (self.params.min_signal_interval, state.last_signal_at) {
            if bar.timestamp - last < min {
                return None;
            }
        }
        if let Some(ceiling) = self.params.volatility_ceiling {
            if calculate_volatility(window).is_some_and(|v| v > ceiling) {
                debug!(strategy = %self.name, at = %bar.timestamp, "volatility above ceiling");
                return None;
            }
        }

        // Highest score wins; the first candidate wins a tie.
        let best = self
            .variant
            .candidates(window, state)
            .into_iter()
            .filter(|s| self.qualifies(s))
            .fold(None::<Signal>, |best, s| match best {
                Some(b) if b.score >= s.score => Some(b),
                _ => Some(s),
            })?;

        state.record(bar.timestamp);
        debug!(
            strategy = %self.name,
            action = %best.action,
            price = best.price,
            stop = best.stop_loss,
            target = best.take_profit,
            reason = %best.reason,
            "signal"
        );
        Some(best)
    }

    fn size_position(&self, balance: f64, risk_distance: f64) -> Option<f64> {
        self.params
            .sizing
            .size(balance, self.params.risk_percentage, risk_distance)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::Bar;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    pub fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 8)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    pub fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: t0() + Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Bars with open == close and a unit wick either side.
    pub fn closes(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| bar(i, p, p + 1.0, p - 1.0, p))
            .collect()
    }
}
