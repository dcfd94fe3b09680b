//! Accumulation, manipulation, distribution.
//!
//! A tight trailing range marks accumulation. A close outside that range
//! against the daily bias marks manipulation. A candle in the bias direction
//! that still closes outside the range is the distribution entry.

use crate::domain::ohlcv::Bar;
use crate::domain::regime::{Bias, daily_bias};
use crate::domain::signal::{Action, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct AmdParams {
    pub accumulation_lookback: usize,
    /// Accumulation when the trailing range is under this many mean bar ranges.
    pub accumulation_factor: f64,
    pub reward_multiple: f64,
}

impl Default for AmdParams {
    fn default() -> Self {
        AmdParams {
            accumulation_lookback: 20,
            accumulation_factor: 3.0,
            reward_multiple: 3.0,
        }
    }
}

/// Phase progress carried between bars of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmdState {
    /// (high, low) of the last accumulation range.
    pub accumulation: Option<(f64, f64)>,
    pub manipulated: bool,
}

impl AmdParams {
    pub fn min_bars(&self) -> usize {
        self.accumulation_lookback.max(2)
    }

    fn accumulation_range(&self, window: &[Bar]) -> Option<(f64, f64)> {
        let n = self.accumulation_lookback;
        if n == 0 || window.len() < n {
            return None;
        }
        let recent = &window[window.len() - n..];
        let high = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let mean_bar = recent.iter().map(Bar::range).sum::<f64>() / n as f64;
        (high - low < self.accumulation_factor * mean_bar).then_some((high, low))
    }

    pub(super) fn candidates(&self, window: &[Bar], state: &mut AmdState) -> Vec<Signal> {
        let Some(bar) = window.last() else {
            return Vec::new();
        };
        let bias = daily_bias(window);
        if bias == Bias::Unknown {
            return Vec::new();
        }
        let price = bar.close;

        if !state.manipulated {
            if let Some(range) = self.accumulation_range(window) {
                state.accumulation = Some(range);
                return Vec::new();
            }
            if let Some((high, low)) = state.accumulation {
                state.manipulated = match bias {
                    Bias::Bullish => price < low,
                    _ => price > high,
                };
            }
            return Vec::new();
        }

        let Some((high, low)) = state.accumulation else {
            state.manipulated = false;
            return Vec::new();
        };
        let (action, stop_loss) = match bias {
            Bias::Bullish if price < low && bar.is_bullish() => (Action::Buy, bar.low),
            Bias::Bearish if price > high && bar.is_bearish() => (Action::Sell, bar.high),
            _ => return Vec::new(),
        };
        if (price - stop_loss) * action.sign() <= 0.0 {
            return Vec::new();
        }

        *state = AmdState::default();
        let reason = match action {
            Action::Buy => "bullish distribution",
            Action::Sell => "bearish distribution",
        };
        vec![Signal::with_reward_multiple(
            action,
            price,
            stop_loss,
            self.reward_multiple,
            reason,
            bar.timestamp,
        )]
    }
}
