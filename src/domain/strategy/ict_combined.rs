//! Trend, liquidity-pool and structure-shift decision table sized off ATR.

use crate::domain::indicator::atr::DEFAULT_ATR_PERIOD;
use crate::domain::ohlcv::Bar;
use crate::domain::pattern::{Direction, market_structure_shifts};
use crate::domain::regime::{Bias, Regime, Trend};
use crate::domain::signal::{Action, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct IctCombinedParams {
    pub atr_period: usize,
    pub trend_stop_atr: f64,
    pub reversal_stop_atr: f64,
    pub reward_multiple: f64,
    /// Prior bars forming the liquidity pool.
    pub pool_lookback: usize,
    pub trend_score: f64,
    pub reversal_score: f64,
}

impl Default for IctCombinedParams {
    fn default() -> Self {
        IctCombinedParams {
            atr_period: DEFAULT_ATR_PERIOD,
            trend_stop_atr: 2.0,
            reversal_stop_atr: 1.5,
            reward_multiple: 2.0,
            pool_lookback: 5,
            trend_score: 90.0,
            reversal_score: 85.0,
        }
    }
}

impl IctCombinedParams {
    pub fn min_bars(&self) -> usize {
        (self.atr_period + 1).max(self.pool_lookback + 1)
    }

    pub(super) fn candidates(&self, window: &[Bar]) -> Vec<Signal> {
        let Some(bar) = window.last() else {
            return Vec::new();
        };
        let regime = Regime::classify_with_atr(window, self.atr_period);
        let Some(atr) = regime.atr.filter(|a| *a > 0.0) else {
            return Vec::new();
        };
        let price = bar.close;
        let entry = |action: Action, atr_mult: f64, score: f64, reason: &str| {
            let stop_loss = price - action.sign() * atr_mult * atr;
            Signal::with_reward_multiple(
                action,
                price,
                stop_loss,
                self.reward_multiple,
                reason,
                bar.timestamp,
            )
            .with_score(score)
        };

        let mut out = Vec::new();

        match (regime.trend, regime.bias) {
            (Trend::StrongBullish, Bias::Bullish) => out.push(entry(
                Action::Buy,
                self.trend_stop_atr,
                self.trend_score,
                "strong bullish trend",
            )),
            (Trend::StrongBearish, Bias::Bearish) => out.push(entry(
                Action::Sell,
                self.trend_stop_atr,
                self.trend_score,
                "strong bearish trend",
            )),
            _ => {}
        }

        let end = window.len() - 1;
        let pool = &window[end.saturating_sub(self.pool_lookback)..end];
        if !pool.is_empty() {
            let pool_high = pool.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            let pool_low = pool.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            if price < pool_low && regime.trend != Trend::StrongBearish {
                out.push(entry(
                    Action::Buy,
                    self.reversal_stop_atr,
                    self.reversal_score,
                    "liquidity pool buy at discount",
                ));
            }
            if price > pool_high && regime.trend != Trend::StrongBullish {
                out.push(entry(
                    Action::Sell,
                    self.reversal_stop_atr,
                    self.reversal_score,
                    "liquidity pool sell at premium",
                ));
            }
        }

        let tail = &window[window.len().saturating_sub(3)..];
        for shift in market_structure_shifts(tail) {
            if shift.index != tail.len() - 1 {
                continue;
            }
            match shift.direction {
                Direction::Bullish if regime.trend != Trend::StrongBearish => out.push(entry(
                    Action::Buy,
                    self.reversal_stop_atr,
                    self.reversal_score,
                    "bullish market structure shift",
                )),
                Direction::Bearish if regime.trend != Trend::StrongBullish => out.push(entry(
                    Action::Sell,
                    self.reversal_stop_atr,
                    self.reversal_score,
                    "bearish market structure shift",
                )),
                _ => {}
            }
        }

        out
    }
}
