//! Break of the most recent order block, stopped at the last swing extreme.

use crate::domain::ohlcv::Bar;
use crate::domain::pattern::{Direction, order_blocks, swing_highs, swing_lows};
use crate::domain::signal::{Action, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityParams {
    pub reward_multiple: f64,
}

impl Default for LiquidityParams {
    fn default() -> Self {
        LiquidityParams {
            reward_multiple: 2.0,
        }
    }
}

impl LiquidityParams {
    pub fn min_bars(&self) -> usize {
        5
    }

    pub(super) fn candidates(&self, window: &[Bar]) -> Vec<Signal> {
        let Some(bar) = window.last() else {
            return Vec::new();
        };
        let price = bar.close;
        let blocks = order_blocks(window);
        let latest = |direction: Direction| blocks.iter().rev().find(|ob| ob.direction == direction);

        let mut out = Vec::new();

        if let (Some(swing), Some(ob)) = (swing_lows(window).last(), latest(Direction::Bullish)) {
            if price > ob.price_high && swing.price_low < price {
                out.push(Signal::with_reward_multiple(
                    Action::Buy,
                    price,
                    swing.price_low,
                    self.reward_multiple,
                    "price above bullish order block",
                    bar.timestamp,
                ));
            }
        }

        if let (Some(swing), Some(ob)) = (swing_highs(window).last(), latest(Direction::Bearish)) {
            if price < ob.price_low && swing.price_high > price {
                out.push(Signal::with_reward_multiple(
                    Action::Sell,
                    price,
                    swing.price_high,
                    self.reward_multiple,
                    "price below bearish order block",
                    bar.timestamp,
                ));
            }
        }

        out
    }
}
