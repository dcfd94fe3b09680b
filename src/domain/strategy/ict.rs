//! Session liquidity sweep, confirmed by a swing-structure shift and an
//! order block the close has already cleared.

use chrono::Timelike;

use crate::domain::ohlcv::Bar;
use crate::domain::pattern::{Direction, order_blocks, swing_structure};
use crate::domain::signal::{Action, Signal};

/// Trading session by the bar's time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    NyMidnight,
    London,
    NewYork,
    Closed,
}

impl Session {
    pub fn of(bar: &Bar) -> Self {
        match bar.timestamp.hour() {
            0..=2 => Session::NyMidnight,
            3..=7 => Session::London,
            8..=11 => Session::NewYork,
            _ => Session::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IctParams {
    pub structure_lookback: usize,
    pub reward_multiple: f64,
}

impl Default for IctParams {
    fn default() -> Self {
        IctParams {
            structure_lookback: 20,
            reward_multiple: 3.0,
        }
    }
}

impl IctParams {
    pub fn min_bars(&self) -> usize {
        // two swing highs and two swing lows
        8
    }

    pub(super) fn candidates(&self, window: &[Bar]) -> Vec<Signal> {
        let Some(bar) = window.last() else {
            return Vec::new();
        };
        let session = Session::of(bar);
        if session == Session::Closed {
            return Vec::new();
        }

        let earlier = &window[..window.len() - 1];
        let Some((range_high, range_low)) = session_range(earlier, bar, session) else {
            return Vec::new();
        };
        let price = bar.close;
        if price <= range_high && price >= range_low {
            return Vec::new();
        }

        let Some(shift) = swing_structure(window, self.structure_lookback) else {
            return Vec::new();
        };
        let cleared = order_blocks(window)
            .iter()
            .filter(|ob| ob.direction == shift.direction)
            .any(|ob| match shift.direction {
                Direction::Bullish => price > ob.price_high,
                Direction::Bearish => price < ob.price_low,
            });
        if !cleared {
            return Vec::new();
        }

        let action = Action::from_direction(shift.direction);
        let stop_loss = match action {
            Action::Buy => shift.low,
            Action::Sell => shift.high,
        };
        if (price - stop_loss) * action.sign() <= 0.0 {
            return Vec::new();
        }
        let reason = match action {
            Action::Buy => "ict bullish setup",
            Action::Sell => "ict bearish setup",
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

/// High and low of the earlier bars sharing `current`'s date and session.
fn session_range(earlier: &[Bar], current: &Bar, session: Session) -> Option<(f64, f64)> {
    earlier
        .iter()
        .rev()
        .take_while(|b| b.date() == current.date() && Session::of(b) == session)
        .fold(None, |acc, b| match acc {
            None => Some((b.high, b.low)),
            Some((h, l)) => Some((b.high.max(h), b.low.min(l))),
        })
}
