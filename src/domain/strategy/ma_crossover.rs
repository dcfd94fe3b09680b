//! Fast/slow SMA crossover with percentage stop and target.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::{Action, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub stop_pct: f64,
    pub target_pct: f64,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        MaCrossoverParams {
            fast_period: 10,
            slow_period: 20,
            stop_pct: 1.0,
            target_pct: 2.0,
        }
    }
}

impl MaCrossoverParams {
    pub fn min_bars(&self) -> usize {
        self.fast_period.max(self.slow_period) + 1
    }

    pub(super) fn candidates(&self, window: &[Bar]) -> Vec<Signal> {
        let needed = self.min_bars();
        if window.len() < needed || self.fast_period == 0 || self.slow_period == 0 {
            return Vec::new();
        }
        // Averages over the trailing bars equal those over the full window.
        let recent = &window[window.len() - needed..];
        let fast = calculate_sma(recent, self.fast_period);
        let slow = calculate_sma(recent, self.slow_period);
        let (prev, cur) = (needed - 2, needed - 1);

        let (Some(f0), Some(s0), Some(f1), Some(s1)) = (
            fast.value_at(prev),
            slow.value_at(prev),
            fast.value_at(cur),
            slow.value_at(cur),
        ) else {
            return Vec::new();
        };

        let bar = &recent[cur];
        let price = bar.close;
        if price <= 0.0 {
            return Vec::new();
        }
        let action = if f1 > s1 && f0 <= s0 {
            Action::Buy
        } else if f1 < s1 && f0 >= s0 {
            Action::Sell
        } else {
            return Vec::new();
        };

        let sign = action.sign();
        let stop_loss = price * (1.0 - sign * self.stop_pct / 100.0);
        let take_profit = price * (1.0 + sign * self.target_pct / 100.0);
        let reason = match action {
            Action::Buy => "bullish ma crossover",
            Action::Sell => "bearish ma crossover",
        };
        vec![Signal {
            action,
            price,
            stop_loss,
            take_profit,
            risk_amount: (price - stop_loss).abs(),
            score: 0.0,
            reason: reason.to_string(),
            timestamp: bar.timestamp,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::test_support::{bar, closes};

    fn params() -> MaCrossoverParams {
        MaCrossoverParams {
            fast_period: 2,
            slow_period: 3,
            ..MaCrossoverParams::default()
        }
    }

    #[test]
    fn bullish_cross_on_last_bar() {
        let bars = closes(&[10.0, 9.0, 8.0, 7.0, 12.0]);
        let signals = params().candidates(&bars);
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.action, Action::Buy);
        assert_eq!(s.timestamp, bars[4].timestamp);
        assert!(s.stop_loss < s.price && s.price < s.take_profit);
        assert!((s.stop_loss - 12.0 * 0.99).abs() < 1e-12);
        assert!((s.take_profit - 12.0 * 1.02).abs() < 1e-12);
    }

    #[test]
    fn bearish_cross_on_last_bar() {
        let bars = closes(&[7.0, 8.0, 9.0, 10.0, 5.0]);
        let signals = params().candidates(&bars);
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.action, Action::Sell);
        assert!(s.take_profit < s.price && s.price < s.stop_loss);
    }

    #[test]
    fn cross_into_zero_close_is_skipped() {
        let mut bars = closes(&[7.0, 8.0, 9.0, 10.0]);
        bars.push(bar(4, 10.0, 10.0, 0.0, 0.0));
        assert!(params().candidates(&bars).is_empty());
    }

    #[test]
    fn no_cross_when_trend_continues() {
        let bars = closes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        assert!(params().candidates(&bars).is_empty());
    }

    #[test]
    fn needs_slow_plus_one_bars() {
        assert_eq!(MaCrossoverParams::default().min_bars(), 21);
        assert!(params().candidates(&closes(&[10.0, 9.0, 12.0])).is_empty());
    }
}
