//! Property tests for run and metric invariants.
//!
//! Uses proptest to verify:
//! 1. Run invariants hold for every variant on random-walk bars
//! 2. Runs are deterministic
//! 3. Selector runs keep one position at a time
//! 4. Profit factor is infinite exactly when nothing lost and something won
//! 5. Drawdown stays in [0, 1] and is zero on a rising curve

mod common;

use chrono::Duration;
use common::*;
use ictrader::domain::backtest::{BacktestConfig, run_backtest, run_selected};
use ictrader::domain::metrics::{BacktestResult, max_drawdown, profit_factor};
use ictrader::domain::position::{ExitReason, Trade};
use ictrader::domain::selector::SelectorConfig;
use ictrader::domain::signal::Action;
use proptest::prelude::*;

// ── Generators ───────────────────────────────────────────────────────

/// (close step, upper wick, lower wick) per bar.
fn arb_steps(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-1.5..1.5_f64, 0.0..1.0_f64, 0.0..1.0_f64), 1..max_len)
}

fn random_walk(steps: &[(f64, f64, f64)]) -> Vec<Bar> {
    let mut prev = 100.0_f64;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(step, up, down))| {
            let open = prev;
            let close = (prev + step).max(5.0);
            prev = close;
            make_bar(
                i,
                open,
                open.max(close) + up,
                open.min(close) - down,
                close,
            )
        })
        .collect()
}

fn arb_profit() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), -500.0..500.0_f64]
}

fn trade_with_profit(i: usize, profit: f64) -> Trade {
    let entry = make_bar(2 * i, 100.0, 101.0, 99.0, 100.0).timestamp;
    Trade {
        entry_time: entry,
        exit_time: entry + Duration::hours(1),
        action: Action::Buy,
        entry_price: 100.0,
        exit_price: 100.0 + profit / 10.0,
        size: 10.0,
        profit,
        exit_type: if profit > 0.0 {
            ExitReason::TakeProfit
        } else {
            ExitReason::StopLoss
        },
    }
}

fn check_invariants(result: &BacktestResult, bars: usize) -> Result<(), TestCaseError> {
    prop_assert_eq!(result.equity_curve.len(), bars);
    prop_assert_eq!(
        result.winning_trades + result.losing_trades,
        result.total_trades
    );
    prop_assert_eq!(result.trades.len(), result.total_trades);
    prop_assert!((0.0..=100.0).contains(&result.win_rate));
    prop_assert!(result.profit_factor >= 0.0);
    prop_assert!((0.0..=100.0).contains(&result.max_drawdown));
    prop_assert_eq!(result.final_balance, *result.equity_curve.last().unwrap());
    for pair in result.trades.windows(2) {
        prop_assert!(pair[1].entry_time >= pair[0].exit_time);
    }
    for trade in &result.trades {
        prop_assert!(trade.exit_time > trade.entry_time);
        prop_assert!(trade.size > 0.0);
    }
    Ok(())
}

// ── 1-3. Runs ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Every variant keeps the result invariants on arbitrary walks.
    #[test]
    fn variants_keep_invariants(steps in arb_steps(160)) {
        let bars = random_walk(&steps);
        for strategy in all_variants() {
            let result = run_backtest(&bars, &strategy, &BacktestConfig::default()).unwrap();
            check_invariants(&result, bars.len())?;
        }
    }

    /// Two runs over the same bars agree exactly.
    #[test]
    fn runs_are_deterministic(steps in arb_steps(120), pick in 0..5_usize) {
        let bars = random_walk(&steps);
        let strategy = &all_variants()[pick];
        let config = BacktestConfig::default();
        let a = run_backtest(&bars, strategy, &config).unwrap();
        let b = run_backtest(&bars, strategy, &config).unwrap();
        prop_assert_eq!(a, b);
    }

    /// The selector never overlaps trades whatever the throttle.
    #[test]
    fn selected_runs_keep_invariants(steps in arb_steps(160), hours in 0..6_i64) {
        let bars = random_walk(&steps);
        let selector = SelectorConfig {
            min_trade_interval: Duration::hours(hours),
            ..SelectorConfig::default()
        };
        let result =
            run_selected(&bars, &all_variants(), &selector, &BacktestConfig::default()).unwrap();
        check_invariants(&result, bars.len())?;
    }
}

// ── 4-5. Metrics ─────────────────────────────────────────────────────

proptest! {
    /// Infinite exactly when no trade lost and at least one won.
    #[test]
    fn profit_factor_infinite_iff_no_losses(profits in prop::collection::vec(arb_profit(), 0..30)) {
        let trades: Vec<Trade> = profits
            .iter()
            .enumerate()
            .map(|(i, &p)| trade_with_profit(i, p))
            .collect();
        let pf = profit_factor(&trades);
        let any_loss = profits.iter().any(|&p| p < 0.0);
        let any_win = profits.iter().any(|&p| p > 0.0);

        prop_assert!(pf >= 0.0);
        prop_assert_eq!(pf.is_infinite(), any_win && !any_loss);
        if !any_win {
            prop_assert_eq!(pf, 0.0);
        }
    }

    /// Drawdown is a fraction in [0, 1].
    #[test]
    fn drawdown_is_bounded(equity in prop::collection::vec(-1000.0..20_000.0_f64, 0..60)) {
        let dd = max_drawdown(&equity);
        prop_assert!((0.0..=1.0).contains(&dd));
    }

    /// A curve that never falls has no drawdown.
    #[test]
    fn rising_curve_has_no_drawdown(mut equity in prop::collection::vec(1.0..20_000.0_f64, 0..60)) {
        equity.sort_by(|a, b| a.partial_cmp(b).unwrap());
        prop_assert_eq!(max_drawdown(&equity), 0.0);
    }
}
