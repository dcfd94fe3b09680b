//! Position entry and the per-bar exit update.
//!
//! Entry fills at the signal's price; exits fill at the triggered stop or
//! target level and are stamped with the bar that triggered them.

use tracing::debug;

use super::ohlcv::Bar;
use super::portfolio::Portfolio;
use super::position::{Position, TieBreak, Trade, Transition};
use super::signal::Signal;
use super::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    PositionOpen,
    DegenerateSizing,
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered { size: f64 },
    Rejected(RejectReason),
}

/// Opens a position for `signal` when the portfolio is flat and the
/// strategy's sizing rule yields a positive size.
pub fn open_position(
    portfolio: &mut Portfolio,
    signal: &Signal,
    strategy: &dyn Strategy,
) -> EntryResult {
    if portfolio.has_position() {
        return EntryResult::Rejected(RejectReason::PositionOpen);
    }
    let Some(size) = strategy.size_position(portfolio.balance, signal.risk_amount) else {
        debug!(strategy = strategy.name(), risk = signal.risk_amount, "degenerate sizing");
        return EntryResult::Rejected(RejectReason::DegenerateSizing);
    };
    if !size.is_finite() || size <= 0.0 {
        return EntryResult::Rejected(RejectReason::DegenerateSizing);
    }

    portfolio.position = Some(Position {
        entry_time: signal.timestamp,
        entry_price: signal.price,
        stop_loss: signal.stop_loss,
        take_profit: signal.take_profit,
        size,
        action: signal.action,
    });
    debug!(
        strategy = strategy.name(),
        action = %signal.action,
        price = signal.price,
        size,
        "opened position"
    );
    EntryResult::Entered { size }
}

/// Evaluates the open position against `bar`'s close. The position is taken
/// out, transitioned, and either put back or realized.
pub fn update_position(portfolio: &mut Portfolio, bar: &Bar, tie_break: TieBreak) -> Option<Trade> {
    let position = portfolio.position.take()?;
    match position.on_close(bar.close, bar.timestamp, tie_break) {
        Transition::Hold(position) => {
            portfolio.position = Some(position);
            None
        }
        Transition::Closed(trade) => {
            debug!(
                exit = %trade.exit_type,
                price = trade.exit_price,
                profit = trade.profit,
                "closed position"
            );
            portfolio.record_trade(trade.clone());
            Some(trade)
        }
    }
}
