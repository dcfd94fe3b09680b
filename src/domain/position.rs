//! Open positions, closed trades, and the per-bar exit transition.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::signal::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
        }
    }
}

/// Which exit wins when one close satisfies both. Only possible when the
/// levels are inverted, but the policy is explicit either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    #[default]
    TakeProfitFirst,
    StopLossFirst,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "take_profit_first" => Ok(TieBreak::TakeProfitFirst),
            "stop_loss_first" => Ok(TieBreak::StopLossFirst),
            other => Err(format!(
                "unknown tie break '{other}' (expected take_profit_first or stop_loss_first)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub size: f64,
    pub action: Action,
}

/// Outcome of evaluating an open position against one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Hold(Position),
    Closed(Trade),
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.action == Action::Buy
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.action.sign()
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        if self.is_long() {
            price >= self.take_profit
        } else {
            price <= self.take_profit
        }
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }

    /// Consumes the position and either hands it back or closes it at the
    /// triggered level.
    pub fn on_close(self, price: f64, at: NaiveDateTime, tie_break: TieBreak) -> Transition {
        let tp = self.should_take_profit(price);
        let sl = self.should_stop_loss(price);
        let reason = match (tp, sl, tie_break) {
            (true, true, TieBreak::TakeProfitFirst) | (true, false, _) => ExitReason::TakeProfit,
            (true, true, TieBreak::StopLossFirst) | (false, true, _) => ExitReason::StopLoss,
            (false, false, _) => return Transition::Hold(self),
        };
        Transition::Closed(self.close(reason, at))
    }

    fn close(self, reason: ExitReason, at: NaiveDateTime) -> Trade {
        let exit_price = match reason {
            ExitReason::TakeProfit => self.take_profit,
            ExitReason::StopLoss => self.stop_loss,
        };
        Trade {
            entry_time: self.entry_time,
            exit_time: at,
            action: self.action,
            entry_price: self.entry_price,
            exit_price,
            size: self.size,
            profit: self.unrealized_pnl(exit_price),
            exit_type: reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub action: Action,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub profit: f64,
    pub exit_type: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    pub fn duration_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 3600.0
    }
}
