//! Trade signals and the contract every strategy's output must satisfy.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use super::error::IctraderError;
use super::pattern::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// +1 for buy, -1 for sell.
    pub fn sign(self) -> f64 {
        match self {
            Action::Buy => 1.0,
            Action::Sell => -1.0,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Action::Buy => Direction::Bullish,
            Action::Sell => Direction::Bearish,
        }
    }

    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Bullish => Action::Buy,
            Direction::Bearish => Action::Sell,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub action: Action,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Distance from entry to stop in price units.
    pub risk_amount: f64,
    pub score: f64,
    pub reason: String,
    pub timestamp: NaiveDateTime,
}

impl Signal {
    /// Builds a signal whose target is `reward_multiple` times the stop
    /// distance away from `price`.
    pub fn with_reward_multiple(
        action: Action,
        price: f64,
        stop_loss: f64,
        reward_multiple: f64,
        reason: &str,
        timestamp: NaiveDateTime,
    ) -> Self {
        let risk = (price - stop_loss).abs();
        Signal {
            action,
            price,
            stop_loss,
            take_profit: price + action.sign() * risk * reward_multiple,
            risk_amount: risk,
            score: 0.0,
            reason: reason.to_string(),
            timestamp,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn risk(&self) -> f64 {
        (self.price - self.stop_loss).abs()
    }

    pub fn reward(&self) -> f64 {
        (self.take_profit - self.price).abs()
    }

    /// Reward over risk; 0 when the stop sits on the entry.
    pub fn risk_reward(&self) -> f64 {
        let risk = self.risk();
        if risk > 0.0 { self.reward() / risk } else { 0.0 }
    }

    /// Contract check applied by the driver before a signal can open a
    /// position. Any failure aborts the run.
    pub fn validate(&self, strategy: &str, bar_time: NaiveDateTime) -> Result<(), IctraderError> {
        let violation = |reason: String| IctraderError::ContractViolation {
            strategy: strategy.to_string(),
            reason,
        };

        let fields = [
            ("price", self.price),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
            ("risk_amount", self.risk_amount),
            ("score", self.score),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(violation(format!("{name} is not finite ({value})")));
        }
        if self.price <= 0.0 {
            return Err(violation(format!("price {} is not positive", self.price)));
        }
        if !(0.0..=100.0).contains(&self.score) {
            return Err(violation(format!("score {} outside [0, 100]", self.score)));
        }

        let ordered = match self.action {
            Action::Buy => self.stop_loss < self.price && self.price < self.take_profit,
            Action::Sell => self.take_profit < self.price && self.price < self.stop_loss,
        };
        if !ordered {
            return Err(violation(format!(
                "{} signal has stop {} / price {} / target {} out of order",
                self.action, self.stop_loss, self.price, self.take_profit
            )));
        }

        if self.timestamp != bar_time {
            return Err(violation(format!(
                "signal time {} is not the current bar {}",
                self.timestamp, bar_time
            )));
        }
        Ok(())
    }
}
