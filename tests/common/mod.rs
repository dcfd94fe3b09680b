#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use ictrader::domain::error::IctraderError;
pub use ictrader::domain::ohlcv::Bar;
use ictrader::domain::signal::{Action, Signal};
use ictrader::domain::strategy::{
    AmdParams, IctCombinedParams, IctParams, LiquidityParams, MaCrossoverParams, Strategy,
    StrategyState, StrategyVariant, TradingStrategy,
};
use ictrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 8)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly bar `i` after `t0`.
pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
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
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c + 1.0, c - 1.0, c))
        .collect()
}

/// Deterministic oscillating series: a slow sine swing plus a faster ripple,
/// enough to produce swings, gaps and crossovers.
pub fn wave_bars(n: usize) -> Vec<Bar> {
    let mut prev = 100.0;
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 8.0 * (x / 9.0).sin() + 1.5 * (x / 2.0).sin();
            let open = prev;
            prev = close;
            let high = open.max(close) + 0.4 + 0.3 * (x / 3.0).cos().abs();
            let low = open.min(close) - 0.4 - 0.3 * (x / 5.0).sin().abs();
            make_bar(i, open, high, low, close)
        })
        .collect()
}

pub fn all_variants() -> Vec<TradingStrategy> {
    vec![
        TradingStrategy::new(
            "cross",
            StrategyVariant::MaCrossover(MaCrossoverParams::default()),
        ),
        TradingStrategy::new("ict", StrategyVariant::Ict(IctParams::default())),
        TradingStrategy::new(
            "liquidity",
            StrategyVariant::Liquidity(LiquidityParams::default()),
        ),
        TradingStrategy::new("amd", StrategyVariant::Amd(AmdParams::default())),
        TradingStrategy::new(
            "gold",
            StrategyVariant::IctCombined(IctCombinedParams::default()),
        ),
    ]
}

/// One scripted entry: at bar `index`, trade `action` with the stop
/// `stop_distance` away and the target at `reward` times that.
#[derive(Debug, Clone)]
pub struct ScriptedEntry {
    pub index: usize,
    pub action: Action,
    pub stop_distance: f64,
    pub reward: f64,
}

pub fn buy_at(index: usize, stop_distance: f64, reward: f64) -> ScriptedEntry {
    ScriptedEntry {
        index,
        action: Action::Buy,
        stop_distance,
        reward,
    }
}

pub fn sell_at(index: usize, stop_distance: f64, reward: f64) -> ScriptedEntry {
    ScriptedEntry {
        action: Action::Sell,
        ..buy_at(index, stop_distance, reward)
    }
}

/// Emits pre-scripted signals at the close of given hourly bars and trades a
/// fixed size.
pub struct ScriptedStrategy {
    pub name: String,
    pub entries: Vec<ScriptedEntry>,
    pub size: f64,
    /// Flip stop and target so the signal breaks the contract.
    pub inverted: bool,
}

impl ScriptedStrategy {
    pub fn new(name: &str, entries: Vec<ScriptedEntry>) -> Self {
        Self {
            name: name.to_string(),
            entries,
            size: 100.0,
            inverted: false,
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn analyze(&self, window: &[Bar], state: &mut StrategyState) -> Option<Signal> {
        let bar = window.last()?;
        let index = (bar.timestamp - t0()).num_hours() as usize;
        let entry = self.entries.iter().find(|e| e.index == index)?;
        let sign = if self.inverted {
            -entry.action.sign()
        } else {
            entry.action.sign()
        };
        state.signals_today += 1;
        Some(Signal::with_reward_multiple(
            entry.action,
            bar.close,
            bar.close - sign * entry.stop_distance,
            entry.reward,
            "scripted",
            bar.timestamp,
        ))
    }

    fn size_position(&self, _balance: f64, _risk_distance: f64) -> Option<f64> {
        Some(self.size)
    }
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, IctraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(IctraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<Bar> = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start.is_none_or(|s| b.timestamp >= s))
                    .filter(|b| end.is_none_or(|e| b.timestamp <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(IctraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

/// Writes bars as CSV in the feed's format.
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},1000\n",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close
        ));
    }
    out
}
