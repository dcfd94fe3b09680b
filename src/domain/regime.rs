//! Market regime: daily bias, EMA trend stack, volatility and ATR.

use chrono::NaiveDate;

use super::indicator::atr::{DEFAULT_ATR_PERIOD, calculate_atr};
use super::indicator::ema::calculate_ema;
use super::indicator::volatility::calculate_volatility;
use super::ohlcv::Bar;
use super::pattern::Direction;

pub const TREND_SPANS: (usize, usize, usize) = (20, 50, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Bullish,
    Bearish,
    Unknown,
}

impl Bias {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Bias::Bullish => Some(Direction::Bullish),
            Bias::Bearish => Some(Direction::Bearish),
            Bias::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    StrongBullish,
    StrongBearish,
    Neutral,
}

/// Resamples to daily first-open/last-close and compares the latest day's
/// open with the previous day's close. Needs two distinct dates.
pub fn daily_bias(bars: &[Bar]) -> Bias {
    let mut days: Vec<(NaiveDate, f64, f64)> = Vec::new();
    for bar in bars {
        match days.last_mut() {
            Some((date, _, close)) if *date == bar.date() => *close = bar.close,
            _ => days.push((bar.date(), bar.open, bar.close)),
        }
    }
    match days.as_slice() {
        [.., (_, _, prev_close), (_, open, _)] => {
            if open > prev_close {
                Bias::Bullish
            } else {
                Bias::Bearish
            }
        }
        _ => Bias::Unknown,
    }
}

/// Strict ordering of close against EMA(20) > EMA(50) > EMA(100).
pub fn trend_strength(bars: &[Bar]) -> Trend {
    let (short, medium, long) = TREND_SPANS;
    let Some(price) = bars.last().map(|b| b.close) else {
        return Trend::Neutral;
    };
    let last = |span| calculate_ema(bars, span).last_value();
    let (Some(s), Some(m), Some(l)) = (last(short), last(medium), last(long)) else {
        return Trend::Neutral;
    };

    if price > s && s > m && m > l {
        Trend::StrongBullish
    } else if price < s && s < m && m < l {
        Trend::StrongBearish
    } else {
        Trend::Neutral
    }
}

pub fn volatility(bars: &[Bar]) -> Option<f64> {
    calculate_volatility(bars)
}

pub fn atr(bars: &[Bar], period: usize) -> Option<f64> {
    calculate_atr(bars, period).last_value()
}

/// Everything the regime classifier knows about the window's last bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Regime {
    pub bias: Bias,
    pub trend: Trend,
    pub volatility: Option<f64>,
    pub atr: Option<f64>,
}

impl Regime {
    pub fn classify(bars: &[Bar]) -> Self {
        Self::classify_with_atr(bars, DEFAULT_ATR_PERIOD)
    }

    pub fn classify_with_atr(bars: &[Bar], atr_period: usize) -> Self {
        Regime {
            bias: daily_bias(bars),
            trend: trend_strength(bars),
            volatility: volatility(bars),
            atr: atr(bars, atr_period),
        }
    }
}
