//! OHLC(V) bar representation and bar-feed validation.

use chrono::{NaiveDate, NaiveDateTime};

use super::error::IctraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Bar {
    /// Calendar date of the bar, used for daily resampling and day counters.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Parses `YYYY-MM-DD HH:MM:SS`, the `T`-separated form, or a bare date
/// (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Check the bar-feed contract: strictly increasing timestamps, finite
/// non-negative prices, high >= low, open and close inside [low, high].
pub fn validate_bars(bars: &[Bar]) -> Result<(), IctraderError> {
    for (index, bar) in bars.iter().enumerate() {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(IctraderError::InvalidBar {
                index,
                reason: "prices must be finite and non-negative".into(),
            });
        }
        if bar.high < bar.low {
            return Err(IctraderError::InvalidBar {
                index,
                reason: format!("high {} below low {}", bar.high, bar.low),
            });
        }
        let inside = |p: f64| p >= bar.low && p <= bar.high;
        if !inside(bar.open) || !inside(bar.close) {
            return Err(IctraderError::InvalidBar {
                index,
                reason: "open/close outside [low, high]".into(),
            });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(IctraderError::InvalidBar {
                index,
                reason: format!(
                    "timestamp {} not after {}",
                    bar.timestamp,
                    bars[index - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
