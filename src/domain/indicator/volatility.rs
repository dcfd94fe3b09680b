//! Annualized return volatility.
//!
//! Sample standard deviation (n-1) of close-to-close percentage returns over
//! the whole window, scaled by sqrt(252). Needs at least two returns.

use crate::domain::ohlcv::Bar;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn pct_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Sample standard deviation; `None` below two observations.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

pub fn calculate_volatility(bars: &[Bar]) -> Option<f64> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = pct_returns(&closes);
    sample_stddev(&returns).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
}
