//! Pattern detectors over a bar window.
//!
//! Every detector is a pure function of the slice it is given. Detectors that
//! need neighbours on both sides never evaluate the edges of the window, so an
//! empty result near the edges means "not evaluated", not "no pattern".

use chrono::NaiveDateTime;
use std::fmt;

use super::ohlcv::Bar;

/// Bars on each side a swing point must dominate.
pub const SWING_RADIUS: usize = 2;

/// Swing points kept per side by [`liquidity_levels`].
pub const LIQUIDITY_LEVEL_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    SwingHigh,
    SwingLow,
    OrderBlock,
    FairValueGap,
    MarketStructureShift,
    MitigationBlock,
    BreakerBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
        }
    }
}

/// A detected pattern. `index` is the bar's position inside the analysed
/// window; `price_high`/`price_low` bound the zone (equal for swing points).
#[derive(Debug, Clone, PartialEq)]
pub struct PatternFeature {
    pub kind: PatternKind,
    pub direction: Direction,
    pub price_high: f64,
    pub price_low: f64,
    pub timestamp: NaiveDateTime,
    pub index: usize,
}

impl PatternFeature {
    pub fn contains(&self, price: f64) -> bool {
        self.price_low <= price && price <= self.price_high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    High,
    Low,
}

/// Lazy iterator over radius-2 swing points, ordered by timestamp. A clone
/// continues independently from the same position.
#[derive(Debug, Clone)]
pub struct SwingPoints<'a> {
    bars: &'a [Bar],
    side: Side,
    cursor: usize,
}

impl<'a> SwingPoints<'a> {
    fn new(bars: &'a [Bar], side: Side) -> Self {
        SwingPoints {
            bars,
            side,
            cursor: SWING_RADIUS,
        }
    }

    fn is_swing(&self, i: usize) -> bool {
        let b = self.bars;
        (1..=SWING_RADIUS).all(|k| match self.side {
            Side::High => b[i].high > b[i - k].high && b[i].high > b[i + k].high,
            Side::Low => b[i].low < b[i - k].low && b[i].low < b[i + k].low,
        })
    }
}

impl Iterator for SwingPoints<'_> {
    type Item = PatternFeature;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor + SWING_RADIUS < self.bars.len() {
            let i = self.cursor;
            self.cursor += 1;
            if !self.is_swing(i) {
                continue;
            }
            let bar = &self.bars[i];
            let (kind, direction, level) = match self.side {
                Side::High => (PatternKind::SwingHigh, Direction::Bearish, bar.high),
                Side::Low => (PatternKind::SwingLow, Direction::Bullish, bar.low),
            };
            return Some(PatternFeature {
                kind,
                direction,
                price_high: level,
                price_low: level,
                timestamp: bar.timestamp,
                index: i,
            });
        }
        None
    }
}

pub fn swing_highs(bars: &[Bar]) -> SwingPoints<'_> {
    SwingPoints::new(bars, Side::High)
}

pub fn swing_lows(bars: &[Bar]) -> SwingPoints<'_> {
    SwingPoints::new(bars, Side::Low)
}

/// Most recent swing extremes, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiquidityLevels {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

impl LiquidityLevels {
    /// Level closest to `price` on the given side.
    pub fn nearest(&self, direction: Direction, price: f64) -> Option<f64> {
        let levels = match direction {
            Direction::Bullish => &self.lows,
            Direction::Bearish => &self.highs,
        };
        levels
            .iter()
            .copied()
            .min_by(|a, b| (a - price).abs().total_cmp(&(b - price).abs()))
    }
}

fn tail(levels: Vec<f64>, n: usize) -> Vec<f64> {
    let skip = levels.len().saturating_sub(n);
    levels.into_iter().skip(skip).collect()
}

pub fn liquidity_levels(bars: &[Bar]) -> LiquidityLevels {
    LiquidityLevels {
        highs: tail(
            swing_highs(bars).map(|f| f.price_high).collect(),
            LIQUIDITY_LEVEL_COUNT,
        ),
        lows: tail(
            swing_lows(bars).map(|f| f.price_low).collect(),
            LIQUIDITY_LEVEL_COUNT,
        ),
    }
}

fn feature(kind: PatternKind, direction: Direction, bar: &Bar, index: usize) -> PatternFeature {
    PatternFeature {
        kind,
        direction,
        price_high: bar.high,
        price_low: bar.low,
        timestamp: bar.timestamp,
        index,
    }
}

/// Directional candle whose wick pokes beyond both neighbours in the opposite
/// sense: a bullish candle with a lower low than either neighbour, or a
/// bearish candle with a higher high.
pub fn order_blocks(bars: &[Bar]) -> Vec<PatternFeature> {
    let mut out = Vec::new();
    if bars.len() < 3 {
        return out;
    }
    for i in 1..bars.len() - 1 {
        let (prev, bar, next) = (&bars[i - 1], &bars[i], &bars[i + 1]);
        if bar.is_bullish() && bar.low < prev.low && bar.low < next.low {
            out.push(feature(PatternKind::OrderBlock, Direction::Bullish, bar, i));
        }
        if bar.is_bearish() && bar.high > prev.high && bar.high > next.high {
            out.push(feature(PatternKind::OrderBlock, Direction::Bearish, bar, i));
        }
    }
    out
}

/// Three-bar gaps between bar i-2 and bar i. A bullish gap sits below price
/// (`low[i] > high[i-2]`), a bearish one above (`high[i] < low[i-2]`).
pub fn fair_value_gaps(bars: &[Bar]) -> Vec<PatternFeature> {
    let mut out = Vec::new();
    for i in 2..bars.len() {
        let (first, third) = (&bars[i - 2], &bars[i]);
        if third.low > first.high {
            out.push(PatternFeature {
                kind: PatternKind::FairValueGap,
                direction: Direction::Bullish,
                price_high: third.low,
                price_low: first.high,
                timestamp: third.timestamp,
                index: i,
            });
        }
        if third.high < first.low {
            out.push(PatternFeature {
                kind: PatternKind::FairValueGap,
                direction: Direction::Bearish,
                price_high: first.low,
                price_low: third.high,
                timestamp: third.timestamp,
                index: i,
            });
        }
    }
    out
}

/// A gap stays active until some later close trades through its far edge.
pub fn is_gap_active(gap: &PatternFeature, bars: &[Bar]) -> bool {
    bars.iter().skip(gap.index + 1).all(|b| match gap.direction {
        Direction::Bullish => b.close >= gap.price_low,
        Direction::Bearish => b.close <= gap.price_high,
    })
}

/// Two higher lows followed by a close above the previous high (bullish), or
/// the mirror. Evaluated up to and including the last bar.
pub fn market_structure_shifts(bars: &[Bar]) -> Vec<PatternFeature> {
    let mut out = Vec::new();
    for i in 2..bars.len() {
        let (b2, b1, bar) = (&bars[i - 2], &bars[i - 1], &bars[i]);
        if bar.low > b1.low && bar.low > b2.low && bar.close > b1.high {
            out.push(feature(
                PatternKind::MarketStructureShift,
                Direction::Bullish,
                bar,
                i,
            ));
        }
        if bar.high < b1.high && bar.high < b2.high && bar.close < b1.low {
            out.push(feature(
                PatternKind::MarketStructureShift,
                Direction::Bearish,
                bar,
                i,
            ));
        }
    }
    out
}

/// Failed continuation: a lower high that also breaks the low two bars back
/// (bearish), or a higher low that breaks the high two bars back (bullish).
/// The last bar is not evaluated.
pub fn mitigation_blocks(bars: &[Bar]) -> Vec<PatternFeature> {
    let mut out = Vec::new();
    if bars.len() < 4 {
        return out;
    }
    for i in 2..bars.len() - 1 {
        let (b2, b1, bar) = (&bars[i - 2], &bars[i - 1], &bars[i]);
        if bar.high < b1.high && bar.low < b2.low {
            out.push(feature(
                PatternKind::MitigationBlock,
                Direction::Bearish,
                bar,
                i,
            ));
        }
        if bar.low > b1.low && bar.high > b2.high {
            out.push(feature(
                PatternKind::MitigationBlock,
                Direction::Bullish,
                bar,
                i,
            ));
        }
    }
    out
}

/// Order blocks that a later close invalidated, flipped to the opposite
/// direction. Timestamped at the first invalidating bar.
pub fn breaker_blocks(bars: &[Bar]) -> Vec<PatternFeature> {
    order_blocks(bars)
        .into_iter()
        .filter_map(|ob| {
            let (offset, breaker) = bars
                .iter()
                .enumerate()
                .skip(ob.index + 1)
                .find(|(_, b)| match ob.direction {
                    Direction::Bullish => b.close < ob.price_low,
                    Direction::Bearish => b.close > ob.price_high,
                })?;
            Some(PatternFeature {
                kind: PatternKind::BreakerBlock,
                direction: ob.direction.opposite(),
                price_high: ob.price_high,
                price_low: ob.price_low,
                timestamp: breaker.timestamp,
                index: offset,
            })
        })
        .collect()
}

/// Shift in swing structure over the trailing `lookback` bars.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureShift {
    pub direction: Direction,
    /// Most recent swing high.
    pub high: f64,
    /// Most recent swing low.
    pub low: f64,
}

/// Higher swing high and higher swing low ⇒ bullish; both lower ⇒ bearish.
pub fn swing_structure(bars: &[Bar], lookback: usize) -> Option<StructureShift> {
    let start = bars.len().saturating_sub(lookback);
    let recent = &bars[start..];
    let highs: Vec<f64> = swing_highs(recent).map(|f| f.price_high).collect();
    let lows: Vec<f64> = swing_lows(recent).map(|f| f.price_low).collect();
    if highs.len() < 2 || lows.len() < 2 {
        return None;
    }
    let (h_prev, h_last) = (highs[highs.len() - 2], highs[highs.len() - 1]);
    let (l_prev, l_last) = (lows[lows.len() - 2], lows[lows.len() - 1]);

    let direction = if h_last < h_prev && l_last < l_prev {
        Direction::Bearish
    } else if h_last > h_prev && l_last > l_prev {
        Direction::Bullish
    } else {
        return None;
    };
    Some(StructureShift {
        direction,
        high: h_last,
        low: l_last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: t0() + Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Flat bars with the given highs and lows; open == close == midpoint.
    fn hl_bars(hl: &[(f64, f64)]) -> Vec<Bar> {
        hl.iter()
            .enumerate()
            .map(|(i, &(h, l))| {
                let mid = (h + l) / 2.0;
                bar(i, mid, h, l, mid)
            })
            .collect()
    }

    #[test]
    fn swing_high_requires_radius_two() {
        let bars = hl_bars(&[
            (10.0, 9.0),
            (11.0, 9.0),
            (15.0, 9.0),
            (11.0, 9.0),
            (10.0, 9.0),
        ]);
        let highs: Vec<_> = swing_highs(&bars).collect();
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 2);
        assert_eq!(highs[0].kind, PatternKind::SwingHigh);
        assert!((highs[0].price_high - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn swing_edges_not_evaluated() {
        // Highest bar is at index 1, which has only one bar before it.
        let bars = hl_bars(&[
            (10.0, 9.0),
            (20.0, 9.0),
            (11.0, 9.0),
            (10.0, 9.0),
            (9.5, 9.0),
        ]);
        assert_eq!(swing_highs(&bars).count(), 0);
        assert_eq!(swing_highs(&bars[..3]).count(), 0);
    }

    #[test]
    fn swing_ties_are_not_swings() {
        let bars = hl_bars(&[
            (10.0, 9.0),
            (15.0, 9.0),
            (15.0, 9.0),
            (11.0, 9.0),
            (10.0, 9.0),
        ]);
        assert_eq!(swing_highs(&bars).count(), 0);
    }

    #[test]
    fn swing_iterator_is_restartable() {
        let bars = hl_bars(&[
            (10.0, 5.0),
            (11.0, 4.0),
            (12.0, 2.0),
            (11.0, 4.0),
            (10.0, 5.0),
        ]);
        let iter = swing_lows(&bars);
        let again = iter.clone();
        assert_eq!(iter.count(), 1);
        assert_eq!(again.count(), 1);
        assert_eq!(swing_lows(&bars).count(), 1);
    }

    #[test]
    fn liquidity_levels_keep_last_five() {
        // Alternating pattern with a swing high every 4 bars.
        let mut hl = Vec::new();
        for k in 0..8 {
            let peak = 20.0 + k as f64;
            hl.push((10.0, 5.0));
            hl.push((12.0, 5.0));
            hl.push((peak, 5.0));
            hl.push((12.0, 5.0));
        }
        hl.push((10.0, 5.0));
        let levels = liquidity_levels(&hl_bars(&hl));
        assert_eq!(levels.highs, vec![23.0, 24.0, 25.0, 26.0, 27.0]);
        assert!(levels.lows.is_empty());
    }

    #[test]
    fn nearest_level_by_side() {
        let levels = LiquidityLevels {
            highs: vec![110.0, 105.0],
            lows: vec![90.0, 97.0],
        };
        assert_eq!(levels.nearest(Direction::Bullish, 100.0), Some(97.0));
        assert_eq!(levels.nearest(Direction::Bearish, 100.0), Some(105.0));
        assert_eq!(LiquidityLevels::default().nearest(Direction::Bullish, 1.0), None);
    }

    #[test]
    fn bullish_order_block() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0),
            bar(1, 98.5, 100.5, 98.0, 100.0), // bullish, lowest low
            bar(2, 100.0, 102.0, 99.5, 101.5),
        ];
        let obs = order_blocks(&bars);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].direction, Direction::Bullish);
        assert_eq!(obs[0].index, 1);
        assert!((obs[0].price_low - 98.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bearish_order_block() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0),
            bar(1, 101.5, 102.0, 100.0, 100.5), // bearish, highest high
            bar(2, 100.0, 101.0, 99.0, 99.5),
        ];
        let obs = order_blocks(&bars);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].direction, Direction::Bearish);
    }

    #[test]
    fn order_block_needs_next_bar() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0),
            bar(1, 98.5, 100.5, 98.0, 100.0),
        ];
        assert!(order_blocks(&bars).is_empty());
    }

    #[test]
    fn bullish_fair_value_gap() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.5),
            bar(1, 100.5, 104.0, 100.5, 103.5),
            bar(2, 103.5, 105.0, 102.0, 104.5),
        ];
        let gaps = fair_value_gaps(&bars);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].direction, Direction::Bullish);
        assert!((gaps[0].price_low - 101.0).abs() < f64::EPSILON);
        assert!((gaps[0].price_high - 102.0).abs() < f64::EPSILON);
        assert!(is_gap_active(&gaps[0], &bars));
    }

    #[test]
    fn bearish_gap_filled_is_inactive() {
        let mut bars = vec![
            bar(0, 104.0, 105.0, 103.0, 103.5),
            bar(1, 103.5, 103.5, 100.0, 100.5),
            bar(2, 100.5, 101.0, 99.0, 99.5),
        ];
        let gaps = fair_value_gaps(&bars);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].direction, Direction::Bearish);
        assert!(gaps[0].contains(102.0));
        assert!(is_gap_active(&gaps[0], &bars));

        bars.push(bar(3, 99.5, 104.0, 99.5, 103.8));
        assert!(!is_gap_active(&gaps[0], &bars));
    }

    #[test]
    fn overlapping_ranges_have_no_gap() {
        let bars = hl_bars(&[(101.0, 99.0), (102.0, 100.0), (101.5, 100.5)]);
        assert!(fair_value_gaps(&bars).is_empty());
    }

    #[test]
    fn market_structure_shift_on_last_bar() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0),
            bar(1, 100.0, 101.5, 99.5, 101.0),
            bar(2, 101.0, 103.0, 100.0, 102.5), // higher low, close above 101.5
        ];
        let shifts = market_structure_shifts(&bars);
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].direction, Direction::Bullish);
        assert_eq!(shifts[0].timestamp, bars[2].timestamp);
    }

    #[test]
    fn bearish_market_structure_shift() {
        let bars = vec![
            bar(0, 100.0, 102.0, 99.0, 100.0),
            bar(1, 100.0, 101.5, 99.5, 100.0),
            bar(2, 99.5, 100.5, 98.0, 98.5),
        ];
        let shifts = market_structure_shifts(&bars);
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].direction, Direction::Bearish);
    }

    #[test]
    fn mitigation_block_skips_last_bar() {
        let bars = hl_bars(&[(105.0, 100.0), (106.0, 101.0), (104.0, 99.0)]);
        assert!(mitigation_blocks(&bars).is_empty());

        let bars = hl_bars(&[(105.0, 100.0), (106.0, 101.0), (104.0, 99.0), (103.0, 98.0)]);
        let blocks = mitigation_blocks(&bars);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].direction, Direction::Bearish);
        assert_eq!(blocks[0].index, 2);
    }

    #[test]
    fn breaker_block_flips_invalidated_order_block() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0),
            bar(1, 98.5, 100.5, 98.0, 100.0), // bullish order block [98, 100.5]
            bar(2, 100.0, 102.0, 99.5, 101.5),
            bar(3, 101.5, 101.5, 97.0, 97.5), // closes below 98
            bar(4, 97.5, 98.0, 96.0, 96.5),
        ];
        let breakers = breaker_blocks(&bars);
        assert_eq!(breakers.len(), 1);
        assert_eq!(breakers[0].kind, PatternKind::BreakerBlock);
        assert_eq!(breakers[0].direction, Direction::Bearish);
        assert_eq!(breakers[0].index, 3);
        assert_eq!(breakers[0].timestamp, bars[3].timestamp);
    }

    #[test]
    fn swing_structure_bullish() {
        // Two rising swing highs and two rising swing lows.
        let bars = hl_bars(&[
            (10.0, 8.0),
            (11.0, 7.0),
            (12.0, 5.0), // swing low 5
            (13.0, 7.0),
            (15.0, 8.0), // swing high 15
            (13.0, 7.5),
            (12.0, 6.0), // swing low 6
            (14.0, 7.0),
            (17.0, 8.0), // swing high 17
            (14.0, 7.5),
            (13.0, 7.0),
        ]);
        let shift = swing_structure(&bars, 20).unwrap();
        assert_eq!(shift.direction, Direction::Bullish);
        assert!((shift.high - 17.0).abs() < f64::EPSILON);
        assert!((shift.low - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn swing_structure_needs_two_of_each() {
        let bars = hl_bars(&[(10.0, 8.0), (11.0, 7.0), (12.0, 5.0), (11.0, 7.0), (10.0, 8.0)]);
        assert_eq!(swing_structure(&bars, 20), None);
        assert_eq!(swing_structure(&[], 20), None);
    }
}
