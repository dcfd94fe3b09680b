//! Bar feed port.

use chrono::NaiveDateTime;

use crate::domain::error::IctraderError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Bars for `symbol` in timestamp order, limited to `[start, end]` when
    /// bounds are given.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, IctraderError>;
}
