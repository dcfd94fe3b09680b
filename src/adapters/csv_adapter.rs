//! CSV bar feed.
//!
//! Expects a header row and `timestamp,open,high,low,close[,volume]` columns.
//! Timestamps are `YYYY-MM-DD HH:MM:SS` or a bare date.

use chrono::NaiveDateTime;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::IctraderError;
use crate::domain::ohlcv::{Bar, parse_timestamp};
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    /// `base_path` is either a directory holding `<SYMBOL>.csv` files or a
    /// single CSV file used for every symbol.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        if self.base_path.is_file() {
            self.base_path.clone()
        } else {
            self.base_path.join(format!("{symbol}.csv"))
        }
    }
}

fn price(record: &csv::StringRecord, index: usize, name: &str, line: usize) -> Result<f64, IctraderError> {
    let raw = record.get(index).ok_or_else(|| IctraderError::Data {
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| IctraderError::Data {
        reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, IctraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| IctraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            // Header is line 1.
            let line = i + 2;
            let record = result.map_err(|e| IctraderError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;

            let raw_ts = record.get(0).ok_or_else(|| IctraderError::Data {
                reason: format!("line {line}: missing timestamp column"),
            })?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| IctraderError::Data {
                reason: format!("line {line}: invalid timestamp '{raw_ts}'"),
            })?;

            if start.is_some_and(|s| timestamp < s) || end.is_some_and(|e| timestamp > e) {
                continue;
            }

            let volume = match record.get(5).map(str::trim) {
                None | Some("") => None,
                Some(_) => Some(price(&record, 5, "volume", line)?),
            };

            bars.push(Bar {
                timestamp,
                open: price(&record, 1, "open", line)?,
                high: price(&record, 2, "high", line)?,
                low: price(&record, 3, "low", line)?,
                close: price(&record, 4, "close", line)?,
                volume,
            });
        }

        if bars.is_empty() {
            return Err(IctraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
