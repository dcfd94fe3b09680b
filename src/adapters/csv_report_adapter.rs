//! CSV result sink: `trades.csv` and `equity.csv` in the output directory.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::domain::error::IctraderError;
use crate::domain::metrics::BacktestResult;
use crate::ports::report_port::ReportPort;

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";

const TRADE_HEADER: [&str; 8] = [
    "entry_time",
    "exit_time",
    "action",
    "entry_price",
    "exit_price",
    "size",
    "profit",
    "exit_type",
];
const EQUITY_HEADER: [&str; 2] = ["sequence_index", "equity"];

#[derive(Serialize)]
struct EquityRow {
    sequence_index: usize,
    equity: f64,
}

pub struct CsvReportAdapter;

/// Writer with the header already written, so empty reports still parse.
fn writer(path: &Path, header: &[&str]) -> Result<csv::Writer<fs::File>, IctraderError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    wtr.write_record(header).map_err(|e| csv_error(path, e))?;
    Ok(wtr)
}

fn csv_error(path: &Path, e: csv::Error) -> IctraderError {
    IctraderError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output: &Path) -> Result<(), IctraderError> {
        fs::create_dir_all(output)?;

        let trades_path = output.join(TRADES_FILE);
        let mut wtr = writer(&trades_path, &TRADE_HEADER)?;
        for trade in &result.trades {
            wtr.serialize(trade).map_err(|e| csv_error(&trades_path, e))?;
        }
        wtr.flush()?;

        let equity_path = output.join(EQUITY_FILE);
        let mut wtr = writer(&equity_path, &EQUITY_HEADER)?;
        for (sequence_index, &equity) in result.equity_curve.iter().enumerate() {
            wtr.serialize(EquityRow {
                sequence_index,
                equity,
            })
            .map_err(|e| csv_error(&equity_path, e))?;
        }
        wtr.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, Trade};
    use crate::domain::signal::Action;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn result() -> BacktestResult {
        let at = |h| {
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        BacktestResult {
            total_trades: 1,
            winning_trades: 1,
            losing_trades: 0,
            win_rate: 100.0,
            profit_factor: f64::INFINITY,
            max_drawdown: 0.0,
            final_balance: 10_100.0,
            total_return: 1.0,
            sharpe_ratio: 0.0,
            trades: vec![Trade {
                entry_time: at(9),
                exit_time: at(11),
                action: Action::Sell,
                entry_price: 101.0,
                exit_price: 100.0,
                size: 100.0,
                profit: 100.0,
                exit_type: ExitReason::TakeProfit,
            }],
            equity_curve: vec![10_000.0, 10_050.0, 10_100.0],
        }
    }

    #[test]
    fn writes_trades_and_equity() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("run");
        CsvReportAdapter.write(&result(), &out).unwrap();

        let trades = fs::read_to_string(out.join(TRADES_FILE)).unwrap();
        let mut lines = trades.lines();
        assert_eq!(
            lines.next().unwrap(),
            "entry_time,exit_time,action,entry_price,exit_price,size,profit,exit_type"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-15T09:00:00,2024-01-15T11:00:00,sell,101.0,100.0,100.0,100.0,take_profit"
        );

        let equity = fs::read_to_string(out.join(EQUITY_FILE)).unwrap();
        assert_eq!(equity.lines().count(), 4);
        assert_eq!(equity.lines().nth(3).unwrap(), "2,10100.0");
    }

    #[test]
    fn empty_run_writes_headers() {
        let dir = TempDir::new().unwrap();
        let mut empty = result();
        empty.trades.clear();
        empty.equity_curve.clear();
        CsvReportAdapter.write(&empty, dir.path()).unwrap();

        let trades = fs::read_to_string(dir.path().join(TRADES_FILE)).unwrap();
        assert_eq!(
            trades,
            "entry_time,exit_time,action,entry_price,exit_price,size,profit,exit_type\n"
        );
        let equity = fs::read_to_string(dir.path().join(EQUITY_FILE)).unwrap();
        assert_eq!(equity, "sequence_index,equity\n");

        let mut rdr = csv::Reader::from_path(dir.path().join(TRADES_FILE)).unwrap();
        assert_eq!(rdr.headers().unwrap().len(), 8);
        assert_eq!(rdr.records().count(), 0);
    }
}
