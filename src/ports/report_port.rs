//! Result sink port.

use std::path::Path;

use crate::domain::error::IctraderError;
use crate::domain::metrics::BacktestResult;

/// Persists a finished run somewhere under `output`.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output: &Path) -> Result<(), IctraderError>;
}
