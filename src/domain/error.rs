//! Domain error types.
//!
//! Only configuration, data and contract failures are errors. Short windows,
//! degenerate sizing and degenerate statistics are absorbed as `None`,
//! rejected entries and sentinel values respectively.

/// Top-level error type for ictrader.
#[derive(Debug, thiserror::Error)]
pub enum IctraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("strategy {strategy} broke the signal contract: {reason}")]
    ContractViolation { strategy: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&IctraderError> for std::process::ExitCode {
    fn from(err: &IctraderError) -> Self {
        let code: u8 = match err {
            IctraderError::Io(_) => 1,
            IctraderError::ConfigParse { .. }
            | IctraderError::ConfigMissing { .. }
            | IctraderError::ConfigInvalid { .. } => 2,
            IctraderError::Data { .. } => 3,
            IctraderError::ContractViolation { .. } => 4,
            IctraderError::NoData { .. } | IctraderError::InvalidBar { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
