//! Domain error types.
//!
//! Warm-up and degenerate-signal conditions are represented as values
//! (`None` forecasts, zero positions), never as errors. Only structurally
//! invalid input surfaces here.

use chrono::NaiveDate;

/// Top-level error type for voltrader.
#[derive(Debug, thiserror::Error)]
pub enum VoltraderError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("invalid price for {code} on {date}: {value}")]
    InvalidPrice {
        code: String,
        date: NaiveDate,
        value: f64,
    },

    #[error("bars for {code} are not strictly increasing at {date}")]
    UnorderedBars { code: String, date: NaiveDate },

    #[error("no data for {code} on {exchange}")]
    NoData { code: String, exchange: String },

    #[error("insufficient data for {code} on {exchange}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        exchange: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&VoltraderError> for std::process::ExitCode {
    fn from(err: &VoltraderError) -> Self {
        let code: u8 = match err {
            VoltraderError::Io(_) => 1,
            VoltraderError::ConfigParse { .. }
            | VoltraderError::ConfigMissing { .. }
            | VoltraderError::ConfigInvalid { .. } => 2,
            VoltraderError::Data { .. } => 3,
            VoltraderError::InvalidPrice { .. } | VoltraderError::UnorderedBars { .. } => 4,
            VoltraderError::NoData { .. } | VoltraderError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
