//! OHLCV bar representation and price-series validation.

use chrono::NaiveDate;

use crate::domain::error::VoltraderError;

#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub code: String,
    pub exchange: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Simple daily returns from consecutive closes: `r_t = close_t / close_{t-1} - 1`.
///
/// Output length is `bars.len() - 1`; entry `i` is the return into bar `i + 1`.
pub fn simple_returns(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| w[1].close / w[0].close - 1.0)
        .collect()
}

/// Validate a price series before simulation.
///
/// Every price field must be finite and strictly positive (each is a
/// denominator somewhere downstream), and dates must be strictly increasing.
pub fn validate_bars(bars: &[OhlcvBar]) -> Result<(), VoltraderError> {
    for bar in bars {
        for value in [bar.open, bar.high, bar.low, bar.close] {
            if !value.is_finite() || value <= 0.0 {
                return Err(VoltraderError::InvalidPrice {
                    code: bar.code.clone(),
                    date: bar.date,
                    value,
                });
            }
        }
    }

    for w in bars.windows(2) {
        if w[1].date <= w[0].date {
            return Err(VoltraderError::UnorderedBars {
                code: w[1].code.clone(),
                date: w[1].date,
            });
        }
    }

    Ok(())
}
