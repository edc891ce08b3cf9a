//! Rolling annualized volatility estimation.
//!
//! Sample standard deviation (n-1 denominator) over a trailing window of
//! simple returns, scaled by sqrt(periods per year). Entries without a full
//! window of history are `None`, never zero: downstream sizing must treat
//! them as "cannot size".

use crate::domain::ohlcv::{simple_returns, OhlcvBar};

pub const DEFAULT_VOLATILITY_WINDOW: usize = 30;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Sample standard deviation. `None` for fewer than two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Rolling annualized volatility over a return series.
///
/// Output is aligned with `returns`: entry `i` covers `returns[i+1-window ..= i]`
/// and is `None` until `window` returns have accumulated.
pub fn rolling_volatility(
    returns: &[f64],
    window: usize,
    periods_per_year: f64,
) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(returns.len());
    if window == 0 {
        out.resize(returns.len(), None);
        return out;
    }

    for i in 0..returns.len() {
        if i + 1 < window {
            out.push(None);
        } else {
            let slice = &returns[i + 1 - window..=i];
            out.push(sample_stdev(slice).map(|sd| sd * periods_per_year.sqrt()));
        }
    }
    out
}

/// Annualized volatility series aligned with `bars`.
///
/// Bar `t` carries the estimate over the `window` returns ending at `t`, so
/// the first defined entry is at index `window` (one bar per return, plus the
/// seed bar).
pub fn volatility_series(
    bars: &[OhlcvBar],
    window: usize,
    periods_per_year: f64,
) -> Vec<Option<f64>> {
    let returns = simple_returns(bars);
    let by_return = rolling_volatility(&returns, window, periods_per_year);

    // Shift by one: return i belongs to bar i + 1.
    let mut out = Vec::with_capacity(bars.len());
    if !bars.is_empty() {
        out.push(None);
        out.extend(by_return);
    }
    out
}
