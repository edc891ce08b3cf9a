//! Trading-rule signal generation.
//!
//! A closed set of rule variants, each turning a close-price series into a
//! scaled forecast series:
//! - `Crossover`: simple rolling means; raw = (fast - slow) / close.
//! - `ExponentialCrossover`: SMA-seeded EMAs (k = 2/(span+1)); same raw
//!   formula. Reacts to new information within a few periods instead of
//!   dropping observations at the window edge.
//! - `Composite`: equal-weighted mean of member exponential crossovers'
//!   already-scaled forecasts, across trend speeds.
//!
//! Warmup: a forecast is `None` until the slowest mean involved is defined.

use std::fmt;

use crate::domain::forecast::{scale_forecasts, FORECAST_CAP, TARGET_ABS_FORECAST};
use crate::domain::ohlcv::OhlcvBar;

/// Member spans of the default composite rule: fast, medium, slow trend speeds.
pub const DEFAULT_COMPOSITE_SPANS: [(usize, usize); 3] = [(16, 64), (32, 128), (64, 256)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradingRule {
    Crossover { fast: usize, slow: usize },
    ExponentialCrossover { fast_span: usize, slow_span: usize },
    Composite { spans: Vec<(usize, usize)> },
}

impl TradingRule {
    /// The default diversified rule: exponential crossovers at three speeds.
    pub fn default_composite() -> Self {
        TradingRule::Composite {
            spans: DEFAULT_COMPOSITE_SPANS.to_vec(),
        }
    }

    /// Index of the first bar that can carry a defined forecast.
    pub fn warmup(&self) -> usize {
        match self {
            TradingRule::Crossover { slow, .. } => slow.saturating_sub(1),
            TradingRule::ExponentialCrossover { slow_span, .. } => slow_span.saturating_sub(1),
            TradingRule::Composite { spans } => spans
                .iter()
                .map(|(_, slow)| slow.saturating_sub(1))
                .min()
                .unwrap_or(0),
        }
    }

    /// Slowest window any part of the rule needs before it is fully warmed up.
    pub fn slowest_window(&self) -> usize {
        match self {
            TradingRule::Crossover { slow, .. } => *slow,
            TradingRule::ExponentialCrossover { slow_span, .. } => *slow_span,
            TradingRule::Composite { spans } => {
                spans.iter().map(|(_, slow)| *slow).max().unwrap_or(0)
            }
        }
    }

    /// Generate the scaled forecast series for a bar sequence.
    pub fn generate(&self, bars: &[OhlcvBar]) -> Vec<Option<f64>> {
        match self {
            TradingRule::Crossover { fast, slow } => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                let fast_ma = sma_series(&closes, *fast);
                let slow_ma = sma_series(&closes, *slow);
                let raw = crossover_raw(&fast_ma, &slow_ma, &closes);
                scale_forecasts(&raw, TARGET_ABS_FORECAST, FORECAST_CAP)
            }
            TradingRule::ExponentialCrossover {
                fast_span,
                slow_span,
            } => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                let fast_ma = ema_series(&closes, *fast_span);
                let slow_ma = ema_series(&closes, *slow_span);
                let raw = crossover_raw(&fast_ma, &slow_ma, &closes);
                scale_forecasts(&raw, TARGET_ABS_FORECAST, FORECAST_CAP)
            }
            TradingRule::Composite { spans } => {
                let members: Vec<Vec<Option<f64>>> = spans
                    .iter()
                    .map(|&(fast_span, slow_span)| {
                        TradingRule::ExponentialCrossover {
                            fast_span,
                            slow_span,
                        }
                        .generate(bars)
                    })
                    .collect();
                combine_members(&members, bars.len())
            }
        }
    }
}

impl fmt::Display for TradingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingRule::Crossover { fast, slow } => write!(f, "CROSSOVER({},{})", fast, slow),
            TradingRule::ExponentialCrossover {
                fast_span,
                slow_span,
            } => write!(f, "EWMAC({},{})", fast_span, slow_span),
            TradingRule::Composite { spans } => {
                write!(f, "COMPOSITE(")?;
                for (i, (fast, slow)) in spans.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}/{}", fast, slow)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Simple moving average of `values`, `None` for the first `period - 1` entries.
fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        out.resize(values.len(), None);
        return out;
    }

    let mut running = 0.0;
    for (i, &value) in values.iter().enumerate() {
        running += value;
        if i + 1 < period {
            out.push(None);
        } else {
            if i + 1 > period {
                running -= values[i - period];
            }
            out.push(Some(running / period as f64));
        }
    }
    out
}

/// Exponential moving average: k = 2/(span+1), seeded with the SMA of the
/// first `span` values, defined from index `span - 1`.
fn ema_series(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if span == 0 {
        out.resize(values.len(), None);
        return out;
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        if i < span - 1 {
            sum += value;
            out.push(None);
        } else if i == span - 1 {
            sum += value;
            ema = sum / span as f64;
            out.push(Some(ema));
        } else {
            ema = value * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }
    out
}

/// Raw crossover signal: (fast - slow) / close where both means are defined.
///
/// Dividing by the price level makes the signal comparable across instruments
/// trading at different prices.
fn crossover_raw(
    fast: &[Option<f64>],
    slow: &[Option<f64>],
    closes: &[f64],
) -> Vec<Option<f64>> {
    fast.iter()
        .zip(slow)
        .zip(closes)
        .map(|((f, s), &close)| match (f, s) {
            (Some(f), Some(s)) => Some((f - s) / close),
            _ => None,
        })
        .collect()
}

/// Equal-weighted mean of the member forecasts defined at each index,
/// clamped to the forecast cap. `None` only where no member is defined yet.
fn combine_members(members: &[Vec<Option<f64>>], len: usize) -> Vec<Option<f64>> {
    (0..len)
        .map(|i| {
            let defined: Vec<f64> = members.iter().filter_map(|m| m[i]).collect();
            if defined.is_empty() {
                None
            } else {
                let mean = defined.iter().sum::<f64>() / defined.len() as f64;
                Some(mean.clamp(-FORECAST_CAP, FORECAST_CAP))
            }
        })
        .collect()
}
