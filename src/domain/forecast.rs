//! Forecast normalization.
//!
//! Raw rule output is rescaled so the mean absolute forecast lands on a
//! standard target (10), then clamped to a symmetric cap (±20). The scalar is
//! calibrated over the whole available sample, including bars after the point
//! being scaled; trailing-only calibration would change results materially
//! and is deliberately not done here.

pub const TARGET_ABS_FORECAST: f64 = 10.0;
pub const FORECAST_CAP: f64 = 20.0;

/// Scale a raw forecast series to the standard range.
///
/// `None` entries (warm-up) stay `None`. A zero or undefined mean absolute
/// raw value flattens every defined entry to `Some(0.0)` rather than
/// dividing by zero.
pub fn scale_forecasts(
    raw: &[Option<f64>],
    target_abs_avg: f64,
    cap: f64,
) -> Vec<Option<f64>> {
    let defined: Vec<f64> = raw.iter().flatten().copied().collect();

    let mean_abs = if defined.is_empty() {
        0.0
    } else {
        defined.iter().map(|v| v.abs()).sum::<f64>() / defined.len() as f64
    };

    if mean_abs == 0.0 || !mean_abs.is_finite() {
        return raw.iter().map(|v| v.map(|_| 0.0)).collect();
    }

    let scalar = target_abs_avg / mean_abs;
    raw.iter()
        .map(|v| v.map(|value| (value * scalar).clamp(-cap, cap)))
        .collect()
}
