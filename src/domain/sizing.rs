//! Volatility-targeted position sizing.
//!
//! Positions are inversely proportional to the instrument's own volatility so
//! each contributes comparable risk, scaled by forecast strength and hard-
//! capped by a maximum fraction of capital. Fractional shares are not
//! modeled; sizes truncate toward zero.

use crate::domain::forecast::TARGET_ABS_FORECAST;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub capital: f64,
    /// Annualized volatility target, as a fraction (0.20 = 20%).
    pub target_volatility: f64,
    /// Maximum notional exposure as a fraction of capital.
    pub max_position_fraction: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            capital: 100_000.0,
            target_volatility: 0.20,
            max_position_fraction: 0.10,
        }
    }
}

/// Target share count for a forecast at a given price and volatility.
///
/// Undefined or zero volatility and non-positive prices fail safe to zero:
/// "cannot size" is never an error and never an unbounded position. The
/// resulting notional never exceeds `capital * max_position_fraction`.
pub fn target_position(
    config: &SizingConfig,
    forecast: f64,
    price: f64,
    volatility: Option<f64>,
) -> i64 {
    let vol = match volatility {
        Some(v) if v > 0.0 && v.is_finite() => v,
        _ => return 0,
    };
    if price <= 0.0 || !price.is_finite() || !forecast.is_finite() {
        return 0;
    }

    let vol_based =
        (config.capital * config.target_volatility) / (price * vol) * (forecast / TARGET_ABS_FORECAST);
    let cap_based = (config.capital * config.max_position_fraction) / price;

    let shares = forecast.signum() * vol_based.abs().min(cap_based);
    shares.trunc() as i64
}

/// Fixed-fractional sizing: a flat fraction of capital per position,
/// regardless of volatility. Baseline alternative to volatility targeting.
pub fn fixed_fractional(capital: f64, price: f64, fraction: f64) -> i64 {
    if price <= 0.0 || !price.is_finite() {
        return 0;
    }
    ((capital * fraction) / price).trunc() as i64
}

/// Gross portfolio leverage: total absolute notional over capital.
pub fn portfolio_leverage(positions: &[(i64, f64)], capital: f64) -> f64 {
    if capital <= 0.0 {
        return 0.0;
    }
    let notional: f64 = positions
        .iter()
        .map(|&(shares, price)| (shares as f64 * price).abs())
        .sum();
    notional / capital
}
