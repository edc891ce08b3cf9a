//! Configuration validation.
//!
//! Checks every config field before a backtest runs, so bad values fail with
//! a section/key-specific message instead of surfacing mid-simulation.

use crate::domain::error::VoltraderError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    validate_positive_double(config, "backtest", "initial_capital", 100_000.0)?;
    validate_non_negative_double(config, "backtest", "transaction_cost_rate", 0.001)?;
    validate_non_negative_double(config, "backtest", "slippage_rate", 0.0005)?;
    validate_fraction(config, "backtest", "rebalance_threshold", 0.01)?;
    validate_positive_int(config, "backtest", "volatility_window", 30)?;
    validate_positive_double(config, "backtest", "periods_per_year", 252.0)?;
    validate_fraction(config, "backtest", "risk_free_rate", 0.03)?;
    validate_dates(config)?;
    validate_exchange(config)?;
    validate_codes(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    let rule = config
        .get_string("strategy", "rule")
        .unwrap_or_else(|| "ewmac".to_string())
        .to_lowercase();

    match rule.as_str() {
        "crossover" | "ewmac" => {
            let fast = config.get_int("strategy", "fast", 16);
            let slow = config.get_int("strategy", "slow", 64);
            if fast <= 0 || slow <= 0 {
                return Err(invalid(
                    "strategy",
                    "fast",
                    "fast and slow windows must be positive",
                ));
            }
            if fast >= slow {
                return Err(invalid(
                    "strategy",
                    "fast",
                    "fast window must be shorter than slow window",
                ));
            }
        }
        "composite" => {
            let spans = config
                .get_string("strategy", "spans")
                .unwrap_or_else(|| "16/64,32/128,64/256".to_string());
            let parsed = parse_spans(&spans)?;
            if parsed.is_empty() {
                return Err(invalid("strategy", "spans", "at least one span pair required"));
            }
        }
        other => {
            return Err(invalid(
                "strategy",
                "rule",
                &format!("unknown rule '{}', expected crossover, ewmac or composite", other),
            ));
        }
    }

    let cap = config.get_double("strategy", "forecast_cap", 20.0);
    let target = config.get_double("strategy", "target_abs_forecast", 10.0);
    if cap <= 0.0 {
        return Err(invalid("strategy", "forecast_cap", "must be positive"));
    }
    if target <= 0.0 || target > cap {
        return Err(invalid(
            "strategy",
            "target_abs_forecast",
            "must be positive and no larger than forecast_cap",
        ));
    }

    Ok(())
}

pub fn validate_sizing_config(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    let target_vol = config.get_double("sizing", "target_volatility", 0.20);
    if target_vol <= 0.0 {
        return Err(invalid("sizing", "target_volatility", "must be positive"));
    }

    let max_fraction = config.get_double("sizing", "max_position_fraction", 0.10);
    if max_fraction <= 0.0 || max_fraction > 1.0 {
        return Err(invalid(
            "sizing",
            "max_position_fraction",
            "must be between 0 (exclusive) and 1 (inclusive)",
        ));
    }

    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    if !config.get_bool("risk", "enabled", false) {
        return Ok(());
    }

    let scale_down = config.get_double("risk", "scale_down_threshold", 0.15);
    let stop = config.get_double("risk", "stop_trading_threshold", 0.30);
    let factor = config.get_double("risk", "scale_factor", 0.5);

    if scale_down <= 0.0 || scale_down >= 1.0 {
        return Err(invalid(
            "risk",
            "scale_down_threshold",
            "must be between 0 and 1",
        ));
    }
    if stop <= scale_down || stop >= 1.0 {
        return Err(invalid(
            "risk",
            "stop_trading_threshold",
            "must be between scale_down_threshold and 1",
        ));
    }
    if !(0.0..=1.0).contains(&factor) {
        return Err(invalid("risk", "scale_factor", "must be between 0 and 1"));
    }

    Ok(())
}

/// Parse "16/64,32/128" into span pairs.
pub fn parse_spans(input: &str) -> Result<Vec<(usize, usize)>, VoltraderError> {
    let mut spans = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (fast_str, slow_str) = trimmed.split_once('/').ok_or_else(|| {
            invalid(
                "strategy",
                "spans",
                &format!("expected fast/slow pair, got '{}'", trimmed),
            )
        })?;
        let fast: usize = fast_str.trim().parse().map_err(|_| {
            invalid("strategy", "spans", &format!("invalid fast span '{}'", fast_str))
        })?;
        let slow: usize = slow_str.trim().parse().map_err(|_| {
            invalid("strategy", "spans", &format!("invalid slow span '{}'", slow_str))
        })?;
        if fast == 0 || fast >= slow {
            return Err(invalid(
                "strategy",
                "spans",
                &format!("fast span must be positive and shorter than slow in '{}'", trimmed),
            ));
        }
        spans.push((fast, slow));
    }
    Ok(spans)
}

fn invalid(section: &str, key: &str, reason: &str) -> VoltraderError {
    VoltraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_positive_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), VoltraderError> {
    let value = config.get_double(section, key, default);
    if value <= 0.0 {
        return Err(invalid(section, key, "must be positive"));
    }
    Ok(())
}

fn validate_non_negative_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), VoltraderError> {
    let value = config.get_double(section, key, default);
    if value < 0.0 {
        return Err(invalid(section, key, "must be non-negative"));
    }
    Ok(())
}

fn validate_fraction(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), VoltraderError> {
    let value = config.get_double(section, key, default);
    if value < 0.0 || value >= 1.0 {
        return Err(invalid(section, key, "must be between 0 and 1"));
    }
    Ok(())
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), VoltraderError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, "must be positive"));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    let start = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start >= end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, VoltraderError> {
    match value {
        None => Err(VoltraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_exchange(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    match config.get_string("backtest", "exchange") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(VoltraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "exchange".to_string(),
        }),
    }
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), VoltraderError> {
    match config.get_string("backtest", "codes") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(VoltraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "codes".to_string(),
        }),
    }
}
