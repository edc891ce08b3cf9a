//! Universe handling for multi-instrument backtests.
//!
//! Parses code lists from configuration and validates that each code has
//! enough bars to warm up the rule and the volatility estimator.

use crate::domain::error::VoltraderError;
use crate::domain::signal::TradingRule;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Universe {
    pub codes: Vec<String>,
    pub exchange: String,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if seen.contains(&code) {
            return Err(UniverseError::DuplicateCode(code));
        }
        seen.insert(code.clone());
        codes.push(code);
    }

    Ok(codes)
}

/// Bars needed before a single position can be sized: the rule's slowest
/// window or the volatility warm-up (window returns + the seed bar),
/// whichever is longer.
pub fn required_bars(rule: &TradingRule, volatility_window: usize) -> usize {
    rule.slowest_window().max(volatility_window + 1)
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedCode>,
}

pub fn validate_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    exchange: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    minimum_bars: usize,
) -> Result<UniverseValidationResult, VoltraderError> {
    let mut valid_codes = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let bars = match data_port.fetch_ohlcv(&code, exchange, start_date, end_date) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Warning: skipping {}.{} ({})", code, exchange, e);
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars.is_empty() {
            eprintln!("Warning: skipping {}.{} (no data found)", code, exchange);
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < minimum_bars {
            eprintln!(
                "Warning: skipping {}.{} (only {} bars, minimum {} required)",
                code,
                exchange,
                bars.len(),
                minimum_bars
            );
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        eprintln!("  {}: {} bars [OK]", code, bars.len());
        valid_codes.push(code);
    }

    if valid_codes.is_empty() {
        return Err(VoltraderError::InsufficientData {
            code: "all".to_string(),
            exchange: exchange.to_string(),
            bars: 0,
            minimum: minimum_bars,
        });
    }

    if !skipped.is_empty() {
        eprintln!(
            "Backtesting {} of {} codes on {}",
            valid_codes.len(),
            valid_codes.len() + skipped.len(),
            exchange
        );
    }

    Ok(UniverseValidationResult {
        universe: Universe {
            codes: valid_codes,
            exchange: exchange.to_string(),
        },
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_codes_basic() {
        let result = parse_codes("GOOG,MSFT,TSLA").unwrap();
        assert_eq!(result, vec!["GOOG", "MSFT", "TSLA"]);
    }

    #[test]
    fn parse_codes_trims_and_uppercases() {
        let result = parse_codes("  goog , msft ,TSLA  ").unwrap();
        assert_eq!(result, vec!["GOOG", "MSFT", "TSLA"]);
    }

    #[test]
    fn parse_codes_single() {
        assert_eq!(parse_codes("GOOG").unwrap(), vec!["GOOG"]);
    }

    #[test]
    fn parse_codes_empty_token() {
        assert!(matches!(
            parse_codes("GOOG,,MSFT"),
            Err(UniverseError::EmptyToken)
        ));
    }

    #[test]
    fn parse_codes_duplicate() {
        assert!(matches!(
            parse_codes("GOOG,MSFT,goog"),
            Err(UniverseError::DuplicateCode(s)) if s == "GOOG"
        ));
    }

    #[test]
    fn required_bars_rule_dominates() {
        let rule = TradingRule::Crossover { fast: 16, slow: 64 };
        assert_eq!(required_bars(&rule, 30), 64);
    }

    #[test]
    fn required_bars_volatility_dominates() {
        let rule = TradingRule::Crossover { fast: 4, slow: 12 };
        assert_eq!(required_bars(&rule, 30), 31);
    }

    #[test]
    fn required_bars_composite_uses_slowest_member() {
        let rule = TradingRule::default_composite();
        assert_eq!(required_bars(&rule, 30), 256);
    }

    #[test]
    fn universe_count() {
        let universe = Universe {
            codes: vec!["GOOG".to_string(), "MSFT".to_string()],
            exchange: "NASDAQ".to_string(),
        };
        assert_eq!(universe.count(), 2);
    }
}
