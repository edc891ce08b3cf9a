#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use voltrader::domain::error::VoltraderError;
pub use voltrader::domain::ohlcv::OhlcvBar;
use voltrader::domain::simulator::SimulationConfig;
use voltrader::domain::sizing::SizingConfig;
use voltrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        _exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, VoltraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(VoltraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_symbols(&self, _exchange: &str) -> Result<Vec<String>, VoltraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
        _exchange: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, VoltraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(VoltraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(code: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        exchange: "NASDAQ".to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000,
    }
}

/// Bars with closes taken from an explicit price path, one per day.
pub fn bars_from_prices(code: &str, start_date: &str, prices: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            code: code.to_string(),
            exchange: "NASDAQ".to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1000,
        })
        .collect()
}

pub fn constant_prices(value: f64, count: usize) -> Vec<f64> {
    vec![value; count]
}

pub fn linear_prices(start: f64, end: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| start + (end - start) * i as f64 / (count - 1) as f64)
        .collect()
}

/// A deterministic wobbly uptrend: enough texture for non-zero volatility
/// without any randomness.
pub fn wavy_prices(base: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let trend = base + i as f64 * 0.2;
            let wobble = ((i % 7) as f64 - 3.0) * 0.8;
            trend + wobble
        })
        .collect()
}

pub fn sample_sim_config() -> SimulationConfig {
    SimulationConfig {
        initial_capital: 100_000.0,
        transaction_cost_rate: 0.001,
        slippage_rate: 0.0005,
        rebalance_threshold_fraction: 0.01,
        volatility_window: 30,
        periods_per_year: 252.0,
        risk_free_rate: 0.0,
        drawdown_policy: None,
    }
}

pub fn sample_sizing_config() -> SizingConfig {
    SizingConfig {
        capital: 100_000.0,
        target_volatility: 0.20,
        max_position_fraction: 0.10,
    }
}
