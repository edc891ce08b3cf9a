//! Performance statistics derived from a completed simulation.

use chrono::NaiveDate;

use crate::domain::drawdown::drawdown_series;
use crate::domain::simulator::{EquityPoint, Trade};
use crate::domain::volatility::sample_stdev;

/// Read-only summary computed once at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    /// Deepest decline from the running equity peak, as a fraction <= 0.
    pub max_drawdown: f64,
    /// Longest run of consecutive steps spent below the running peak.
    pub max_drawdown_duration: usize,
    pub total_costs: f64,
    pub num_trades: usize,
    pub final_equity: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PerformanceReport {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        periods_per_year: f64,
        risk_free_rate: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();

        let (first, last) = match (equity.first(), equity.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => (0.0, 0.0),
        };

        let total_return = if first > 0.0 { last / first - 1.0 } else { 0.0 };

        let num_periods = equity.len() as f64;
        let annualized_return = if num_periods > 0.0 && (1.0 + total_return) > 0.0 {
            (1.0 + total_return).powf(periods_per_year / num_periods) - 1.0
        } else {
            0.0
        };

        let returns: Vec<f64> = equity
            .windows(2)
            .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
            .collect();

        let annualized_volatility = sample_stdev(&returns)
            .map(|sd| sd * periods_per_year.sqrt())
            .unwrap_or(0.0);

        let sharpe_ratio = if annualized_volatility > 0.0 {
            let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
            (mean_return * periods_per_year - risk_free_rate) / annualized_volatility
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = max_drawdown_stats(&equity);

        let total_costs: f64 = trades.iter().map(|t| t.cost).sum();

        PerformanceReport {
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_costs,
            num_trades: trades.len(),
            final_equity: last,
            start_date: equity_curve.first().map(|p| p.date),
            end_date: equity_curve.last().map(|p| p.date),
        }
    }
}

fn max_drawdown_stats(equity: &[f64]) -> (f64, usize) {
    let drawdowns = drawdown_series(equity);
    let max_drawdown = drawdowns.iter().copied().fold(0.0f64, f64::min);

    let mut max_duration = 0usize;
    let mut current = 0usize;
    for &dd in &drawdowns {
        if dd < 0.0 {
            current += 1;
            max_duration = max_duration.max(current);
        } else {
            current = 0;
        }
    }

    (max_drawdown, max_duration)
}
