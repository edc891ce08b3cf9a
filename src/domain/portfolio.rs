//! Multi-instrument portfolio combination.
//!
//! Each instrument is backtested independently with its own capital slice;
//! the combined curve is the per-date sum of instrument equities over the
//! union of their timelines. Before an instrument's first mark it contributes
//! its initial capital; after its last mark it carries its final equity.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::report::PerformanceReport;
use crate::domain::simulator::{BacktestResult, EquityPoint, Trade};

/// Combined result across instruments.
#[derive(Debug, Clone)]
pub struct PortfolioResult {
    pub codes: Vec<String>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub report: PerformanceReport,
}

/// Combine independent per-instrument runs into one portfolio view.
///
/// `capital_per_instrument` is the starting equity each run was given; it
/// anchors instruments before their first equity point.
pub fn combine_results(
    results: &[BacktestResult],
    capital_per_instrument: f64,
    periods_per_year: f64,
    risk_free_rate: f64,
) -> PortfolioResult {
    let timeline: BTreeSet<NaiveDate> = results
        .iter()
        .flat_map(|r| r.equity_curve.iter().map(|p| p.date))
        .collect();

    let mut equity_curve = Vec::with_capacity(timeline.len());
    let mut cursors = vec![0usize; results.len()];
    let mut last_equity = vec![capital_per_instrument; results.len()];
    let mut last_cash = vec![capital_per_instrument; results.len()];

    for date in timeline {
        for (i, result) in results.iter().enumerate() {
            let curve = &result.equity_curve;
            while cursors[i] < curve.len() && curve[cursors[i]].date <= date {
                last_equity[i] = curve[cursors[i]].equity;
                last_cash[i] = curve[cursors[i]].cash;
                cursors[i] += 1;
            }
        }
        let cash: f64 = last_cash.iter().sum();
        let equity: f64 = last_equity.iter().sum();
        equity_curve.push(EquityPoint {
            date,
            cash,
            market_value: equity - cash,
            equity,
        });
    }

    let mut trades: Vec<Trade> = results.iter().flat_map(|r| r.trades.clone()).collect();
    trades.sort_by(|a, b| a.date.cmp(&b.date).then(a.code.cmp(&b.code)));

    let report =
        PerformanceReport::compute(&equity_curve, &trades, periods_per_year, risk_free_rate);

    PortfolioResult {
        codes: results.iter().map(|r| r.code.clone()).collect(),
        equity_curve,
        trades,
        report,
    }
}
