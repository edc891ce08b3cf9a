//! Backtest simulation: a deterministic fold over a price series.
//!
//! Forecast and volatility series are pure functions of price history and are
//! computed up front; the per-bar loop then sizes a target position, applies
//! the rebalance threshold, executes with slippage and transaction costs, and
//! marks to market. Warm-up bars size to zero; they are the expected
//! cold-start state, not an error.

use chrono::NaiveDate;

use crate::domain::drawdown::DrawdownPolicy;
use crate::domain::error::VoltraderError;
use crate::domain::ohlcv::{validate_bars, OhlcvBar};
use crate::domain::report::PerformanceReport;
use crate::domain::signal::TradingRule;
use crate::domain::sizing::{target_position, SizingConfig};
use crate::domain::volatility::{
    volatility_series, DEFAULT_PERIODS_PER_YEAR, DEFAULT_VOLATILITY_WINDOW,
};

/// One executed rebalance.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub code: String,
    pub date: NaiveDate,
    pub delta_shares: i64,
    pub execution_price: f64,
    pub cost: f64,
}

/// One mark-to-market snapshot; appended every simulated step.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub market_value: f64,
    pub equity: f64,
}

/// Everything a single run produces, returned by value.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub code: String,
    pub forecasts: Vec<Option<f64>>,
    pub volatility: Vec<Option<f64>>,
    pub positions: Vec<i64>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub report: PerformanceReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Cost per unit of traded notional (0.001 = 10 bps).
    pub transaction_cost_rate: f64,
    /// Adverse price movement applied against the trade direction.
    pub slippage_rate: f64,
    /// Minimum trade notional, as a fraction of initial capital, below which
    /// a rebalance is skipped. Suppresses noise-driven churn.
    pub rebalance_threshold_fraction: f64,
    pub volatility_window: usize,
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
    pub drawdown_policy: Option<DrawdownPolicy>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 100_000.0,
            transaction_cost_rate: 0.001,
            slippage_rate: 0.0005,
            rebalance_threshold_fraction: 0.01,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            risk_free_rate: 0.03,
            drawdown_policy: None,
        }
    }
}

/// Run one instrument through the full pipeline.
///
/// The only fatal input conditions are structurally invalid bars: every
/// downstream division uses price as a denominator, so a non-positive or
/// non-finite price aborts before simulation starts.
pub fn run_backtest(
    bars: &[OhlcvBar],
    rule: &TradingRule,
    sim: &SimulationConfig,
    sizing: &SizingConfig,
) -> Result<BacktestResult, VoltraderError> {
    validate_bars(bars)?;

    let code = bars
        .first()
        .map(|b| b.code.clone())
        .unwrap_or_default();

    let forecasts = rule.generate(bars);
    let volatility = volatility_series(bars, sim.volatility_window, sim.periods_per_year);

    let mut cash = sim.initial_capital;
    let mut shares_held: i64 = 0;
    let mut peak_equity = sim.initial_capital;

    let mut positions = Vec::with_capacity(bars.len());
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(bars.len());
    let mut trades = Vec::new();

    for (t, bar) in bars.iter().enumerate() {
        let price = bar.close;

        let forecast = forecasts[t].unwrap_or(0.0);
        let mut target = target_position(sizing, forecast, price, volatility[t]);

        if let Some(policy) = &sim.drawdown_policy {
            let drawdown = if peak_equity > 0.0 {
                (cash + shares_held as f64 * price) / peak_equity - 1.0
            } else {
                0.0
            };
            let scale = policy.position_scale(drawdown.min(0.0));
            target = ((target as f64) * scale).trunc() as i64;
        }

        let delta = target - shares_held;
        let trade_notional = delta.abs() as f64 * price;

        if delta != 0 && trade_notional >= sim.rebalance_threshold_fraction * sim.initial_capital
        {
            let direction = if delta > 0 { 1.0 } else { -1.0 };
            let execution_price = price * (1.0 + direction * sim.slippage_rate);
            let cost = delta.abs() as f64 * execution_price * sim.transaction_cost_rate;

            cash -= delta as f64 * execution_price + cost;
            shares_held += delta;

            trades.push(Trade {
                code: bar.code.clone(),
                date: bar.date,
                delta_shares: delta,
                execution_price,
                cost,
            });
        }

        let market_value = shares_held as f64 * price;
        let equity = cash + market_value;
        peak_equity = peak_equity.max(equity);

        positions.push(shares_held);
        equity_curve.push(EquityPoint {
            date: bar.date,
            cash,
            market_value,
            equity,
        });
    }

    let report = PerformanceReport::compute(
        &equity_curve,
        &trades,
        sim.periods_per_year,
        sim.risk_free_rate,
    );

    Ok(BacktestResult {
        code,
        forecasts,
        volatility,
        positions,
        equity_curve,
        trades,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                code: "TEST".into(),
                exchange: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn linear_prices(start: f64, end: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect()
    }

    fn rule_16_64() -> TradingRule {
        TradingRule::Crossover { fast: 16, slow: 64 }
    }

    #[test]
    fn constant_prices_mean_no_trades() {
        let bars = make_bars(&[100.0; 300]);
        let result =
            run_backtest(&bars, &rule_16_64(), &SimulationConfig::default(), &SizingConfig::default())
                .unwrap();

        assert!(result.trades.is_empty());
        assert_relative_eq!(result.report.total_costs, 0.0);
        for point in &result.equity_curve {
            assert_relative_eq!(point.equity, 100_000.0);
        }
        for p in &result.positions {
            assert_eq!(*p, 0);
        }
    }

    #[test]
    fn rising_prices_go_long_and_cap_binds() {
        let bars = make_bars(&linear_prices(100.0, 200.0, 300));
        let sim = SimulationConfig::default();
        let sizing = SizingConfig::default();
        let result = run_backtest(&bars, &rule_16_64(), &sim, &sizing).unwrap();

        // Warm-up: zero position until the slow window is full at index 63.
        for p in &result.positions[..63] {
            assert_eq!(*p, 0);
        }

        // Once warmed up, the position is long. Every rebalance lands on a
        // target that satisfies the concentration cap at that bar's price;
        // between rebalances the held notional can drift above the cap by at
        // most the rebalance threshold.
        let late = &result.positions[150..];
        assert!(late.iter().all(|&p| p > 0));

        let cap = sizing.capital * sizing.max_position_fraction;
        let drift = sim.rebalance_threshold_fraction * sim.initial_capital;
        for (t, &p) in result.positions.iter().enumerate() {
            let notional = (p as f64 * bars[t].close).abs();
            assert!(notional <= cap + drift + 1e-6, "t={t} notional={notional}");
        }
        for trade in &result.trades {
            let (t, bar) = bars
                .iter()
                .enumerate()
                .find(|(_, b)| b.date == trade.date)
                .unwrap();
            let post_trade = result.positions[t];
            assert!((post_trade as f64 * bar.close).abs() <= cap + 1e-6);
        }
        assert!(!result.trades.is_empty());
    }

    #[test]
    fn warmup_bars_never_trade() {
        let bars = make_bars(&linear_prices(100.0, 200.0, 300));
        let result =
            run_backtest(&bars, &rule_16_64(), &SimulationConfig::default(), &SizingConfig::default())
                .unwrap();

        let warmup_end = bars[63].date;
        assert!(result.trades.iter().all(|t| t.date >= warmup_end));
    }

    #[test]
    fn cash_accounting_matches_trades() {
        let bars = make_bars(&linear_prices(100.0, 150.0, 200));
        let sim = SimulationConfig::default();
        let result =
            run_backtest(&bars, &rule_16_64(), &sim, &SizingConfig::default()).unwrap();

        let mut cash = sim.initial_capital;
        let mut held = 0i64;
        for trade in &result.trades {
            cash -= trade.delta_shares as f64 * trade.execution_price + trade.cost;
            held += trade.delta_shares;
        }
        let last = result.equity_curve.last().unwrap();
        assert_relative_eq!(last.cash, cash, max_relative = 1e-9);
        assert_eq!(*result.positions.last().unwrap(), held);
        assert_relative_eq!(
            last.equity,
            cash + held as f64 * bars.last().unwrap().close,
            max_relative = 1e-9
        );
    }

    #[test]
    fn slippage_works_against_the_trade() {
        let bars = make_bars(&linear_prices(100.0, 200.0, 300));
        let sim = SimulationConfig {
            slippage_rate: 0.001,
            ..SimulationConfig::default()
        };
        let result =
            run_backtest(&bars, &rule_16_64(), &sim, &SizingConfig::default()).unwrap();

        for trade in &result.trades {
            let bar_close = bars
                .iter()
                .find(|b| b.date == trade.date)
                .unwrap()
                .close;
            if trade.delta_shares > 0 {
                assert!(trade.execution_price > bar_close);
            } else {
                assert!(trade.execution_price < bar_close);
            }
        }
    }

    #[test]
    fn rebalance_threshold_suppresses_small_trades() {
        let bars = make_bars(&linear_prices(100.0, 200.0, 300));
        let tight = SimulationConfig {
            rebalance_threshold_fraction: 0.0,
            ..SimulationConfig::default()
        };
        let loose = SimulationConfig {
            rebalance_threshold_fraction: 0.05,
            ..SimulationConfig::default()
        };
        let many = run_backtest(&bars, &rule_16_64(), &tight, &SizingConfig::default())
            .unwrap()
            .trades
            .len();
        let few = run_backtest(&bars, &rule_16_64(), &loose, &SizingConfig::default())
            .unwrap()
            .trades
            .len();
        assert!(few < many, "threshold should reduce trades: {few} vs {many}");

        // Every executed trade clears the threshold.
        let result =
            run_backtest(&bars, &rule_16_64(), &loose, &SizingConfig::default()).unwrap();
        for trade in &result.trades {
            let bar_close = bars.iter().find(|b| b.date == trade.date).unwrap().close;
            assert!(
                trade.delta_shares.abs() as f64 * bar_close
                    >= loose.rebalance_threshold_fraction * loose.initial_capital - 1e-9
            );
        }
    }

    #[test]
    fn identical_runs_are_identical() {
        let bars = make_bars(&linear_prices(100.0, 180.0, 250));
        let sim = SimulationConfig::default();
        let sizing = SizingConfig::default();
        let a = run_backtest(&bars, &rule_16_64(), &sim, &sizing).unwrap();
        let b = run_backtest(&bars, &rule_16_64(), &sim, &sizing).unwrap();
        assert_eq!(a.equity_curve, b.equity_curve);
        assert_eq!(a.trades, b.trades);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn invalid_price_aborts() {
        let mut bars = make_bars(&linear_prices(100.0, 150.0, 100));
        bars[50].close = -1.0;
        let result = run_backtest(
            &bars,
            &rule_16_64(),
            &SimulationConfig::default(),
            &SizingConfig::default(),
        );
        assert!(matches!(result, Err(VoltraderError::InvalidPrice { .. })));
    }

    #[test]
    fn unordered_bars_abort() {
        let mut bars = make_bars(&linear_prices(100.0, 150.0, 100));
        bars[10].date = bars[9].date;
        let result = run_backtest(
            &bars,
            &rule_16_64(),
            &SimulationConfig::default(),
            &SizingConfig::default(),
        );
        assert!(matches!(result, Err(VoltraderError::UnorderedBars { .. })));
    }

    #[test]
    fn empty_series_is_an_empty_result() {
        let result = run_backtest(
            &[],
            &rule_16_64(),
            &SimulationConfig::default(),
            &SizingConfig::default(),
        )
        .unwrap();
        assert!(result.equity_curve.is_empty());
        assert!(result.trades.is_empty());
        assert_eq!(result.report.num_trades, 0);
    }

    #[test]
    fn equity_point_every_bar_even_without_trades() {
        let bars = make_bars(&linear_prices(100.0, 120.0, 90));
        let result = run_backtest(
            &bars,
            &rule_16_64(),
            &SimulationConfig::default(),
            &SizingConfig::default(),
        )
        .unwrap();
        assert_eq!(result.equity_curve.len(), bars.len());
        assert_eq!(result.positions.len(), bars.len());
        assert_eq!(result.forecasts.len(), bars.len());
        assert_eq!(result.volatility.len(), bars.len());
    }

    #[test]
    fn stop_trading_policy_flattens_positions() {
        // Rise then crash hard enough to trip the stop threshold.
        let mut prices = linear_prices(100.0, 200.0, 200);
        prices.extend(linear_prices(200.0, 80.0, 100).into_iter().skip(1));
        let bars = make_bars(&prices);

        let sim = SimulationConfig {
            drawdown_policy: Some(DrawdownPolicy {
                scale_down_threshold: 0.05,
                stop_trading_threshold: 0.10,
                scale_factor: 0.5,
            }),
            ..SimulationConfig::default()
        };
        let with_policy =
            run_backtest(&bars, &rule_16_64(), &sim, &SizingConfig::default()).unwrap();
        let without = run_backtest(
            &bars,
            &rule_16_64(),
            &SimulationConfig::default(),
            &SizingConfig::default(),
        )
        .unwrap();

        // The overlay can only shrink aggregate exposure, never grow it.
        let exposure = |positions: &[i64]| -> i64 { positions.iter().map(|p| p.abs()).sum() };
        assert!(exposure(&with_policy.positions) <= exposure(&without.positions));
        assert_eq!(with_policy.positions.len(), without.positions.len());
    }
}
