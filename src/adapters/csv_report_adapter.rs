//! Plain-text and CSV report adapter.
//!
//! Writes a human-readable summary plus `equity.csv` and `trades.csv`
//! artifacts into an output directory, per instrument and for the combined
//! portfolio.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::domain::error::VoltraderError;
use crate::domain::portfolio::PortfolioResult;
use crate::domain::report::PerformanceReport;
use crate::domain::simulator::{BacktestResult, EquityPoint, Trade};
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    fn write_equity_csv(path: &Path, curve: &[EquityPoint]) -> Result<(), VoltraderError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| VoltraderError::Data {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        writer
            .write_record(["date", "cash", "market_value", "equity"])
            .map_err(csv_error)?;
        for point in curve {
            writer
                .write_record([
                    point.date.to_string(),
                    format!("{:.2}", point.cash),
                    format!("{:.2}", point.market_value),
                    format!("{:.2}", point.equity),
                ])
                .map_err(csv_error)?;
        }
        writer.flush().map_err(|e| VoltraderError::Data {
            reason: format!("failed to flush {}: {}", path.display(), e),
        })
    }

    fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<(), VoltraderError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| VoltraderError::Data {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        writer
            .write_record(["date", "code", "delta_shares", "execution_price", "cost"])
            .map_err(csv_error)?;
        for trade in trades {
            writer
                .write_record([
                    trade.date.to_string(),
                    trade.code.clone(),
                    trade.delta_shares.to_string(),
                    format!("{:.4}", trade.execution_price),
                    format!("{:.4}", trade.cost),
                ])
                .map_err(csv_error)?;
        }
        writer.flush().map_err(|e| VoltraderError::Data {
            reason: format!("failed to flush {}: {}", path.display(), e),
        })
    }

    fn summary_text(title: &str, rule_label: &str, report: &PerformanceReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "Rule:                  {rule_label}");
        if let (Some(start), Some(end)) = (report.start_date, report.end_date) {
            let _ = writeln!(out, "Period:                {start} to {end}");
        }
        let _ = writeln!(out, "Final Equity:          {:.2}", report.final_equity);
        let _ = writeln!(out, "Total Return:          {:.2}%", report.total_return * 100.0);
        let _ = writeln!(
            out,
            "Annualized Return:     {:.2}%",
            report.annualized_return * 100.0
        );
        let _ = writeln!(
            out,
            "Annualized Volatility: {:.2}%",
            report.annualized_volatility * 100.0
        );
        let _ = writeln!(out, "Sharpe Ratio:          {:.2}", report.sharpe_ratio);
        let _ = writeln!(out, "Max Drawdown:          {:.2}%", report.max_drawdown * 100.0);
        let _ = writeln!(
            out,
            "Max Drawdown Duration: {} periods",
            report.max_drawdown_duration
        );
        let _ = writeln!(out, "Total Trades:          {}", report.num_trades);
        let _ = writeln!(out, "Total Costs:           {:.2}", report.total_costs);
        out
    }

    fn ensure_dir(dir: &Path) -> Result<(), VoltraderError> {
        fs::create_dir_all(dir).map_err(|e| VoltraderError::Data {
            reason: format!("failed to create {}: {}", dir.display(), e),
        })
    }
}

fn csv_error(e: csv::Error) -> VoltraderError {
    VoltraderError::Data {
        reason: format!("CSV write error: {}", e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        rule_label: &str,
        output_dir: &Path,
    ) -> Result<(), VoltraderError> {
        Self::ensure_dir(output_dir)?;

        let title = format!("=== Backtest: {} ===", result.code);
        let summary = Self::summary_text(&title, rule_label, &result.report);
        fs::write(output_dir.join("summary.txt"), summary).map_err(|e| VoltraderError::Data {
            reason: format!("failed to write summary: {}", e),
        })?;

        Self::write_equity_csv(&output_dir.join("equity.csv"), &result.equity_curve)?;
        Self::write_trades_csv(&output_dir.join("trades.csv"), &result.trades)?;
        Ok(())
    }

    fn write_portfolio(
        &self,
        portfolio: &PortfolioResult,
        results: &[BacktestResult],
        rule_label: &str,
        output_dir: &Path,
    ) -> Result<(), VoltraderError> {
        Self::ensure_dir(output_dir)?;

        let title = format!("=== Portfolio: {} ===", portfolio.codes.join(", "));
        let summary = Self::summary_text(&title, rule_label, &portfolio.report);
        fs::write(output_dir.join("summary.txt"), summary).map_err(|e| VoltraderError::Data {
            reason: format!("failed to write summary: {}", e),
        })?;

        Self::write_equity_csv(&output_dir.join("equity.csv"), &portfolio.equity_curve)?;
        Self::write_trades_csv(&output_dir.join("trades.csv"), &portfolio.trades)?;

        for result in results {
            self.write(result, rule_label, &output_dir.join(&result.code))?;
        }
        Ok(())
    }
}
