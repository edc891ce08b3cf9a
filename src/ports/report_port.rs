//! Report generation port trait.

use std::path::Path;

use crate::domain::error::VoltraderError;
use crate::domain::portfolio::PortfolioResult;
use crate::domain::simulator::BacktestResult;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        rule_label: &str,
        output_dir: &Path,
    ) -> Result<(), VoltraderError>;

    /// Default implementation: write each instrument's result into its own
    /// subdirectory; the portfolio summary is left to the implementor.
    fn write_portfolio(
        &self,
        portfolio: &PortfolioResult,
        results: &[BacktestResult],
        rule_label: &str,
        output_dir: &Path,
    ) -> Result<(), VoltraderError> {
        let _ = portfolio;
        for result in results {
            self.write(result, rule_label, &output_dir.join(&result.code))?;
        }
        Ok(())
    }
}
