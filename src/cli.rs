//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    parse_spans, validate_backtest_config, validate_risk_config, validate_sizing_config,
    validate_strategy_config,
};
use crate::domain::drawdown::DrawdownPolicy;
use crate::domain::error::VoltraderError;
use crate::domain::portfolio::combine_results;
use crate::domain::signal::TradingRule;
use crate::domain::simulator::{run_backtest, BacktestResult, SimulationConfig};
use crate::domain::sizing::SizingConfig;
use crate::domain::universe::{parse_codes, required_bars, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "voltrader", about = "Volatility-targeting trend backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List available symbols on an exchange
    ListSymbols {
        #[arg(long)]
        exchange: String,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        exchange: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            code,
            exchange,
            dry_run,
        } => {
            if dry_run {
                run_validate(&config)
            } else {
                run_backtest_command(&config, output.as_ref(), code.as_deref(), exchange.as_deref())
            }
        }
        Command::ListSymbols { exchange, config } => run_list_symbols(&exchange, &config),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            code,
            exchange,
            config,
        } => run_info(code.as_deref(), exchange.as_deref(), &config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = VoltraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn validate_all(adapter: &dyn ConfigPort) -> Result<(), VoltraderError> {
    validate_backtest_config(adapter)?;
    validate_strategy_config(adapter)?;
    validate_sizing_config(adapter)?;
    validate_risk_config(adapter)?;
    Ok(())
}

/// Assemble the trading rule from the `[strategy]` section.
pub fn build_rule(adapter: &dyn ConfigPort) -> Result<TradingRule, VoltraderError> {
    let rule = adapter
        .get_string("strategy", "rule")
        .unwrap_or_else(|| "ewmac".to_string())
        .to_lowercase();

    match rule.as_str() {
        "crossover" => Ok(TradingRule::Crossover {
            fast: adapter.get_int("strategy", "fast", 16) as usize,
            slow: adapter.get_int("strategy", "slow", 64) as usize,
        }),
        "ewmac" => Ok(TradingRule::ExponentialCrossover {
            fast_span: adapter.get_int("strategy", "fast", 16) as usize,
            slow_span: adapter.get_int("strategy", "slow", 64) as usize,
        }),
        "composite" => {
            let spans = match adapter.get_string("strategy", "spans") {
                Some(s) => parse_spans(&s)?,
                None => return Ok(TradingRule::default_composite()),
            };
            Ok(TradingRule::Composite { spans })
        }
        other => Err(VoltraderError::ConfigInvalid {
            section: "strategy".into(),
            key: "rule".into(),
            reason: format!("unknown rule '{}'", other),
        }),
    }
}

/// Assemble the simulation parameters from the `[backtest]` and `[risk]`
/// sections.
pub fn build_simulation_config(adapter: &dyn ConfigPort) -> SimulationConfig {
    let drawdown_policy = if adapter.get_bool("risk", "enabled", false) {
        Some(DrawdownPolicy {
            scale_down_threshold: adapter.get_double("risk", "scale_down_threshold", 0.15),
            stop_trading_threshold: adapter.get_double("risk", "stop_trading_threshold", 0.30),
            scale_factor: adapter.get_double("risk", "scale_factor", 0.5),
        })
    } else {
        None
    };

    SimulationConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", 100_000.0),
        transaction_cost_rate: adapter.get_double("backtest", "transaction_cost_rate", 0.001),
        slippage_rate: adapter.get_double("backtest", "slippage_rate", 0.0005),
        rebalance_threshold_fraction: adapter.get_double("backtest", "rebalance_threshold", 0.01),
        volatility_window: adapter.get_int("backtest", "volatility_window", 30) as usize,
        periods_per_year: adapter.get_double("backtest", "periods_per_year", 252.0),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.03),
        drawdown_policy,
    }
}

pub fn build_sizing_config(adapter: &dyn ConfigPort) -> SizingConfig {
    SizingConfig {
        capital: adapter.get_double("backtest", "initial_capital", 100_000.0),
        target_volatility: adapter.get_double("sizing", "target_volatility", 0.20),
        max_position_fraction: adapter.get_double("sizing", "max_position_fraction", 0.10),
    }
}

pub fn build_date_range(
    adapter: &dyn ConfigPort,
) -> Result<(NaiveDate, NaiveDate), VoltraderError> {
    let parse = |key: &str| -> Result<NaiveDate, VoltraderError> {
        let value =
            adapter
                .get_string("backtest", key)
                .ok_or_else(|| VoltraderError::ConfigMissing {
                    section: "backtest".into(),
                    key: key.into(),
                })?;
        NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| VoltraderError::ConfigInvalid {
            section: "backtest".into(),
            key: key.into(),
            reason: "invalid date format (expected YYYY-MM-DD)".into(),
        })
    };
    Ok((parse("start_date")?, parse("end_date")?))
}

fn data_adapter(adapter: &dyn ConfigPort) -> CsvAdapter {
    let base = adapter
        .get_string("data", "path")
        .unwrap_or_else(|| "./data".to_string());
    CsvAdapter::new(PathBuf::from(base))
}

fn run_backtest_command(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    code_override: Option<&str>,
    exchange_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Build rule and parameter sets
    let rule = match build_rule(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let sim_config = build_simulation_config(&adapter);
    let sizing_config = build_sizing_config(&adapter);
    let (start_date, end_date) = match build_date_range(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Rule: {rule}");

    // Stage 3: Resolve codes and exchange
    let codes_input = match code_override {
        Some(c) => c.to_string(),
        None => adapter.get_string("backtest", "codes").unwrap_or_default(),
    };
    let codes = match parse_codes(&codes_input) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };
    let exchange = match exchange_override {
        Some(e) => e.to_string(),
        None => match adapter.get_string("backtest", "exchange") {
            Some(e) => e,
            None => {
                eprintln!("error: exchange is required");
                return ExitCode::from(2);
            }
        },
    };

    // Stages 4-7: Data-port-dependent pipeline
    let data_port = data_adapter(&adapter);
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("report"));

    run_backtest_pipeline(
        &data_port,
        &rule,
        &sim_config,
        &sizing_config,
        &codes,
        &exchange,
        start_date,
        end_date,
        &output,
    )
}

/// The data-driven part of the backtest command, split out so tests can drive
/// it with a mock data port.
#[allow(clippy::too_many_arguments)]
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    rule: &TradingRule,
    sim_config: &SimulationConfig,
    sizing_config: &SizingConfig,
    codes: &[String],
    exchange: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    output: &PathBuf,
) -> ExitCode {
    // Stage 4: Validate universe
    eprintln!("Validating {} codes on {}...", codes.len(), exchange);
    let minimum = required_bars(rule, sim_config.volatility_window);
    let validation = match validate_universe(
        data_port,
        codes.to_vec(),
        exchange,
        start_date,
        end_date,
        minimum,
    ) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Fetch data and simulate, one independent run per code
    eprintln!(
        "Running backtest: {} codes, {} to {}",
        validation.universe.count(),
        start_date,
        end_date,
    );

    let mut results: Vec<BacktestResult> = Vec::with_capacity(validation.universe.count());
    for code in &validation.universe.codes {
        let bars = match data_port.fetch_ohlcv(code, exchange, start_date, end_date) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", code, e);
                continue;
            }
        };
        match run_backtest(&bars, rule, sim_config, sizing_config) {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    if results.is_empty() {
        eprintln!("error: no valid codes with data to backtest");
        return ExitCode::from(5);
    }

    // Stage 6: Print per-code summaries to stderr
    for result in &results {
        let r = &result.report;
        eprintln!("\n=== {} ===", result.code);
        eprintln!("Total Return:     {:.2}%", r.total_return * 100.0);
        eprintln!("Annualized:       {:.2}%", r.annualized_return * 100.0);
        eprintln!("Ann. Volatility:  {:.2}%", r.annualized_volatility * 100.0);
        eprintln!("Sharpe Ratio:     {:.2}", r.sharpe_ratio);
        eprintln!("Max Drawdown:     {:.2}%", r.max_drawdown * 100.0);
        eprintln!("Trades:           {}", r.num_trades);
        eprintln!("Costs:            {:.2}", r.total_costs);
    }

    // Stage 7: Write reports
    let reporter = CsvReportAdapter;
    let rule_label = rule.to_string();

    let outcome = if results.len() == 1 {
        reporter.write(&results[0], &rule_label, output)
    } else {
        let portfolio = combine_results(
            &results,
            sim_config.initial_capital,
            sim_config.periods_per_year,
            sim_config.risk_free_rate,
        );
        let r = &portfolio.report;
        eprintln!("\n=== Portfolio ({} codes) ===", portfolio.codes.len());
        eprintln!("Total Return:     {:.2}%", r.total_return * 100.0);
        eprintln!("Annualized:       {:.2}%", r.annualized_return * 100.0);
        eprintln!("Sharpe Ratio:     {:.2}", r.sharpe_ratio);
        eprintln!("Max Drawdown:     {:.2}%", r.max_drawdown * 100.0);
        reporter.write_portfolio(&portfolio, &results, &rule_label, output)
    };

    match outcome {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_symbols(exchange: &str, config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_port = data_adapter(&adapter);

    match data_port.list_symbols(exchange) {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let rule = match build_rule(&adapter) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Config validated successfully");
    eprintln!("  Rule: {rule}");
    eprintln!(
        "  Minimum bars required: {}",
        required_bars(&rule, build_simulation_config(&adapter).volatility_window)
    );
    ExitCode::SUCCESS
}

fn run_info(
    code_filter: Option<&str>,
    exchange_override: Option<&str>,
    config_path: &PathBuf,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_port = data_adapter(&adapter);

    let exchange = match exchange_override {
        Some(e) => e.to_string(),
        None => match adapter.get_string("backtest", "exchange") {
            Some(e) => e,
            None => {
                eprintln!("error: exchange is required");
                return ExitCode::from(2);
            }
        },
    };

    let codes: Vec<String> = match code_filter {
        Some(code) => vec![code.to_uppercase()],
        None => {
            let configured = adapter.get_string("backtest", "codes").unwrap_or_default();
            match parse_codes(&configured) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::from(2);
                }
            }
        }
    };

    for code in codes {
        match data_port.get_data_range(&code, &exchange) {
            Ok(Some((first, last, count))) => {
                println!("{code}: {count} bars, {first} to {last}");
            }
            Ok(None) => println!("{code}: no data"),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }
    ExitCode::SUCCESS
}
