//! CLI definition and dispatch.

use chrono::{Duration, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::config_validation::{
    BACKTEST, SELECTOR, strategy_names, strategy_section, validate_config,
};
use crate::domain::error::IctraderError;
use crate::domain::metrics::{BacktestResult, TradeBreakdown};
use crate::domain::ohlcv::{Bar, parse_timestamp};
use crate::domain::position::TieBreak;
use crate::domain::selector::SelectorConfig;
use crate::domain::strategy::{
    AmdParams, IctCombinedParams, IctParams, LiquidityParams, MaCrossoverParams, SizingRule,
    StrategyParams, StrategyVariant, TradingStrategy,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ictrader", about = "ICT/SMC strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest; several strategies go through the selector
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV file or directory of <SYMBOL>.csv files; overrides [backtest] data_path
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Directory for trades.csv and equity.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest each configured strategy on its own and compare
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            data,
            output,
        } => run_backtest(&config, data.as_deref(), output.as_deref()),
        Command::Compare { config, data } => run_compare(&config, data.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, IctraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, IctraderError> {
    let tie_break = match config.get_string(BACKTEST, "tie_break") {
        Some(raw) => raw
            .parse::<TieBreak>()
            .map_err(|reason| IctraderError::ConfigInvalid {
                section: BACKTEST.into(),
                key: "tie_break".into(),
                reason,
            })?,
        None => TieBreak::default(),
    };
    let lookback = config
        .get_string(BACKTEST, "lookback")
        .map(|_| config.get_int(BACKTEST, "lookback", 1).max(1) as usize);

    Ok(BacktestConfig {
        initial_capital: config.get_double(BACKTEST, "initial_capital", 10_000.0),
        risk_free_rate: config.get_double(BACKTEST, "risk_free_rate", 0.02),
        tie_break,
        lookback,
    })
}

pub fn build_selector_config(config: &dyn ConfigPort) -> SelectorConfig {
    let defaults = SelectorConfig::default();
    let hours = config.get_double(
        SELECTOR,
        "min_trade_interval_hours",
        defaults.min_trade_interval.num_minutes() as f64 / 60.0,
    );
    SelectorConfig {
        min_trade_interval: Duration::seconds((hours * 3600.0).round() as i64),
        min_score: config.get_double(SELECTOR, "min_score", defaults.min_score),
        min_risk_reward: config.get_double(SELECTOR, "min_risk_reward", defaults.min_risk_reward),
    }
}

fn build_variant(config: &dyn ConfigPort, section: &str, kind: &str) -> Result<StrategyVariant, IctraderError> {
    let int = |key: &str, default: usize| config.get_int(section, key, default as i64).max(0) as usize;
    let float = |key: &str, default: f64| config.get_double(section, key, default);

    let variant = match kind {
        "ma_crossover" => {
            let d = MaCrossoverParams::default();
            StrategyVariant::MaCrossover(MaCrossoverParams {
                fast_period: int("fast_period", d.fast_period),
                slow_period: int("slow_period", d.slow_period),
                stop_pct: float("stop_pct", d.stop_pct),
                target_pct: float("target_pct", d.target_pct),
            })
        }
        "ict" => {
            let d = IctParams::default();
            StrategyVariant::Ict(IctParams {
                structure_lookback: int("structure_lookback", d.structure_lookback),
                reward_multiple: float("reward_multiple", d.reward_multiple),
            })
        }
        "liquidity" => {
            let d = LiquidityParams::default();
            StrategyVariant::Liquidity(LiquidityParams {
                reward_multiple: float("reward_multiple", d.reward_multiple),
            })
        }
        "amd" => {
            let d = AmdParams::default();
            StrategyVariant::Amd(AmdParams {
                accumulation_lookback: int("accumulation_lookback", d.accumulation_lookback),
                accumulation_factor: float("accumulation_factor", d.accumulation_factor),
                reward_multiple: float("reward_multiple", d.reward_multiple),
            })
        }
        "ict_combined" => {
            let d = IctCombinedParams::default();
            StrategyVariant::IctCombined(IctCombinedParams {
                atr_period: int("atr_period", d.atr_period),
                trend_stop_atr: float("trend_stop_atr", d.trend_stop_atr),
                reversal_stop_atr: float("reversal_stop_atr", d.reversal_stop_atr),
                reward_multiple: float("reward_multiple", d.reward_multiple),
                pool_lookback: int("pool_lookback", d.pool_lookback),
                trend_score: float("trend_score", d.trend_score),
                reversal_score: float("reversal_score", d.reversal_score),
            })
        }
        other => {
            return Err(IctraderError::ConfigInvalid {
                section: section.into(),
                key: "variant".into(),
                reason: format!("unknown variant '{other}'"),
            });
        }
    };
    Ok(variant)
}

/// Builds the strategy configured in `[strategy.<name>]`. Shared filters start
/// from the variant's defaults and are overridden key by key.
pub fn build_strategy(config: &dyn ConfigPort, name: &str) -> Result<TradingStrategy, IctraderError> {
    let section = strategy_section(name);
    let kind = config
        .get_string(&section, "variant")
        .map(|v| v.trim().to_lowercase())
        .ok_or_else(|| IctraderError::ConfigMissing {
            section: section.clone(),
            key: "variant".into(),
        })?;
    let variant = build_variant(config, &section, &kind)?;
    let defaults = StrategyParams::for_variant(&variant);
    let present = |key: &str| config.get_string(&section, key).is_some();

    let sizing = match config
        .get_string(&section, "sizing")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("pips") => SizingRule::Pips {
            pip_size: config.get_double(&section, "pip_size", 0.0001),
            pip_value: config.get_double(&section, "pip_value", 10.0),
        },
        _ => SizingRule::PriceUnits,
    };

    let params = StrategyParams {
        risk_percentage: config.get_double(&section, "risk_percentage", defaults.risk_percentage),
        sizing,
        max_signals_per_day: if present("max_signals_per_day") {
            Some(config.get_int(&section, "max_signals_per_day", 1).max(1) as u32)
        } else {
            defaults.max_signals_per_day
        },
        min_signal_interval: if present("min_signal_interval_minutes") {
            Some(Duration::minutes(
                config.get_int(&section, "min_signal_interval_minutes", 0),
            ))
        } else {
            defaults.min_signal_interval
        },
        min_risk_reward: config.get_double(&section, "min_risk_reward", defaults.min_risk_reward),
        min_score: config.get_double(&section, "min_score", defaults.min_score),
        volatility_ceiling: if present("volatility_ceiling") {
            Some(config.get_double(&section, "volatility_ceiling", 0.0))
        } else {
            defaults.volatility_ceiling
        },
    };

    Ok(TradingStrategy::new(name, variant).with_params(params))
}

pub fn build_strategies(config: &dyn ConfigPort) -> Result<Vec<TradingStrategy>, IctraderError> {
    strategy_names(config)
        .iter()
        .map(|name| build_strategy(config, name))
        .collect()
}

fn resolve_range(config: &dyn ConfigPort) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let bound = |key: &str| {
        config
            .get_string(BACKTEST, key)
            .as_deref()
            .and_then(parse_timestamp)
    };
    (bound("start"), bound("end"))
}

/// Symbol plus its bars, read through the CSV feed.
pub fn load_bars(
    config: &dyn ConfigPort,
    data_override: Option<&Path>,
) -> Result<(String, Vec<Bar>), IctraderError> {
    let symbol = config
        .get_string(BACKTEST, "symbol")
        .map(|s| s.trim().to_string())
        .ok_or_else(|| IctraderError::ConfigMissing {
            section: BACKTEST.into(),
            key: "symbol".into(),
        })?;
    let data_path = match data_override {
        Some(p) => p.to_path_buf(),
        None => config
            .get_string(BACKTEST, "data_path")
            .map(PathBuf::from)
            .ok_or_else(|| IctraderError::ConfigMissing {
                section: BACKTEST.into(),
                key: "data_path".into(),
            })?,
    };

    let (start, end) = resolve_range(config);
    let bars = CsvAdapter::new(data_path).fetch_bars(&symbol, start, end)?;
    Ok((symbol, bars))
}

fn run_backtest(config_path: &Path, data: Option<&Path>, output: Option<&Path>) -> Result<(), IctraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let strategies = build_strategies(&adapter)?;
    let (symbol, bars) = load_bars(&adapter, data)?;

    let names: Vec<&str> = strategies.iter().map(|s| s.name.as_str()).collect();
    eprintln!(
        "Running backtest: {} ({} bars), strategies: {}",
        symbol,
        bars.len(),
        names.join(", ")
    );

    let result = match strategies.as_slice() {
        [single] => backtest_engine::run_backtest(&bars, single, &bt_config)?,
        many => {
            let selector = build_selector_config(&adapter);
            backtest_engine::run_selected(&bars, many, &selector, &bt_config)?
        }
    };

    print_summary(&result);

    if let Some(dir) = output {
        CsvReportAdapter.write(&result, dir)?;
        eprintln!("\nTrades and equity written to: {}", dir.display());
    }
    Ok(())
}

fn run_compare(config_path: &Path, data: Option<&Path>) -> Result<(), IctraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let strategies = build_strategies(&adapter)?;
    let (symbol, bars) = load_bars(&adapter, data)?;

    eprintln!(
        "Comparing {} strategies on {} ({} bars)",
        strategies.len(),
        symbol,
        bars.len()
    );
    let results = backtest_engine::run_many(&bars, &strategies, &bt_config);

    eprintln!(
        "\n{:<16} {:<14} {:>7} {:>9} {:>8} {:>9} {:>10} {:>8}",
        "strategy", "variant", "trades", "win rate", "pf", "max dd", "return", "sharpe"
    );
    for (strategy, result) in strategies.iter().zip(results) {
        let r = result?;
        eprintln!(
            "{:<16} {:<14} {:>7} {:>8.1}% {:>8.2} {:>8.1}% {:>9.2}% {:>8.2}",
            strategy.name,
            strategy.variant.kind(),
            r.total_trades,
            r.win_rate,
            r.profit_factor,
            r.max_drawdown,
            r.total_return,
            r.sharpe_ratio,
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), IctraderError> {
    let adapter = load_config(config_path)?;
    let bt_config = build_backtest_config(&adapter)?;
    let strategies = build_strategies(&adapter)?;

    eprintln!("\nBacktest:");
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!("  tie break:       {:?}", bt_config.tie_break);
    eprintln!("\nStrategies:");
    for s in &strategies {
        eprintln!(
            "  {} ({}), min bars {}, risk {}%",
            s.name,
            s.variant.kind(),
            s.variant.min_bars(),
            s.params.risk_percentage
        );
    }
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let breakdown = TradeBreakdown::compute(&result.trades);

    eprintln!("\n=== Results ===");
    eprintln!("Final Balance:    {:.2}", result.final_balance);
    eprintln!("Total Return:     {:.2}%", result.total_return);
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", result.max_drawdown);
    eprintln!(
        "Total Trades:     {} ({} won, {} lost)",
        result.total_trades, result.winning_trades, result.losing_trades
    );
    eprintln!("Win Rate:         {:.1}%", result.win_rate);
    eprintln!("Profit Factor:    {:.2}", result.profit_factor);

    if result.total_trades > 0 {
        eprintln!("\n=== Trades ===");
        eprintln!("Average Win:      {:.2}", breakdown.avg_win);
        eprintln!("Average Loss:     {:.2}", breakdown.avg_loss);
        eprintln!("Largest Win:      {:.2}", breakdown.largest_win);
        eprintln!("Largest Loss:     {:.2}", breakdown.largest_loss);
        eprintln!("Avg Duration:     {:.1}h", breakdown.avg_duration_hours);
        eprintln!("\n=== Daily P&L ===");
        for (day, pnl) in &breakdown.daily_profit {
            let sign = if *pnl >= 0.0 { "+" } else { "" };
            eprintln!("  {day}:  {sign}{pnl:.2}");
        }
    }
}
