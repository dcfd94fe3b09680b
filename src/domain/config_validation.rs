//! Configuration validation.
//!
//! Every value is checked before a run. Keys that are absent fall back to
//! their defaults; keys that are present must parse and be in range.

use crate::domain::error::IctraderError;
use crate::domain::ohlcv::parse_timestamp;
use crate::domain::position::TieBreak;
use crate::ports::config_port::ConfigPort;

pub const BACKTEST: &str = "backtest";
pub const SELECTOR: &str = "selector";

pub const VARIANTS: [&str; 5] = ["ma_crossover", "ict", "liquidity", "amd", "ict_combined"];

/// Config section holding the parameters of strategy `name`.
pub fn strategy_section(name: &str) -> String {
    format!("strategy.{name}")
}

/// Strategy names listed in `[selector] strategies`, in order.
pub fn strategy_names(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string(SELECTOR, "strategies")
        .map(|s| {
            s.split(',')
                .map(|n| n.trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), IctraderError> {
    validate_backtest_config(config)?;
    validate_selector_config(config)?;
    for name in strategy_names(config) {
        validate_strategy_config(config, &name)?;
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), IctraderError> {
    match config.get_string(BACKTEST, "symbol") {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(missing(BACKTEST, "symbol")),
    }
    check(config, BACKTEST, "initial_capital", Rule::Positive)?;
    check(config, BACKTEST, "risk_free_rate", Rule::Fraction)?;
    check(config, BACKTEST, "lookback", Rule::AtLeast(1))?;
    validate_tie_break(config)?;
    validate_range(config)
}

pub fn validate_selector_config(config: &dyn ConfigPort) -> Result<(), IctraderError> {
    let names = strategy_names(config);
    if names.is_empty() {
        return Err(missing(SELECTOR, "strategies"));
    }
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(invalid(
                SELECTOR,
                "strategies",
                format!("strategy '{name}' listed twice"),
            ));
        }
    }
    check(config, SELECTOR, "min_trade_interval_hours", Rule::NonNegative)?;
    check(config, SELECTOR, "min_score", Rule::Score)?;
    check(config, SELECTOR, "min_risk_reward", Rule::NonNegative)
}

pub fn validate_strategy_config(config: &dyn ConfigPort, name: &str) -> Result<(), IctraderError> {
    let section = strategy_section(name);
    let variant = config
        .get_string(&section, "variant")
        .map(|v| v.trim().to_lowercase())
        .ok_or_else(|| missing(&section, "variant"))?;
    if !VARIANTS.contains(&variant.as_str()) {
        return Err(invalid(
            &section,
            "variant",
            format!("unknown variant '{variant}' (expected one of {})", VARIANTS.join(", ")),
        ));
    }

    check(config, &section, "risk_percentage", Rule::Percent)?;
    check(config, &section, "max_signals_per_day", Rule::AtLeast(1))?;
    check(config, &section, "min_signal_interval_minutes", Rule::AtLeast(0))?;
    check(config, &section, "min_risk_reward", Rule::NonNegative)?;
    check(config, &section, "min_score", Rule::Score)?;
    check(config, &section, "volatility_ceiling", Rule::Positive)?;
    validate_sizing(config, &section)?;

    let rules: &[(&str, Rule)] = match variant.as_str() {
        "ma_crossover" => &[
            ("fast_period", Rule::AtLeast(1)),
            ("slow_period", Rule::AtLeast(1)),
            ("stop_pct", Rule::Percent),
            ("target_pct", Rule::Positive),
        ],
        "ict" => &[
            ("structure_lookback", Rule::AtLeast(5)),
            ("reward_multiple", Rule::Positive),
        ],
        "liquidity" => &[("reward_multiple", Rule::Positive)],
        "amd" => &[
            ("accumulation_lookback", Rule::AtLeast(2)),
            ("accumulation_factor", Rule::Positive),
            ("reward_multiple", Rule::Positive),
        ],
        _ => &[
            ("atr_period", Rule::AtLeast(1)),
            ("trend_stop_atr", Rule::Positive),
            ("reversal_stop_atr", Rule::Positive),
            ("reward_multiple", Rule::Positive),
            ("pool_lookback", Rule::AtLeast(1)),
            ("trend_score", Rule::Score),
            ("reversal_score", Rule::Score),
        ],
    };
    for (key, rule) in rules {
        check(config, &section, key, *rule)?;
    }

    if variant == "ma_crossover" {
        let fast = config.get_int(&section, "fast_period", 10);
        let slow = config.get_int(&section, "slow_period", 20);
        if fast >= slow {
            return Err(invalid(
                &section,
                "fast_period",
                "fast_period must be below slow_period".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Positive,
    NonNegative,
    /// [0, 1)
    Fraction,
    /// (0, 100]
    Percent,
    /// [0, 100]
    Score,
    /// Whole number >= n.
    AtLeast(i64),
}

impl Rule {
    fn check(self, value: f64) -> Result<(), String> {
        let ok = match self {
            Rule::Positive => value > 0.0,
            Rule::NonNegative => value >= 0.0,
            Rule::Fraction => (0.0..1.0).contains(&value),
            Rule::Percent => value > 0.0 && value <= 100.0,
            Rule::Score => (0.0..=100.0).contains(&value),
            Rule::AtLeast(n) => value.fract() == 0.0 && value >= n as f64,
        };
        if ok {
            return Ok(());
        }
        Err(match self {
            Rule::Positive => "must be positive".into(),
            Rule::NonNegative => "must be non-negative".into(),
            Rule::Fraction => "must be between 0 and 1".into(),
            Rule::Percent => "must be in (0, 100]".into(),
            Rule::Score => "must be in [0, 100]".into(),
            Rule::AtLeast(n) => format!("must be a whole number >= {n}"),
        })
    }
}

fn check(config: &dyn ConfigPort, section: &str, key: &str, rule: Rule) -> Result<(), IctraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, format!("'{raw}' is not a number")))?;
    if !value.is_finite() {
        return Err(invalid(section, key, format!("'{raw}' is not finite")));
    }
    rule.check(value)
        .map_err(|reason| invalid(section, key, format!("{key} {reason}")))
}

fn validate_tie_break(config: &dyn ConfigPort) -> Result<(), IctraderError> {
    match config.get_string(BACKTEST, "tie_break") {
        Some(raw) => raw
            .parse::<TieBreak>()
            .map(|_| ())
            .map_err(|reason| invalid(BACKTEST, "tie_break", reason)),
        None => Ok(()),
    }
}

fn validate_range(config: &dyn ConfigPort) -> Result<(), IctraderError> {
    let parse = |key: &str| match config.get_string(BACKTEST, key) {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw).map(Some).ok_or_else(|| {
            invalid(
                BACKTEST,
                key,
                format!("invalid {key} '{raw}', expected YYYY-MM-DD[ HH:MM:SS]"),
            )
        }),
    };
    if let (Some(start), Some(end)) = (parse("start")?, parse("end")?) {
        if start >= end {
            return Err(invalid(BACKTEST, "start", "start must be before end".into()));
        }
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort, section: &str) -> Result<(), IctraderError> {
    let sizing = config
        .get_string(section, "sizing")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "price".into());
    match sizing.as_str() {
        "price" => Ok(()),
        "pips" => {
            check(config, section, "pip_size", Rule::Positive)?;
            check(config, section, "pip_value", Rule::Positive)
        }
        other => Err(invalid(
            section,
            "sizing",
            format!("unknown sizing '{other}' (expected price or pips)"),
        )),
    }
}

fn missing(section: &str, key: &str) -> IctraderError {
    IctraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: String) -> IctraderError {
    IctraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}
